// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use std::fmt::Write;

use jiff::Timestamp;
use jiff::tz::TimeZone;

use crate::Error;
use crate::ErrorKind;
use crate::layout::Layout;
use crate::record::Record;

/// A layout that formats log record as human-readable text, one line per record.
///
/// Output format:
///
/// ```text
/// 2024-08-11T22:44:57.172105+08:00 ERROR app::http: handler.rs:51 Hello error!
/// 2024-08-11T22:44:57.172219+08:00  WARN app::http: handler.rs:52 Hello warn!
/// ```
///
/// You can customize the timezone of the timestamp by setting the `tz` field with a [`TimeZone`]
/// instance. Otherwise, the system timezone is used.
///
/// # Examples
///
/// ```
/// use jiff::tz::TimeZone;
/// use logforth_batch::layout::TextLayout;
///
/// let layout = TextLayout::default().timezone(TimeZone::UTC);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TextLayout {
    tz: Option<TimeZone>,
}

impl TextLayout {
    /// Set the timezone for timestamps.
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.tz = Some(tz);
        self
    }
}

impl Layout for TextLayout {
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error> {
        let ts = Timestamp::try_from(record.time()).map_err(|err| {
            Error::new(ErrorKind::Unexpected, "record time out of range").with_source(err)
        })?;
        let tz = self.tz.clone().unwrap_or_else(TimeZone::system);
        let time = ts.to_zoned(tz).strftime("%Y-%m-%dT%H:%M:%S.%6f%:z");

        let level = record.level();
        let target = record.target();
        let file = record.filename();
        let line = record.line().unwrap_or_default();
        let message = record.payload();

        let mut text = String::new();
        write!(&mut text, "{time} {level:>5} {target}: {file}:{line} {message}")
            .map_err(Error::from_fmt_error)?;
        for (key, value) in record.key_values() {
            write!(&mut text, " {key}={value}").map_err(Error::from_fmt_error)?;
        }
        text.push('\n');

        Ok(text.into_bytes())
    }
}
