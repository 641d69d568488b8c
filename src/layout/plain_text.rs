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
use std::time::SystemTime;

use crate::Error;
use crate::layout::Layout;
use crate::record::Record;

/// A layout that formats log record as plain text, one line per record.
///
/// Output format:
///
/// ```text
/// 1723387497172105000 ERROR app: file.rs:51 Hello error!
/// 1723387497172219000  WARN app: file.rs:52 Hello warn! user=42
/// ```
///
/// The timestamp is the number of nanoseconds since the unix epoch.
///
/// # Examples
///
/// ```
/// use logforth_batch::layout::PlainTextLayout;
///
/// let text_layout = PlainTextLayout::default();
/// ```
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct PlainTextLayout {}

impl Layout for PlainTextLayout {
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error> {
        let mut text = String::new();

        let time = record.time();
        match time.duration_since(SystemTime::UNIX_EPOCH) {
            Ok(dur) => {
                let time = dur.as_nanos();
                write!(&mut text, "{time}").map_err(Error::from_fmt_error)?;
            }
            Err(err) => {
                let time = err.duration().as_nanos();
                write!(&mut text, "-{time}").map_err(Error::from_fmt_error)?;
            }
        }

        let level = record.level().as_str();
        let target = record.target();
        let file = record.filename();
        let line = record.line().unwrap_or_default();
        let message = record.payload();
        write!(&mut text, " {level:>5} {target}: {file}:{line} {message}")
            .map_err(Error::from_fmt_error)?;

        for (key, value) in record.key_values() {
            write!(&mut text, " {key}={value}").map_err(Error::from_fmt_error)?;
        }
        text.push('\n');

        Ok(text.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use std::time::SystemTime;

    use super::*;
    use crate::record::Level;

    #[test]
    fn test_plain_text_line() {
        let record = Record::builder()
            .time(SystemTime::UNIX_EPOCH + Duration::from_secs(1))
            .level(Level::Warn)
            .target("app")
            .file(Some("src/handler.rs"))
            .line(Some(7))
            .payload("slow request")
            .key_value("elapsed_ms", 1200)
            .build();

        let bytes = PlainTextLayout::default().format(&record).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "1000000000  WARN app: handler.rs:7 slow request elapsed_ms=1200\n"
        );
    }
}
