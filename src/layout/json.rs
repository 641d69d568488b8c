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
use jiff::Timestamp;
use jiff::TimestampDisplayWithOffset;
use jiff::tz::TimeZone;
use serde::Serialize;
use serde_json::Map;

use crate::Error;
use crate::ErrorKind;
use crate::layout::Layout;
use crate::record::Record;

/// A layout that formats log record as JSON lines.
///
/// Output format:
///
/// ```json
/// {"timestamp":"2024-08-11T22:44:57.172051+08:00","level":"ERROR","target":"app","file":"handler.rs","line":51,"message":"Hello error!"}
/// {"timestamp":"2024-08-11T22:44:57.172187+08:00","level":"WARN","target":"app","file":"handler.rs","line":52,"message":"Hello warn!","kvs":{"user":"42"}}
/// ```
///
/// # Examples
///
/// ```
/// use logforth_batch::layout::JsonLayout;
///
/// let json_layout = JsonLayout::default();
/// ```
#[derive(Default, Debug, Clone)]
pub struct JsonLayout {
    tz: Option<TimeZone>,
}

impl JsonLayout {
    /// Set the timezone for timestamps.
    ///
    /// # Examples
    ///
    /// ```
    /// use jiff::tz::TimeZone;
    /// use logforth_batch::layout::JsonLayout;
    ///
    /// let layout = JsonLayout::default().timezone(TimeZone::UTC);
    /// ```
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.tz = Some(tz);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
struct RecordLine<'a> {
    #[serde(serialize_with = "serialize_timestamp")]
    timestamp: TimestampDisplayWithOffset,
    level: &'a str,
    target: &'a str,
    file: &'a str,
    line: u32,
    message: &'a str,
    #[serde(skip_serializing_if = "Map::is_empty")]
    kvs: Map<String, serde_json::Value>,
}

fn serialize_timestamp<S>(
    timestamp: &TimestampDisplayWithOffset,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(&format_args!("{timestamp:.6}"))
}

impl Layout for JsonLayout {
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error> {
        let ts = Timestamp::try_from(record.time()).map_err(|err| {
            Error::new(ErrorKind::Unexpected, "record time out of range").with_source(err)
        })?;
        let tz = self.tz.clone().unwrap_or_else(TimeZone::system);
        let offset = tz.to_offset(ts);
        let timestamp = ts.display_with_offset(offset);

        let kvs = record
            .key_values()
            .map(|(k, v)| (k.to_string(), serde_json::Value::from(v)))
            .collect();

        let record_line = RecordLine {
            timestamp,
            level: record.level().as_str(),
            target: record.target(),
            file: record.file().unwrap_or_default(),
            line: record.line().unwrap_or_default(),
            message: record.payload(),
            kvs,
        };

        let mut bytes = serde_json::to_vec(&record_line).map_err(|err| {
            Error::new(ErrorKind::Unexpected, "failed to serialize record").with_source(err)
        })?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::record::Level;

    #[test]
    fn test_json_line() {
        let record = Record::builder()
            .time(SystemTime::UNIX_EPOCH)
            .level(Level::Info)
            .target("app")
            .file(Some("src/main.rs"))
            .line(Some(3))
            .payload("started")
            .key_value("port", 8080)
            .build();

        let layout = JsonLayout::default().timezone(TimeZone::UTC);
        let text = String::from_utf8(layout.format(&record).unwrap()).unwrap();
        assert!(text.ends_with('\n'));

        let value: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(value["level"], "INFO");
        assert_eq!(value["message"], "started");
        assert_eq!(value["file"], "src/main.rs");
        assert_eq!(value["kvs"]["port"], "8080");
        assert_eq!(value["timestamp"], "1970-01-01T00:00:00.000000+00:00");
    }
}
