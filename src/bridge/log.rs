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
use std::borrow::Cow;

use crate::Logger;
use crate::record::Level;
use crate::record::LevelFilter;
use crate::record::Metadata;
use crate::record::MetadataBuilder;
use crate::record::Record;
use crate::record::RecordBuilder;

impl From<log::LevelFilter> for LevelFilter {
    fn from(level: log::LevelFilter) -> Self {
        match level {
            log::LevelFilter::Off => Self::Off,
            log::LevelFilter::Error => Self::MoreSevereEqual(Level::Error),
            log::LevelFilter::Warn => Self::MoreSevereEqual(Level::Warn),
            log::LevelFilter::Info => Self::MoreSevereEqual(Level::Info),
            log::LevelFilter::Debug => Self::MoreSevereEqual(Level::Debug),
            log::LevelFilter::Trace => Self::All,
        }
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

fn convert_metadata(metadata: &log::Metadata) -> Metadata {
    MetadataBuilder::default()
        .target(metadata.target().to_string())
        .level(metadata.level().into())
        .build()
}

fn convert_record(record: &log::Record) -> Record {
    let payload: Cow<'static, str> = match record.args().as_str() {
        Some(s) => Cow::Borrowed(s),
        None => Cow::Owned(record.args().to_string()),
    };

    let module_path: Option<Cow<'static, str>> = match record.module_path_static() {
        Some(s) => Some(Cow::Borrowed(s)),
        None => record.module_path().map(|s| Cow::Owned(s.to_string())),
    };
    let file: Option<Cow<'static, str>> = match record.file_static() {
        Some(s) => Some(Cow::Borrowed(s)),
        None => record.file().map(|s| Cow::Owned(s.to_string())),
    };

    let mut builder = RecordBuilder::default()
        .payload(payload)
        .level(record.level().into())
        .target(record.target().to_string())
        .module_path(module_path)
        .file(file)
        .line(record.line());

    struct KeyValueVisitor {
        kvs: Vec<(String, String)>,
    }

    impl<'kvs> log::kv::VisitSource<'kvs> for KeyValueVisitor {
        fn visit_pair(
            &mut self,
            key: log::kv::Key<'kvs>,
            value: log::kv::Value<'kvs>,
        ) -> Result<(), log::kv::Error> {
            self.kvs.push((key.to_string(), value.to_string()));
            Ok(())
        }
    }

    let mut visitor = KeyValueVisitor { kvs: vec![] };
    // the visitor itself never fails
    let _ = record.key_values().visit(&mut visitor);
    for (key, value) in visitor.kvs {
        builder = builder.key_value(key, value);
    }

    builder.build()
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        Logger::enabled(self, &convert_metadata(metadata))
    }

    fn log(&self, record: &log::Record) {
        Logger::log(self, &convert_record(record));
    }

    fn flush(&self) {
        Logger::flush(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_log_record() {
        let kvs = ("request_id", 7);
        let path = "GET /";
        // the record borrows its format arguments, so convert it in the same statement
        let converted = convert_record(
            &log::Record::builder()
                .args(format_args!("handled {path}"))
                .level(log::Level::Warn)
                .target("app::http")
                .module_path_static(Some("app::http"))
                .file_static(Some("src/http.rs"))
                .line(Some(9))
                .key_values(&kvs)
                .build(),
        );

        assert_eq!(converted.level(), Level::Warn);
        assert_eq!(converted.target(), "app::http");
        assert_eq!(converted.module_path(), Some("app::http"));
        assert_eq!(converted.file(), Some("src/http.rs"));
        assert_eq!(converted.line(), Some(9));
        assert_eq!(converted.payload(), "handled GET /");
        assert_eq!(
            converted.key_values().collect::<Vec<_>>(),
            vec![("request_id", "7")]
        );
    }

    #[test]
    fn test_convert_level_filter() {
        assert!(!LevelFilter::from(log::LevelFilter::Off).test(Level::Crit));
        assert!(LevelFilter::from(log::LevelFilter::Warn).test(Level::Crit));
        assert!(!LevelFilter::from(log::LevelFilter::Warn).test(Level::Info));
        assert!(LevelFilter::from(log::LevelFilter::Trace).test(Level::Trace));
    }
}
