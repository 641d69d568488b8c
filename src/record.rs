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

//! Log record and metadata.
//!
//! Records own their strings (or borrow `'static` ones), so they can be buffered until the end of
//! a unit of work and handed over as one batch.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use crate::Error;
use crate::ErrorKind;

/// The payload of a log message.
#[derive(Clone, Debug)]
pub struct Record {
    // the observed time
    now: SystemTime,

    // the metadata
    metadata: Metadata,
    module_path: Option<Cow<'static, str>>,
    file: Option<Cow<'static, str>>,
    line: Option<u32>,

    // the payload
    payload: Cow<'static, str>,

    // structural logging
    kvs: Vec<(Cow<'static, str>, String)>,
}

impl Record {
    /// The observed time.
    pub fn time(&self) -> SystemTime {
        self.now
    }

    /// Metadata about the log directive.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The verbosity level of the message.
    pub fn level(&self) -> Level {
        self.metadata.level()
    }

    /// The name of the target of the directive.
    pub fn target(&self) -> &str {
        self.metadata.target()
    }

    /// The module path of the message.
    pub fn module_path(&self) -> Option<&str> {
        self.module_path.as_deref()
    }

    /// The source file containing the message.
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// The filename of the source file.
    // obtain filename only from record's full file path
    // reason: the module is already logged + full file path is noisy for some layouts
    pub fn filename(&self) -> Cow<'_, str> {
        self.file()
            .map(std::path::Path::new)
            .and_then(std::path::Path::file_name)
            .map(std::ffi::OsStr::to_string_lossy)
            .unwrap_or_default()
    }

    /// The line containing the message.
    pub fn line(&self) -> Option<u32> {
        self.line
    }

    /// The message body.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// The key-values, in insertion order.
    pub fn key_values(&self) -> impl ExactSizeIterator<Item = (&str, &str)> {
        self.kvs.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }

    /// Create a builder initialized with the current record's values.
    pub fn to_builder(&self) -> RecordBuilder {
        RecordBuilder {
            record: self.clone(),
        }
    }

    /// Returns a new builder.
    pub fn builder() -> RecordBuilder {
        RecordBuilder::default()
    }
}

/// Builder for [`Record`].
#[derive(Debug)]
pub struct RecordBuilder {
    record: Record,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        RecordBuilder {
            record: Record {
                now: SystemTime::now(),
                metadata: MetadataBuilder::default().build(),
                module_path: None,
                file: None,
                line: None,
                payload: Cow::Borrowed(""),
                kvs: vec![],
            },
        }
    }
}

impl RecordBuilder {
    /// Set [`time`](Record::time).
    pub fn time(mut self, now: SystemTime) -> Self {
        self.record.now = now;
        self
    }

    /// Set [`payload`](Record::payload).
    pub fn payload(mut self, payload: impl Into<Cow<'static, str>>) -> Self {
        self.record.payload = payload.into();
        self
    }

    /// Set [`metadata`](Record::metadata).
    ///
    /// Construct a `Metadata` object with [`MetadataBuilder`].
    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.record.metadata = metadata;
        self
    }

    /// Set [`Metadata::level`].
    pub fn level(mut self, level: Level) -> Self {
        self.record.metadata.level = level;
        self
    }

    /// Set [`Metadata::target`].
    pub fn target(mut self, target: impl Into<Cow<'static, str>>) -> Self {
        self.record.metadata.target = target.into();
        self
    }

    /// Set [`module_path`](Record::module_path).
    pub fn module_path(mut self, path: Option<impl Into<Cow<'static, str>>>) -> Self {
        self.record.module_path = path.map(Into::into);
        self
    }

    /// Set [`file`](Record::file).
    pub fn file(mut self, file: Option<impl Into<Cow<'static, str>>>) -> Self {
        self.record.file = file.map(Into::into);
        self
    }

    /// Set [`line`](Record::line).
    pub fn line(mut self, line: Option<u32>) -> Self {
        self.record.line = line;
        self
    }

    /// Append one key-value pair to [`key_values`](Record::key_values).
    pub fn key_value(mut self, key: impl Into<Cow<'static, str>>, value: impl fmt::Display) -> Self {
        self.record.kvs.push((key.into(), value.to_string()));
        self
    }

    /// Invoke the builder and return a `Record`
    pub fn build(self) -> Record {
        self.record
    }
}

/// Metadata about a log message.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Metadata {
    level: Level,
    target: Cow<'static, str>,
}

impl Metadata {
    /// Get the level.
    pub fn level(&self) -> Level {
        self.level
    }

    /// Get the target.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns a new builder.
    pub fn builder() -> MetadataBuilder {
        MetadataBuilder::default()
    }
}

/// Builder for [`Metadata`].
#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct MetadataBuilder {
    metadata: Metadata,
}

impl Default for MetadataBuilder {
    fn default() -> Self {
        MetadataBuilder {
            metadata: Metadata {
                level: Level::Info,
                target: Cow::Borrowed(""),
            },
        }
    }
}

impl MetadataBuilder {
    /// Setter for [`level`](Metadata::level).
    pub fn level(mut self, arg: Level) -> Self {
        self.metadata.level = arg;
        self
    }

    /// Setter for [`target`](Metadata::target).
    pub fn target(mut self, target: impl Into<Cow<'static, str>>) -> Self {
        self.metadata.target = target.into();
        self
    }

    /// Invoke the builder and return a `Metadata`
    pub fn build(self) -> Metadata {
        self.metadata
    }
}

/// An enum representing the available verbosity levels of the logger.
///
/// Levels are ordered from the most severe to the most verbose.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Designates critical errors.
    Crit,
    /// Designates very serious errors.
    Error,
    /// Designates hazardous situations.
    Warn,
    /// Designates useful information.
    Info,
    /// Designates lower priority information.
    Debug,
    /// Designates very low priority, often extremely verbose, information.
    Trace,
}

impl Level {
    /// Return the string representation of the `Level`.
    ///
    /// This returns the same string as the `fmt::Display` implementation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Crit => "CRIT",
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Level {
    type Err = Error;
    fn from_str(s: &str) -> Result<Level, Self::Err> {
        for (name, level) in [
            ("crit", Level::Crit),
            ("error", Level::Error),
            ("warn", Level::Warn),
            ("info", Level::Info),
            ("debug", Level::Debug),
            ("trace", Level::Trace),
        ] {
            if s.eq_ignore_ascii_case(name) {
                return Ok(level);
            }
        }

        Err(Error::new(
            ErrorKind::Argument,
            format!("malformed level: {s:?}"),
        ))
    }
}

/// An enum representing the available verbosity level filters of the logger.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum LevelFilter {
    /// Disables all levels.
    Off,
    /// Enables if the target level is equal to the filter level.
    Equal(Level),
    /// Enables if the target level is more severe than or equal to the filter
    /// level.
    MoreSevereEqual(Level),
    /// Enables all levels.
    All,
}

impl LevelFilter {
    /// Checks the given level if satisfies the filter condition.
    ///
    /// # Examples
    ///
    /// ```
    /// use logforth_batch::record::Level;
    /// use logforth_batch::record::LevelFilter;
    ///
    /// let level_filter = LevelFilter::MoreSevereEqual(Level::Warn);
    ///
    /// assert_eq!(level_filter.test(Level::Info), false);
    /// assert_eq!(level_filter.test(Level::Warn), true);
    /// assert_eq!(level_filter.test(Level::Crit), true);
    /// ```
    pub fn test(&self, level: Level) -> bool {
        match self {
            LevelFilter::Off => false,
            LevelFilter::Equal(l) => level == *l,
            LevelFilter::MoreSevereEqual(l) => level <= *l,
            LevelFilter::All => true,
        }
    }
}

impl From<Level> for LevelFilter {
    fn from(level: Level) -> Self {
        LevelFilter::MoreSevereEqual(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering_and_parse() {
        assert!(Level::Crit < Level::Error);
        assert!(Level::Warn < Level::Debug);
        assert_eq!("WARN".parse::<Level>().unwrap(), Level::Warn);
        assert_eq!("crit".parse::<Level>().unwrap(), Level::Crit);

        let err = "loud".parse::<Level>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn test_level_filter() {
        assert!(!LevelFilter::Off.test(Level::Crit));
        assert!(LevelFilter::All.test(Level::Trace));
        assert!(LevelFilter::Equal(Level::Info).test(Level::Info));
        assert!(!LevelFilter::Equal(Level::Info).test(Level::Warn));
        assert!(LevelFilter::from(Level::Warn).test(Level::Error));
        assert!(!LevelFilter::from(Level::Warn).test(Level::Info));
    }

    #[test]
    fn test_record_builder() {
        let record = Record::builder()
            .level(Level::Warn)
            .target("app::http")
            .file(Some("src/http/handler.rs"))
            .line(Some(42))
            .payload(format!("served {} bytes", 512))
            .key_value("status", 200)
            .build();

        assert_eq!(record.level(), Level::Warn);
        assert_eq!(record.target(), "app::http");
        assert_eq!(record.filename(), "handler.rs");
        assert_eq!(record.line(), Some(42));
        assert_eq!(record.payload(), "served 512 bytes");
        assert_eq!(
            record.key_values().collect::<Vec<_>>(),
            vec![("status", "200")]
        );

        let copy = record.to_builder().payload("other").build();
        assert_eq!(copy.target(), "app::http");
        assert_eq!(copy.payload(), "other");
    }
}
