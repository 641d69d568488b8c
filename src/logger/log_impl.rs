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
use crate::Append;
use crate::Trap;
use crate::record::Metadata;
use crate::record::Record;

/// A logger facade that visits a chain of appenders.
///
/// Each record is offered to the appenders in order. An appender that is
/// [enabled](Append::enabled) for the record receives it; if that appender does not
/// [bubble](Append::bubble), the record goes no further. Errors are sent to the trap.
///
/// [`Logger::flush`] ends a unit of work: buffering appenders hand their batch over.
#[derive(Debug)]
pub struct Logger {
    appends: Vec<Box<dyn Append>>,
    trap: Box<dyn Trap>,
}

impl Logger {
    pub(super) fn new(appends: Vec<Box<dyn Append>>, trap: Box<dyn Trap>) -> Self {
        Self { appends, trap }
    }

    /// Determine if any appender would handle a record with the given metadata.
    pub fn enabled(&self, metadata: &Metadata) -> bool {
        self.appends.iter().any(|append| append.enabled(metadata))
    }

    /// Dispatch the record to the appender chain.
    pub fn log(&self, record: &Record) {
        for append in &self.appends {
            if !append.enabled(record.metadata()) {
                continue;
            }
            if let Err(err) = append.append(record) {
                self.trap.trap(&err);
            }
            if !append.bubble() {
                break;
            }
        }
    }

    /// Flush every appender.
    pub fn flush(&self) {
        for append in &self.appends {
            if let Err(err) = append.flush() {
                self.trap.trap(&err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use super::*;
    use crate::Error;
    use crate::ErrorKind;
    use crate::record::Level;
    use crate::record::LevelFilter;

    #[derive(Debug)]
    struct Collect {
        name: &'static str,
        filter: LevelFilter,
        bubble: bool,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl Append for Collect {
        fn enabled(&self, metadata: &Metadata) -> bool {
            self.filter.test(metadata.level())
        }

        fn bubble(&self) -> bool {
            self.bubble
        }

        fn append(&self, record: &Record) -> Result<(), Error> {
            let line = format!("{}:{}", self.name, record.payload());
            self.seen.lock().unwrap().push(line);
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct CollectTrap(Arc<Mutex<Vec<String>>>);

    impl Trap for CollectTrap {
        fn trap(&self, err: &Error) {
            self.0.lock().unwrap().push(err.message().to_string());
        }
    }

    #[test]
    fn test_non_bubbling_appender_stops_propagation() {
        let seen = Arc::new(Mutex::new(vec![]));
        let logger = crate::builder()
            .append(Collect {
                name: "errors",
                filter: LevelFilter::from(Level::Error),
                bubble: false,
                seen: seen.clone(),
            })
            .append(Collect {
                name: "all",
                filter: LevelFilter::All,
                bubble: true,
                seen: seen.clone(),
            })
            .build();

        logger.log(&Record::builder().level(Level::Error).payload("boom").build());
        logger.log(&Record::builder().level(Level::Info).payload("fine").build());

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["errors:boom".to_string(), "all:fine".to_string()]
        );
        assert!(logger.enabled(&Metadata::builder().level(Level::Trace).build()));
    }

    #[test]
    fn test_append_errors_go_to_trap() {
        #[derive(Debug)]
        struct Broken;

        impl Append for Broken {
            fn append(&self, _: &Record) -> Result<(), Error> {
                Err(Error::new(ErrorKind::Usage, "broken"))
            }
        }

        let trapped = Arc::new(Mutex::new(vec![]));
        let logger = crate::builder()
            .append(Broken)
            .trap(CollectTrap(trapped.clone()))
            .build();

        logger.log(&Record::builder().payload("x").build());
        logger.flush();
        assert_eq!(*trapped.lock().unwrap(), vec!["broken".to_string()]);
    }
}
