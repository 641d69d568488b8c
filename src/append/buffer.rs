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
use std::mem;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::Error;
use crate::Trap;
use crate::append::Append;
use crate::record::Metadata;
use crate::record::Record;
use crate::trap::DefaultTrap;

/// An appender that collects records and hands them to the inner appender as one batch on
/// [`flush`](Append::flush).
///
/// Pair it with a [`BatchStream`](crate::append::BatchStream) to write all records of a unit of
/// work at once. A buffer dropped with pending records flushes them; errors are sent to the trap.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::Mutex;
///
/// use logforth_batch::append::Append;
/// use logforth_batch::append::BatchStreamBuilder;
/// use logforth_batch::append::Buffer;
/// use logforth_batch::record::Record;
///
/// let sink = Arc::new(Mutex::new(Vec::<u8>::new()));
/// let buffer = Buffer::new(BatchStreamBuilder::writer(sink.clone()).build().unwrap());
///
/// buffer.append(&Record::builder().payload("first").build()).unwrap();
/// buffer.append(&Record::builder().payload("second").build()).unwrap();
/// assert!(sink.lock().unwrap().is_empty());
///
/// buffer.flush().unwrap();
/// assert!(!sink.lock().unwrap().is_empty());
/// ```
#[derive(Debug)]
pub struct Buffer<A: Append> {
    inner: A,
    records: Mutex<Vec<Record>>,
    trap: Box<dyn Trap>,
}

impl<A: Append> Buffer<A> {
    /// Create a new buffer in front of the given appender.
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            records: Mutex::new(Vec::new()),
            trap: Box::new(DefaultTrap::default()),
        }
    }

    /// Set the trap for errors raised when the buffer is dropped.
    ///
    /// Default to [`DefaultTrap`].
    pub fn with_trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Return the inner appender.
    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Return the number of pending records.
    pub fn len(&self) -> usize {
        self.records().len()
    }

    /// Return whether there is no pending record.
    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    /// Discard the pending records without writing them.
    pub fn clear(&self) {
        self.records().clear();
    }

    fn records(&self) -> MutexGuard<'_, Vec<Record>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<A: Append> Append for Buffer<A> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn bubble(&self) -> bool {
        self.inner.bubble()
    }

    fn append(&self, record: &Record) -> Result<(), Error> {
        if self.inner.enabled(record.metadata()) {
            self.records().push(record.clone());
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), Error> {
        let records = mem::take(&mut *self.records());
        if !records.is_empty() {
            self.inner.append_batch(&records)?;
        }
        self.inner.flush()
    }
}

impl<A: Append> Drop for Buffer<A> {
    fn drop(&mut self) {
        let pending = self.records.get_mut().unwrap_or_else(|e| e.into_inner());
        if pending.is_empty() {
            return;
        }
        if let Err(err) = self.flush() {
            self.trap.trap(&err);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ErrorKind;
    use crate::record::Level;

    #[derive(Debug, Default)]
    struct Recording {
        batches: Mutex<Vec<Vec<String>>>,
        flushes: Mutex<usize>,
    }

    impl Append for Recording {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= Level::Info
        }

        fn append(&self, _: &Record) -> Result<(), Error> {
            Err(Error::new(ErrorKind::Usage, "batch only"))
        }

        fn append_batch(&self, records: &[Record]) -> Result<(), Error> {
            let payloads = records.iter().map(|r| r.payload().to_string()).collect();
            self.batches.lock().unwrap().push(payloads);
            Ok(())
        }

        fn flush(&self) -> Result<(), Error> {
            *self.flushes.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct CollectTrap(Mutex<Vec<String>>);

    impl Trap for Arc<CollectTrap> {
        fn trap(&self, err: &Error) {
            self.0.lock().unwrap().push(err.to_string());
        }
    }

    fn record(level: Level, payload: &'static str) -> Record {
        Record::builder().level(level).payload(payload).build()
    }

    #[test]
    fn test_flush_hands_over_one_batch() {
        let recording = Arc::new(Recording::default());
        let buffer = Buffer::new(recording.clone());

        buffer.append(&record(Level::Info, "one")).unwrap();
        buffer.append(&record(Level::Debug, "skipped")).unwrap();
        buffer.append(&record(Level::Error, "two")).unwrap();
        assert_eq!(buffer.len(), 2);

        buffer.flush().unwrap();
        assert!(buffer.is_empty());
        assert_eq!(
            *recording.batches.lock().unwrap(),
            vec![vec!["one".to_string(), "two".to_string()]]
        );

        // an empty flush does not hand over an empty batch
        buffer.flush().unwrap();
        assert_eq!(recording.batches.lock().unwrap().len(), 1);
        assert_eq!(*recording.flushes.lock().unwrap(), 2);
    }

    #[test]
    fn test_drop_flushes_pending_records() {
        let recording = Arc::new(Recording::default());
        {
            let buffer = Buffer::new(recording.clone());
            buffer.append(&record(Level::Warn, "pending")).unwrap();
        }
        assert_eq!(
            *recording.batches.lock().unwrap(),
            vec![vec!["pending".to_string()]]
        );
    }

    #[test]
    fn test_drop_errors_go_to_trap() {
        #[derive(Debug)]
        struct Failing;

        impl Append for Failing {
            fn append(&self, _: &Record) -> Result<(), Error> {
                Ok(())
            }

            fn append_batch(&self, _: &[Record]) -> Result<(), Error> {
                Err(Error::new(ErrorKind::Resource, "cannot open"))
            }
        }

        let trap = Arc::new(CollectTrap::default());
        {
            let buffer = Buffer::new(Failing).with_trap(trap.clone());
            buffer.append(&record(Level::Info, "lost")).unwrap();
        }
        let trapped = trap.0.lock().unwrap();
        assert_eq!(trapped.len(), 1);
        assert!(trapped[0].contains("cannot open"));
    }

    #[test]
    fn test_clear_discards_pending_records() {
        let recording = Arc::new(Recording::default());
        let buffer = Buffer::new(recording.clone());
        buffer.append(&record(Level::Info, "discarded")).unwrap();
        buffer.clear();
        drop(buffer);
        assert!(recording.batches.lock().unwrap().is_empty());
    }
}
