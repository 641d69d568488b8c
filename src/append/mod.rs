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
//! Dispatch log records to various targets.

use std::fmt;
use std::sync::Arc;

use crate::Error;
use crate::record::Metadata;
use crate::record::Record;

pub mod batch;
mod buffer;

pub use self::batch::BatchStream;
pub use self::batch::BatchStreamBuilder;
pub use self::buffer::Buffer;

/// An appender that can process log records.
pub trait Append: fmt::Debug + Send + Sync + 'static {
    /// Whether this appender handles records with the given metadata.
    ///
    /// Default to accept all records.
    fn enabled(&self, metadata: &Metadata) -> bool {
        let _ = metadata;
        true
    }

    /// Whether a record handled by this appender continues to the next appender of a
    /// [`Logger`](crate::Logger).
    ///
    /// Default to `true`.
    fn bubble(&self) -> bool {
        true
    }

    /// Dispatch a log record to the append target.
    fn append(&self, record: &Record) -> Result<(), Error>;

    /// Dispatch a batch of log records to the append target.
    ///
    /// Default to append every enabled record one by one.
    fn append_batch(&self, records: &[Record]) -> Result<(), Error> {
        for record in records {
            if self.enabled(record.metadata()) {
                self.append(record)?;
            }
        }
        Ok(())
    }

    /// Flush any buffered records.
    ///
    /// Default to a no-op.
    fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}

impl<T: Append> From<T> for Box<dyn Append> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

impl<T: Append + ?Sized> Append for Arc<T> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        (**self).enabled(metadata)
    }

    fn bubble(&self) -> bool {
        (**self).bubble()
    }

    fn append(&self, record: &Record) -> Result<(), Error> {
        (**self).append(record)
    }

    fn append_batch(&self, records: &[Record]) -> Result<(), Error> {
        (**self).append_batch(records)
    }

    fn flush(&self) -> Result<(), Error> {
        (**self).flush()
    }
}
