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
//! Appender for writing a batch of log records with a single write.
//!
//! # Example
//!
//! ```
//! use logforth_batch::append::Append;
//! use logforth_batch::append::BatchStreamBuilder;
//! use logforth_batch::append::Buffer;
//! use logforth_batch::record::Level;
//! use logforth_batch::record::Record;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let batch = BatchStreamBuilder::url(dir.path().join("app.log").display().to_string())
//!     .filter(Level::Info)
//!     .head_line("=== request 42 ===")
//!     .foot_line("=== end ===")
//!     .use_locking(true)
//!     .build()
//!     .unwrap();
//!
//! let buffer = Buffer::new(batch);
//! buffer
//!     .append(&Record::builder().level(Level::Info).payload("hello").build())
//!     .unwrap();
//!
//! // end of the unit of work: the whole request is written at once
//! buffer.flush().unwrap();
//! ```

pub use self::append::BatchStream;
pub use self::append::BatchStreamBuilder;
pub use self::stream::SharedWriter;
pub use self::stream::Stream;

mod append;
mod lock;
mod stream;
