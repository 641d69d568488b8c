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
//! Logforth-batch collects the log records of one unit of work, such as one web request, and
//! writes them to a stream with a single write.
//!
//! # Overview
//!
//! The default appenders of a logging framework write one record at a time, so the records of
//! concurrent requests interleave in a shared log file. A [`BatchStream`](append::BatchStream)
//! appender only accepts whole batches: the accepted records are formatted, concatenated, wrapped
//! in an optional envelope of head and foot lines, and written at once. The file is opened lazily
//! on the first non-empty batch, creating its directory when needed, and can be held under an
//! advisory lock while it is written.
//!
//! # Examples
//!
//! Collect the records of a request with a [`Buffer`](append::Buffer) and write them when the
//! request ends:
//!
//! ```
//! use logforth_batch::append::BatchStreamBuilder;
//! use logforth_batch::append::Buffer;
//! use logforth_batch::record::Level;
//! use logforth_batch::record::Record;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let batch = BatchStreamBuilder::url(dir.path().join("app.log").display().to_string())
//!     .filter(Level::Info)
//!     .head_line("=== GET /users ===")
//!     .build()
//!     .unwrap();
//!
//! let logger = logforth_batch::builder().append(Buffer::new(batch)).build();
//! logger.log(&Record::builder().level(Level::Info).payload("loading users").build());
//! logger.log(&Record::builder().level(Level::Warn).payload("slow query").build());
//!
//! // end of the request
//! logger.flush();
//! ```
//!
//! Install the same chain as the global logger of the `log` crate:
//!
//! ```no_run
//! use logforth_batch::append::BatchStreamBuilder;
//! use logforth_batch::append::Buffer;
//!
//! let batch = BatchStreamBuilder::url("logs/app.log").build().unwrap();
//! logforth_batch::builder().append(Buffer::new(batch)).apply();
//!
//! log::info!("This log will be written with the rest of the batch.");
//! log::logger().flush();
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod append;
pub mod layout;
pub mod record;
pub mod trap;

pub use append::Append;
pub use layout::Layout;
pub use trap::Trap;

mod bridge;

mod error;
pub use self::error::Error;
pub use self::error::ErrorKind;

mod logger;
pub use self::logger::*;
