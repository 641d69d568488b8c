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
use crate::Logger;
use crate::Trap;
use crate::trap::DefaultTrap;

/// Create a new empty [`LoggerBuilder`].
///
/// # Examples
///
/// ```
/// use logforth_batch::append::BatchStreamBuilder;
/// use logforth_batch::append::Buffer;
/// use logforth_batch::record::Level;
///
/// let batch = BatchStreamBuilder::url("logs/app.log")
///     .filter(Level::Info)
///     .build()
///     .unwrap();
///
/// let logger = logforth_batch::builder().append(Buffer::new(batch)).build();
/// ```
pub fn builder() -> LoggerBuilder {
    LoggerBuilder {
        appends: vec![],
        trap: Box::new(DefaultTrap::default()),
    }
}

/// A builder for configuring the logger. See also [`builder`] for a fluent API.
#[must_use = "call `apply` to set the global logger or `build` to construct a logger instance"]
#[derive(Debug)]
pub struct LoggerBuilder {
    appends: Vec<Box<dyn Append>>,
    trap: Box<dyn Trap>,
}

impl LoggerBuilder {
    /// Add an appender to the end of the chain.
    ///
    /// Records visit appenders in the order they are added. A record stops at the first appender
    /// that handles it and does not [bubble](Append::bubble).
    pub fn append(mut self, append: impl Into<Box<dyn Append>>) -> Self {
        self.appends.push(append.into());
        self
    }

    /// Set the trap for errors raised by appenders.
    ///
    /// Default to [`DefaultTrap`].
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// Build the [`Logger`].
    ///
    /// # Examples
    ///
    /// ```
    /// use logforth_batch::record::Record;
    ///
    /// let l = logforth_batch::builder().build();
    /// let r = Record::builder().payload("hello world!").build();
    /// l.log(&r);
    /// ```
    pub fn build(self) -> Logger {
        Logger::new(self.appends, self.trap)
    }

    /// Set up the global logger of the `log` crate with the configured appenders.
    ///
    /// This should be called early in the execution of a Rust program. Any log events that occur
    /// before initialization will be ignored.
    ///
    /// # Errors
    ///
    /// Return an error if a global logger has already been set.
    pub fn try_apply(self) -> Result<(), log::SetLoggerError> {
        log::set_boxed_logger(Box::new(self.build()))?;
        log::set_max_level(log::LevelFilter::Trace);
        Ok(())
    }

    /// Set up the global logger of the `log` crate with the configured appenders.
    ///
    /// # Panics
    ///
    /// Panic if the global logger has already been set.
    pub fn apply(self) {
        self.try_apply()
            .expect("LoggerBuilder::apply must be called before the global logger initialized");
    }
}
