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
use std::fmt;
use std::fs::File;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::Error;
use crate::ErrorKind;
use crate::append::Append;
use crate::append::batch::stream::Locator;
use crate::append::batch::stream::SharedWriter;
use crate::append::batch::stream::Sink;
use crate::append::batch::stream::Stream;
use crate::layout::Layout;
use crate::layout::PlainTextLayout;
use crate::record::LevelFilter;
use crate::record::Metadata;
use crate::record::Record;

enum Target {
    Writer(SharedWriter),
    File(Arc<File>),
    Url(String),
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Writer(_) => write!(f, "Target::Writer {{ ... }}"),
            Target::File(file) => f.debug_tuple("Target::File").field(file).finish(),
            Target::Url(url) => f.debug_tuple("Target::Url").field(url).finish(),
        }
    }
}

/// A builder to configure and create a [`BatchStream`] appender.
#[derive(Debug)]
pub struct BatchStreamBuilder {
    target: Target,
    filter: LevelFilter,
    bubble: bool,
    file_permission: Option<u32>,
    use_locking: bool,
    layout: Box<dyn Layout>,
    envelope: Envelope,
}

impl BatchStreamBuilder {
    fn new(target: Target) -> Self {
        Self {
            target,
            filter: LevelFilter::All,
            bubble: true,
            file_permission: None,
            use_locking: false,
            layout: Box::new(PlainTextLayout::default()),
            envelope: Envelope::default(),
        }
    }

    /// Create a builder that writes to a locator: a file path, a `file://` url, or a url of
    /// another scheme.
    ///
    /// The file is opened lazily on the first non-empty batch and owned by the appender.
    pub fn url(locator: impl Into<String>) -> Self {
        Self::new(Target::Url(locator.into()))
    }

    /// Create a builder that writes to a caller-owned writer.
    ///
    /// The appender never closes the writer.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use std::sync::Mutex;
    ///
    /// use logforth_batch::append::BatchStreamBuilder;
    ///
    /// let sink = Arc::new(Mutex::new(Vec::<u8>::new()));
    /// let batch = BatchStreamBuilder::writer(sink.clone()).build().unwrap();
    /// ```
    pub fn writer(writer: SharedWriter) -> Self {
        Self::new(Target::Writer(writer))
    }

    /// Create a builder that writes to a caller-owned file.
    ///
    /// Unlike a [`SharedWriter`], the file is locked during each write when
    /// [`use_locking`](BatchStreamBuilder::use_locking) is set. The appender never closes the file.
    pub fn file(file: Arc<File>) -> Self {
        Self::new(Target::File(file))
    }

    /// Set the minimum severity of records written by the appender.
    ///
    /// Default to all levels.
    pub fn filter(mut self, filter: impl Into<LevelFilter>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Set whether records handled by the appender continue to the next appender of a
    /// [`Logger`](crate::Logger).
    ///
    /// Default to `true`.
    pub fn bubble(mut self, bubble: bool) -> Self {
        self.bubble = bubble;
        self
    }

    /// Set the mode applied to the file after it is opened, such as `0o644`.
    ///
    /// Applying the mode is best-effort and has no effect on non-unix platforms.
    pub fn file_permission(mut self, mode: u32) -> Self {
        self.file_permission = Some(mode);
        self
    }

    /// Set whether to hold an advisory exclusive lock on the file during each write.
    ///
    /// Locking is best-effort and applies to file-backed streams: files opened from the url and
    /// files passed to [`BatchStreamBuilder::file`]. A [`SharedWriter`] is never locked.
    pub fn use_locking(mut self, use_locking: bool) -> Self {
        self.use_locking = use_locking;
        self
    }

    /// Set the layout for the records.
    ///
    /// Default to [`PlainTextLayout`].
    pub fn layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = layout.into();
        self
    }

    /// Add a line to the envelope head.
    pub fn head_line(mut self, line: impl Into<String>) -> Self {
        self.envelope.head.push(line.into());
        self
    }

    /// Add a line to the envelope foot.
    pub fn foot_line(mut self, line: impl Into<String>) -> Self {
        self.envelope.foot.push(line.into());
        self
    }

    /// Build the [`BatchStream`] appender.
    ///
    /// # Errors
    ///
    /// Return an [`ErrorKind::Argument`] error if the configured url is empty.
    pub fn build(self) -> Result<BatchStream, Error> {
        let BatchStreamBuilder {
            target,
            filter,
            bubble,
            file_permission,
            use_locking,
            layout,
            envelope,
        } = self;

        let sink = match target {
            Target::Writer(writer) => Sink::Borrowed(Some(Stream::writer(writer))),
            Target::File(file) => Sink::Borrowed(Some(Stream::shared_file(file))),
            Target::Url(url) => Sink::owned(Locator::new(url)?),
        };

        Ok(BatchStream {
            filter,
            bubble,
            file_permission,
            use_locking,
            layout,
            state: Mutex::new(State {
                sink,
                envelope,
                buffer: Vec::new(),
            }),
        })
    }
}

/// Head and foot lines wrapped around the text of a non-empty batch.
#[derive(Debug, Default)]
struct Envelope {
    head: Vec<String>,
    foot: Vec<String>,
}

impl Envelope {
    fn is_empty(&self) -> bool {
        self.head.is_empty() && self.foot.is_empty()
    }

    /// Wrap `buffer` as `head.join("\n") + "\n" + buffer + foot.join("\n") + "\n"`.
    ///
    /// An empty buffer is never wrapped.
    fn wrap(&self, buffer: &mut Vec<u8>) {
        if buffer.is_empty() || self.is_empty() {
            return;
        }

        let head = self.head.join("\n");
        let foot = self.foot.join("\n");
        let mut wrapped = Vec::with_capacity(head.len() + buffer.len() + foot.len() + 2);
        wrapped.extend_from_slice(head.as_bytes());
        wrapped.push(b'\n');
        wrapped.append(buffer);
        wrapped.extend_from_slice(foot.as_bytes());
        wrapped.push(b'\n');
        *buffer = wrapped;
    }
}

#[derive(Debug)]
struct State {
    sink: Sink,
    envelope: Envelope,
    buffer: Vec<u8>,
}

/// An appender that writes a whole batch of log records to a stream with a single write.
///
/// The records of one unit of work, such as one web request, stay grouped in the output even if
/// other processes write to the same file concurrently. The batch can be wrapped in an envelope of
/// head and foot lines, which is only written when at least one record of the batch is written.
///
/// Records must be handed over with [`Append::append_batch`]; [`Append::append`] always fails.
/// Wrap the appender in a [`Buffer`](crate::append::Buffer) to collect records one by one and
/// write them at the end of the unit of work.
///
/// # Examples
///
/// ```
/// use logforth_batch::append::Append;
/// use logforth_batch::append::BatchStreamBuilder;
/// use logforth_batch::record::Level;
/// use logforth_batch::record::Record;
///
/// let dir = tempfile::tempdir().unwrap();
/// let batch = BatchStreamBuilder::url(dir.path().join("requests/app.log").display().to_string())
///     .filter(Level::Info)
///     .head_line("--- GET /users ---")
///     .build()
///     .unwrap();
///
/// batch
///     .append_batch(&[
///         Record::builder().level(Level::Info).payload("loading users").build(),
///         Record::builder().level(Level::Debug).payload("cache miss").build(),
///     ])
///     .unwrap();
/// ```
#[derive(Debug)]
pub struct BatchStream {
    filter: LevelFilter,
    bubble: bool,
    file_permission: Option<u32>,
    use_locking: bool,
    layout: Box<dyn Layout>,
    state: Mutex<State>,
}

impl BatchStream {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a line to the envelope head.
    pub fn push_head_line(&self, line: impl Into<String>) {
        self.state().envelope.head.push(line.into());
    }

    /// Add lines to the envelope head, in order.
    pub fn push_head_lines<I>(&self, lines: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut state = self.state();
        state.envelope.head.extend(lines.into_iter().map(Into::into));
    }

    /// Add a line to the envelope foot.
    pub fn push_foot_line(&self, line: impl Into<String>) {
        self.state().envelope.foot.push(line.into());
    }

    /// Add lines to the envelope foot, in order.
    pub fn push_foot_lines<I>(&self, lines: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut state = self.state();
        state.envelope.foot.extend(lines.into_iter().map(Into::into));
    }

    /// Return the currently open stream, if any.
    ///
    /// A handle to a file opened from the url stops working when the appender is closed.
    pub fn stream(&self) -> Option<Stream> {
        self.state().sink.stream()
    }

    /// Return the configured url, if the appender was built from one.
    pub fn url(&self) -> Option<String> {
        self.state().sink.url().map(ToString::to_string)
    }

    /// Close the stream.
    ///
    /// A file opened from the url is closed, including for handles returned by
    /// [`stream`](BatchStream::stream), and reopened by the next batch. A caller-owned writer or
    /// file is only released: it stays usable by the caller, and later batches fail with
    /// [`ErrorKind::State`].
    pub fn close(&self) {
        self.state().sink.close();
    }

    fn format_into(&self, records: &[Record], buffer: &mut Vec<u8>) -> Result<(), Error> {
        for record in records {
            if self.filter.test(record.level()) {
                let bytes = self.layout.format(record)?;
                buffer.extend_from_slice(&bytes);
            }
        }
        Ok(())
    }

    fn write_buffer(&self, sink: &mut Sink, buffer: &[u8]) -> Result<(), Error> {
        if buffer.is_empty() {
            return Ok(());
        }

        let stream = sink.open(self.file_permission)?;
        stream
            .write_batch(buffer, self.use_locking)
            .map_err(|err| {
                Error::new(ErrorKind::Unexpected, "failed to write batch")
                    .with_context("bytes", buffer.len())
                    .with_source(err)
            })
    }
}

impl Append for BatchStream {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.filter.test(metadata.level())
    }

    fn bubble(&self) -> bool {
        self.bubble
    }

    fn append(&self, _: &Record) -> Result<(), Error> {
        Err(Error::new(
            ErrorKind::Usage,
            "BatchStream must only be used via batch entry point",
        ))
    }

    fn append_batch(&self, records: &[Record]) -> Result<(), Error> {
        let mut state = self.state();
        let State {
            sink,
            envelope,
            buffer,
        } = &mut *state;

        buffer.clear();
        let result = self.format_into(records, buffer).and_then(|()| {
            envelope.wrap(buffer);
            self.write_buffer(sink, buffer)
        });
        buffer.clear();
        result
    }

    fn flush(&self) -> Result<(), Error> {
        match self.stream() {
            Some(stream) => stream.flush().map_err(Error::from_io_error),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::io::Write;
    use std::sync::Arc;

    use super::*;
    use crate::layout::CustomLayout;
    use crate::record::Level;

    /// Records every write call it receives.
    #[derive(Debug, Default)]
    struct WriteLog {
        writes: Vec<Vec<u8>>,
    }

    impl Write for WriteLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes.push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn payload_layout() -> CustomLayout {
        CustomLayout::new(|record: &Record| Ok(record.payload().as_bytes().to_vec()))
    }

    fn record(level: Level, payload: &'static str) -> Record {
        Record::builder().level(level).payload(payload).build()
    }

    #[test]
    fn test_envelope_wrap() {
        let envelope = Envelope {
            head: vec!["H1".to_string(), "H2".to_string()],
            foot: vec!["F1".to_string()],
        };

        let mut buffer = b"abc".to_vec();
        envelope.wrap(&mut buffer);
        assert_eq!(buffer, b"H1\nH2\nabcF1\n");

        let mut empty = vec![];
        envelope.wrap(&mut empty);
        assert!(empty.is_empty());

        let mut bare = b"abc".to_vec();
        Envelope::default().wrap(&mut bare);
        assert_eq!(bare, b"abc");
    }

    #[test]
    fn test_batch_is_a_single_write() {
        let log = Arc::new(Mutex::new(WriteLog::default()));
        let batch = BatchStreamBuilder::writer(log.clone())
            .layout(payload_layout())
            .head_line("H1")
            .build()
            .unwrap();
        batch.push_head_line("H2");
        batch.push_foot_line("F1");

        batch
            .append_batch(&[
                record(Level::Info, "a"),
                record(Level::Info, "b"),
                record(Level::Info, "c"),
            ])
            .unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.writes, vec![b"H1\nH2\nabcF1\n".to_vec()]);
    }

    #[test]
    fn test_filtered_batch_writes_nothing() {
        let log = Arc::new(Mutex::new(WriteLog::default()));
        let batch = BatchStreamBuilder::writer(log.clone())
            .filter(Level::Crit)
            .layout(payload_layout())
            .head_line("head")
            .foot_line("foot")
            .build()
            .unwrap();

        batch
            .append_batch(&[record(Level::Warn, "a"), record(Level::Error, "b")])
            .unwrap();
        batch.append_batch(&[]).unwrap();

        assert!(log.lock().unwrap().writes.is_empty());
    }

    #[test]
    fn test_single_record_entry_point_is_disabled() {
        let log = Arc::new(Mutex::new(WriteLog::default()));
        let batch = BatchStreamBuilder::writer(log.clone()).build().unwrap();

        for level in [Level::Crit, Level::Info, Level::Trace] {
            let err = batch.append(&record(level, "x")).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Usage);
            assert!(err.message().contains("must only be used via batch entry point"));
        }
        assert!(log.lock().unwrap().writes.is_empty());
    }

    #[test]
    fn test_failed_format_discards_the_batch() {
        let log = Arc::new(Mutex::new(WriteLog::default()));
        let batch = BatchStreamBuilder::writer(log.clone())
            .layout(CustomLayout::new(|record: &Record| {
                if record.payload() == "bad" {
                    Err(Error::new(ErrorKind::Unexpected, "cannot format"))
                } else {
                    Ok(record.payload().as_bytes().to_vec())
                }
            }))
            .build()
            .unwrap();

        let err = batch
            .append_batch(&[record(Level::Info, "good"), record(Level::Info, "bad")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert!(log.lock().unwrap().writes.is_empty());

        batch.append_batch(&[record(Level::Info, "next")]).unwrap();
        assert_eq!(log.lock().unwrap().writes, vec![b"next".to_vec()]);
    }

    #[test]
    fn test_empty_url_is_rejected() {
        let err = BatchStreamBuilder::url("").build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn test_enabled_and_bubble() {
        let batch = BatchStreamBuilder::url("app.log")
            .filter(Level::Warn)
            .bubble(false)
            .build()
            .unwrap();

        let warn = Metadata::builder().level(Level::Warn).build();
        let info = Metadata::builder().level(Level::Info).build();
        assert!(batch.enabled(&warn));
        assert!(!batch.enabled(&info));
        assert!(!batch.bubble());
        assert_eq!(batch.url().as_deref(), Some("app.log"));
        assert!(batch.stream().is_none());
    }
}
