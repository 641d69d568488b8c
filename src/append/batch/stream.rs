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
use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use crate::Error;
use crate::ErrorKind;
use crate::append::batch::lock;

const FILE_SCHEME: &str = "file://";
const SCHEME_SEPARATOR: &str = "://";

/// A writable stream owned by the caller and shared with a [`BatchStream`](super::BatchStream).
///
/// The appender only ever drops its own reference; the caller keeps the stream usable.
pub type SharedWriter = Arc<Mutex<dyn Write + Send>>;

/// The slot of a file opened by the appender; emptied when the appender is closed.
type FileSlot = Arc<Mutex<Option<File>>>;

/// A stream currently open for writing, as returned by
/// [`BatchStream::stream`](super::BatchStream::stream).
///
/// Handles to a file opened by the appender from its url stop working once the appender is
/// closed: [`is_open`](Stream::is_open) returns `false` and writes fail.
#[derive(Clone)]
pub struct Stream(Target);

#[derive(Clone)]
enum Target {
    Writer(SharedWriter),
    SharedFile(Arc<File>),
    OwnedFile(FileSlot),
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Target::Writer(_) => write!(f, "Stream::Writer {{ ... }}"),
            Target::SharedFile(file) => f.debug_tuple("Stream::SharedFile").field(file).finish(),
            Target::OwnedFile(slot) => f.debug_tuple("Stream::OwnedFile").field(slot).finish(),
        }
    }
}

impl Stream {
    pub(super) fn writer(writer: SharedWriter) -> Self {
        Stream(Target::Writer(writer))
    }

    pub(super) fn shared_file(file: Arc<File>) -> Self {
        Stream(Target::SharedFile(file))
    }

    /// Whether the stream is backed by a file, so that writes can be locked.
    pub fn is_file(&self) -> bool {
        !matches!(self.0, Target::Writer(_))
    }

    /// Whether the stream can still be written to.
    pub fn is_open(&self) -> bool {
        match &self.0 {
            Target::Writer(_) | Target::SharedFile(_) => true,
            Target::OwnedFile(slot) => lock_slot(slot).is_some(),
        }
    }

    /// Whether both handles refer to the same underlying stream.
    pub fn ptr_eq(&self, other: &Stream) -> bool {
        match (&self.0, &other.0) {
            (Target::Writer(a), Target::Writer(b)) => Arc::ptr_eq(a, b),
            (Target::SharedFile(a), Target::SharedFile(b)) => Arc::ptr_eq(a, b),
            (Target::OwnedFile(a), Target::OwnedFile(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Write the whole buffer to the stream.
    ///
    /// # Errors
    ///
    /// Fails if the stream was opened by an appender that has been closed since.
    pub fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        self.write_batch(buf, false)
    }

    /// Flush the stream.
    pub fn flush(&self) -> io::Result<()> {
        match &self.0 {
            Target::Writer(writer) => writer.lock().unwrap_or_else(|e| e.into_inner()).flush(),
            Target::SharedFile(file) => (&**file).flush(),
            Target::OwnedFile(slot) => match lock_slot(slot).as_ref() {
                Some(mut file) => file.flush(),
                None => Err(closed_error()),
            },
        }
    }

    /// Write the buffer with one `write_all`, holding an advisory lock on file-backed streams
    /// when `use_locking` is set.
    pub(super) fn write_batch(&self, buf: &[u8], use_locking: bool) -> io::Result<()> {
        match &self.0 {
            Target::Writer(writer) => {
                let mut writer = writer.lock().unwrap_or_else(|e| e.into_inner());
                writer.write_all(buf)?;
                writer.flush()
            }
            Target::SharedFile(file) => write_file(file, buf, use_locking),
            Target::OwnedFile(slot) => match lock_slot(slot).as_ref() {
                Some(file) => write_file(file, buf, use_locking),
                None => Err(closed_error()),
            },
        }
    }
}

fn lock_slot(slot: &FileSlot) -> std::sync::MutexGuard<'_, Option<File>> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

fn closed_error() -> io::Error {
    io::Error::other("the stream has been closed")
}

fn write_file(file: &File, buf: &[u8], use_locking: bool) -> io::Result<()> {
    // lock failures are ignored: the single write still keeps the batch grouped
    if use_locking {
        let _ = lock::lock_exclusive(file);
    }
    let mut writer = file;
    let result = writer.write_all(buf);
    if use_locking {
        let _ = lock::unlock(file);
    }
    result
}

/// Whether the directory of an owned sink has been attempted to be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum DirectoryState {
    Untried,
    Tried,
}

/// The target of a [`BatchStream`](super::BatchStream).
pub(super) enum Sink {
    /// A caller-owned writer or file; `None` once the appender is closed.
    Borrowed(Option<Stream>),
    /// A locator the appender opens lazily and owns.
    Owned {
        locator: Locator,
        directory: DirectoryState,
        file: Option<FileSlot>,
    },
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sink::Borrowed(stream) => f
                .debug_struct("Sink::Borrowed")
                .field("stream", stream)
                .finish(),
            Sink::Owned {
                locator,
                directory,
                file,
            } => f
                .debug_struct("Sink::Owned")
                .field("locator", locator)
                .field("directory", directory)
                .field("file", file)
                .finish(),
        }
    }
}

impl Sink {
    pub(super) fn owned(locator: Locator) -> Self {
        Sink::Owned {
            locator,
            directory: DirectoryState::Untried,
            file: None,
        }
    }

    pub(super) fn stream(&self) -> Option<Stream> {
        match self {
            Sink::Borrowed(stream) => stream.clone(),
            Sink::Owned { file, .. } => file.clone().map(|slot| Stream(Target::OwnedFile(slot))),
        }
    }

    pub(super) fn url(&self) -> Option<&str> {
        match self {
            Sink::Borrowed(_) => None,
            Sink::Owned { locator, .. } => Some(locator.as_str()),
        }
    }

    /// Return the open stream, opening the locator first if needed.
    pub(super) fn open(&mut self, file_permission: Option<u32>) -> Result<Stream, Error> {
        match self {
            Sink::Borrowed(Some(stream)) => Ok(stream.clone()),
            Sink::Borrowed(None) => Err(Error::new(
                ErrorKind::State,
                "missing stream url, the stream can not be reopened; \
                 this may be caused by a premature call to close()",
            )),
            Sink::Owned {
                locator,
                directory,
                file,
            } => {
                if let Some(slot) = file {
                    return Ok(Stream(Target::OwnedFile(slot.clone())));
                }

                if *directory == DirectoryState::Untried {
                    *directory = DirectoryState::Tried;
                    if let Some(dir) = locator.directory() {
                        create_directory(&dir)?;
                    }
                }

                let opened = locator.open()?;
                if let Some(mode) = file_permission {
                    if let Some(path) = locator.path() {
                        set_permission(path, mode);
                    }
                }
                let slot = Arc::new(Mutex::new(Some(opened)));
                *file = Some(slot.clone());
                Ok(Stream(Target::OwnedFile(slot)))
            }
        }
    }

    /// Drop the reference to the stream.
    ///
    /// An owned file is closed, so handles obtained from [`Sink::stream`] stop working. Borrowed
    /// streams are left to the caller.
    pub(super) fn close(&mut self) {
        match self {
            Sink::Borrowed(stream) => *stream = None,
            Sink::Owned { file, .. } => {
                if let Some(slot) = file.take() {
                    // dropping the file closes its descriptor
                    drop(lock_slot(&slot).take());
                }
            }
        }
    }
}

/// A locator string: a plain path, a `file://` url, or a url of another scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Locator(String);

impl Locator {
    pub(super) fn new(locator: String) -> Result<Self, Error> {
        if locator.is_empty() {
            return Err(Error::new(
                ErrorKind::Argument,
                "a stream must either be a shared writer or a non-empty url",
            ));
        }
        Ok(Locator(locator))
    }

    pub(super) fn as_str(&self) -> &str {
        &self.0
    }

    /// The local path of this locator, or `None` for schemes other than `file`.
    pub(super) fn path(&self) -> Option<&Path> {
        let locator = self.0.as_str();
        if let Some(path) = locator.strip_prefix(FILE_SCHEME) {
            Some(Path::new(path))
        } else if locator.contains(SCHEME_SEPARATOR) {
            None
        } else {
            Some(Path::new(locator))
        }
    }

    /// The directory to create before opening; remote schemes have none.
    pub(super) fn directory(&self) -> Option<PathBuf> {
        let parent = self.path()?.parent()?;
        if parent.as_os_str().is_empty() {
            Some(PathBuf::from("."))
        } else {
            Some(parent.to_path_buf())
        }
    }

    fn open(&self) -> Result<File, Error> {
        let path = self.path().ok_or_else(|| {
            let scheme = self.0.split(SCHEME_SEPARATOR).next().unwrap_or_default();
            Error::new(
                ErrorKind::Resource,
                format!(
                    "The stream or file \"{}\" could not be opened: unsupported scheme \"{scheme}\"",
                    self.0
                ),
            )
            .with_context("locator", &self.0)
        })?;

        OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map_err(|err| {
                Error::new(
                    ErrorKind::Resource,
                    format!(
                        "The stream or file \"{}\" could not be opened: {}",
                        self.0,
                        os_error_text(&err)
                    ),
                )
                .with_context("locator", &self.0)
                .with_source(err)
            })
    }
}

fn create_directory(dir: &Path) -> Result<(), Error> {
    if dir.is_dir() {
        return Ok(());
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o777);
    }

    match builder.create(dir) {
        Ok(()) => Ok(()),
        // another writer may have created it concurrently
        Err(_) if dir.is_dir() => Ok(()),
        Err(err) => Err(Error::new(
            ErrorKind::Resource,
            format!(
                "There is no existing directory at \"{}\" and it is not buildable: {}",
                dir.display(),
                os_error_text(&err)
            ),
        )
        .with_context("directory", dir.display())
        .with_source(err)),
    }
}

#[cfg(unix)]
fn set_permission(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    let _ = fs::set_permissions(path, fs::Permissions::from_mode(mode));
}

#[cfg(not(unix))]
fn set_permission(_: &Path, _: u32) {}

/// The message of an OS error, without a leading `name(args): ` call prefix.
pub(super) fn os_error_text(err: &io::Error) -> String {
    strip_call_prefix(&err.to_string()).to_string()
}

fn strip_call_prefix(message: &str) -> &str {
    let Some(open) = message.find('(') else {
        return message;
    };
    let name = &message[..open];
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return message;
    }
    match message[open..].find("): ") {
        Some(close) => &message[open + close + 3..],
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator(s: &str) -> Locator {
        Locator::new(s.to_string()).unwrap()
    }

    #[test]
    fn test_empty_locator_is_rejected() {
        let err = Locator::new(String::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn test_directory_derivation() {
        assert_eq!(
            locator("/var/log/app/request.log").directory(),
            Some(PathBuf::from("/var/log/app"))
        );
        assert_eq!(
            locator("file:///var/log/app/request.log").directory(),
            Some(PathBuf::from("/var/log/app"))
        );
        assert_eq!(locator("request.log").directory(), Some(PathBuf::from(".")));
        assert_eq!(locator("ftp://example.com/logs/request.log").directory(), None);
        assert_eq!(locator("ftp://example.com/logs/request.log").path(), None);
    }

    #[test]
    fn test_strip_call_prefix() {
        assert_eq!(
            strip_call_prefix("fopen(/var/log/app.log): Permission denied"),
            "Permission denied"
        );
        assert_eq!(
            strip_call_prefix("mkdir(): File exists"),
            "File exists"
        );
        assert_eq!(
            strip_call_prefix("Permission denied (os error 13)"),
            "Permission denied (os error 13)"
        );
        assert_eq!(strip_call_prefix("no prefix here"), "no prefix here");
    }

    #[test]
    fn test_unsupported_scheme_fails_to_open() {
        let mut sink = Sink::owned(locator("bogus://url"));
        let err = sink.open(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resource);
        assert!(err.message().contains("could not be opened"));
        assert!(sink.stream().is_none());
    }

    #[test]
    fn test_close_invalidates_owned_streams() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("app.log");
        let mut sink = Sink::owned(locator(&path.display().to_string()));

        let stream = sink.open(None).unwrap();
        stream.write_batch(b"kept", false).unwrap();
        assert!(stream.ptr_eq(&sink.open(None).unwrap()));

        sink.close();
        assert!(sink.stream().is_none());
        assert!(!stream.is_open());
        assert!(stream.write_batch(b"lost", false).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "kept");
    }

    #[test]
    fn test_closed_borrowed_sink_cannot_reopen() {
        let writer: SharedWriter = Arc::new(Mutex::new(Vec::<u8>::new()));
        let mut sink = Sink::Borrowed(Some(Stream::writer(writer)));
        assert!(sink.open(None).is_ok());

        sink.close();
        let err = sink.open(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
        assert!(err.message().contains("premature call to close()"));
    }
}
