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
//! Advisory exclusive locks held around a single batch write.

use std::fs::File;
use std::io;

/// Take an advisory exclusive lock on the file, blocking until it is granted.
#[cfg(unix)]
pub(super) fn lock_exclusive(file: &File) -> io::Result<()> {
    flock(file, libc::LOCK_EX)
}

/// Release an advisory lock taken with [`lock_exclusive`].
#[cfg(unix)]
pub(super) fn unlock(file: &File) -> io::Result<()> {
    flock(file, libc::LOCK_UN)
}

#[cfg(unix)]
fn flock(file: &File, operation: libc::c_int) -> io::Result<()> {
    use std::os::fd::AsRawFd;

    // SAFETY: the descriptor is borrowed from a live `&File`, so it stays open for the call.
    let result = unsafe { libc::flock(file.as_raw_fd(), operation) };
    if result < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(not(unix))]
pub(super) fn lock_exclusive(_: &File) -> io::Result<()> {
    Ok(())
}

#[cfg(not(unix))]
pub(super) fn unlock(_: &File) -> io::Result<()> {
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::fd::AsRawFd;

    use tempfile::NamedTempFile;

    use super::*;

    fn try_lock_elsewhere(file: &NamedTempFile) -> bool {
        let other = File::open(file.path()).unwrap();
        let result = unsafe { libc::flock(other.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        result == 0
    }

    #[test]
    fn test_lock_excludes_other_descriptions_until_unlocked() {
        let temp_file = NamedTempFile::new().expect("failed to create a temporary file");
        let file = temp_file.reopen().unwrap();

        lock_exclusive(&file).unwrap();
        assert!(!try_lock_elsewhere(&temp_file));

        unlock(&file).unwrap();
        assert!(try_lock_elsewhere(&temp_file));
    }
}
