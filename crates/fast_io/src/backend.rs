//! Positioned I/O backends with exactly one operation in flight.
//!
//! [`IoBackend`] is the seam between the transfer pipeline and the kernel.
//! Both implementations issue one transfer at [`FileHandle::offset`], wait
//! for it to complete, and advance the handle by the confirmed byte count
//! before returning. Callers may therefore reuse the buffer as soon as a
//! call returns.

use std::fmt;
use std::io;

use crate::file_handle::FileHandle;
use crate::io_uring::{IoUringBackend, is_io_uring_available};

/// Which strategy a backend uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// `pread`/`pwrite` on the calling thread.
    Sync,
    /// One SQE submitted to an io_uring ring, waited on immediately.
    IoUring,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync => f.write_str("sync"),
            Self::IoUring => f.write_str("io_uring"),
        }
    }
}

/// One-at-a-time positioned file I/O.
pub trait IoBackend {
    /// Reports the strategy in use.
    fn kind(&self) -> BackendKind;

    /// Reads into `buf` at the handle's offset.
    ///
    /// Returns the number of bytes read; `0` signals end of file. The handle
    /// is advanced by the returned count.
    fn submit_read(&mut self, handle: &mut FileHandle, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes `buf` at the handle's offset.
    ///
    /// Returns the number of bytes the kernel accepted, which may be fewer
    /// than `buf.len()`. The handle is advanced by the returned count.
    fn submit_write(&mut self, handle: &mut FileHandle, buf: &[u8]) -> io::Result<usize>;
}

/// Synchronous `pread`/`pwrite` backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyncBackend;

impl SyncBackend {
    /// Creates the backend.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl IoBackend for SyncBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sync
    }

    fn submit_read(&mut self, handle: &mut FileHandle, buf: &mut [u8]) -> io::Result<usize> {
        let n = retry_interrupted(|| positioned::read_at(handle, buf))?;
        handle.advance(n);
        Ok(n)
    }

    fn submit_write(&mut self, handle: &mut FileHandle, buf: &[u8]) -> io::Result<usize> {
        let n = retry_interrupted(|| positioned::write_at(handle, buf))?;
        handle.advance(n);
        Ok(n)
    }
}

fn retry_interrupted(mut op: impl FnMut() -> io::Result<usize>) -> io::Result<usize> {
    loop {
        match op() {
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}

#[cfg(unix)]
mod positioned {
    use std::io;
    use std::os::unix::fs::FileExt;

    use crate::file_handle::FileHandle;

    pub(super) fn read_at(handle: &FileHandle, buf: &mut [u8]) -> io::Result<usize> {
        handle.file().read_at(buf, handle.offset())
    }

    pub(super) fn write_at(handle: &FileHandle, buf: &[u8]) -> io::Result<usize> {
        handle.file().write_at(buf, handle.offset())
    }
}

#[cfg(windows)]
mod positioned {
    use std::io;
    use std::os::windows::fs::FileExt;

    use crate::file_handle::FileHandle;

    pub(super) fn read_at(handle: &FileHandle, buf: &mut [u8]) -> io::Result<usize> {
        handle.file().seek_read(buf, handle.offset())
    }

    pub(super) fn write_at(handle: &FileHandle, buf: &[u8]) -> io::Result<usize> {
        handle.file().seek_write(buf, handle.offset())
    }
}

/// Chooses the backend for one invocation.
///
/// When `prefer_io_uring` is set and a ring can be created, the io_uring
/// backend is returned. Any failure falls back to [`SyncBackend`] silently
/// (a `debug!` event records the reason).
#[must_use]
pub fn select_backend(prefer_io_uring: bool) -> Box<dyn IoBackend> {
    if prefer_io_uring {
        if !is_io_uring_available() {
            tracing::debug!("io_uring unavailable, using positioned I/O");
            return Box::new(SyncBackend::new());
        }
        match IoUringBackend::new() {
            Ok(backend) => return Box::new(backend),
            Err(error) => {
                tracing::debug!(%error, "io_uring setup failed, using positioned I/O");
            }
        }
    }
    Box::new(SyncBackend::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn sync_read_advances_offset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("src.bin");
        std::fs::write(&path, b"0123456789").unwrap();

        let mut handle = FileHandle::open_read(&path, false).unwrap();
        let mut backend = SyncBackend::new();
        let mut buf = [0u8; 4];

        assert_eq!(backend.submit_read(&mut handle, &mut buf).unwrap(), 4);
        assert_eq!(&buf, b"0123");
        assert_eq!(backend.submit_read(&mut handle, &mut buf).unwrap(), 4);
        assert_eq!(&buf, b"4567");
        assert_eq!(backend.submit_read(&mut handle, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"89");
        assert_eq!(backend.submit_read(&mut handle, &mut buf).unwrap(), 0);
        assert_eq!(handle.offset(), 10);
    }

    #[test]
    fn sync_write_is_positioned() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dst.bin");

        let mut handle = FileHandle::create_write(&path, false).unwrap();
        let mut backend = SyncBackend::new();
        assert_eq!(backend.submit_write(&mut handle, b"abc").unwrap(), 3);
        assert_eq!(backend.submit_write(&mut handle, b"def").unwrap(), 3);
        drop(handle);

        assert_eq!(std::fs::read(&path).unwrap(), b"abcdef");
    }

    #[test]
    fn selection_without_preference_is_sync() {
        assert_eq!(select_backend(false).kind(), BackendKind::Sync);
    }

    #[test]
    fn selection_with_preference_always_succeeds() {
        let backend = select_backend(true);
        if is_io_uring_available() {
            // A ring may still be refused (seccomp, memlock limits).
            assert!(matches!(
                backend.kind(),
                BackendKind::IoUring | BackendKind::Sync
            ));
        } else {
            assert_eq!(backend.kind(), BackendKind::Sync);
        }
    }

    #[test]
    fn backend_kind_display() {
        assert_eq!(BackendKind::Sync.to_string(), "sync");
        assert_eq!(BackendKind::IoUring.to_string(), "io_uring");
    }
}
