//! Portable io_uring fallback for non-Linux platforms or when the feature is disabled.
//!
//! Exposes the same names as the real module. [`is_io_uring_available`]
//! always returns `false` and [`IoUringBackend::new`] always fails, so
//! [`select_backend`](crate::backend::select_backend) settles on positioned I/O.

use std::io;

use crate::backend::{BackendKind, IoBackend};
use crate::file_handle::FileHandle;

/// Check whether io_uring is available (always `false` on this platform).
#[must_use]
pub const fn is_io_uring_available() -> bool {
    false
}

/// Submission queue entries the real backend would request.
pub const RING_ENTRIES: u32 = 8;

/// Placeholder backend that cannot be constructed.
#[derive(Debug)]
pub struct IoUringBackend {
    _private: (),
}

fn unsupported() -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        "io_uring is not available on this platform",
    )
}

impl IoUringBackend {
    /// Always fails with [`io::ErrorKind::Unsupported`].
    pub fn new() -> io::Result<Self> {
        Err(unsupported())
    }
}

impl IoBackend for IoUringBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::IoUring
    }

    fn submit_read(&mut self, _handle: &mut FileHandle, _buf: &mut [u8]) -> io::Result<usize> {
        Err(unsupported())
    }

    fn submit_write(&mut self, _handle: &mut FileHandle, _buf: &[u8]) -> io::Result<usize> {
        Err(unsupported())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_reports_unavailable() {
        assert!(!is_io_uring_available());
        let err = IoUringBackend::new().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }
}
