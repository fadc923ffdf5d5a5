//! io_uring backend for Linux 5.6+.
//!
//! The ring is used at depth one: each call pushes a single `Read` or `Write`
//! SQE carrying the handle's offset, then blocks in `submit_and_wait(1)` until
//! its CQE arrives. The caller's buffer is therefore never observed by the
//! kernel after the call returns.
//!
//! # Requirements
//!
//! - Linux kernel 5.6 or later
//! - The `io_uring` feature must be enabled

mod config;

#[cfg(test)]
mod tests;

use std::io;
use std::os::unix::io::AsRawFd;

use io_uring::{IoUring as RawIoUring, opcode, squeue, types};

pub use config::{RING_ENTRIES, is_io_uring_available};

use crate::backend::{BackendKind, IoBackend};
use crate::file_handle::FileHandle;

/// Positioned I/O through one process-wide ring.
pub struct IoUringBackend {
    ring: RawIoUring,
}

impl std::fmt::Debug for IoUringBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoUringBackend").finish_non_exhaustive()
    }
}

impl IoUringBackend {
    /// Creates a ring with [`RING_ENTRIES`] submission slots.
    pub fn new() -> io::Result<Self> {
        let ring = config::build_ring()?;
        tracing::debug!(entries = RING_ENTRIES, "io_uring ring ready");
        Ok(Self { ring })
    }

    /// Pushes one SQE and waits for its completion.
    fn complete_one(&mut self, entry: &squeue::Entry) -> io::Result<usize> {
        // SAFETY: the buffer referenced by `entry` outlives this call, which
        // does not return until the kernel has posted the matching CQE.
        unsafe {
            self.ring
                .submission()
                .push(entry)
                .map_err(|_| io::Error::other("submission queue full"))?;
        }

        loop {
            match self.ring.submit_and_wait(1) {
                Ok(_) => break,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(error),
            }
        }

        let cqe = self
            .ring
            .completion()
            .next()
            .ok_or_else(|| io::Error::other("no completion"))?;

        let result = cqe.result();
        if result < 0 {
            return Err(io::Error::from_raw_os_error(-result));
        }
        Ok(result as usize)
    }
}

fn sqe_len(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

impl IoBackend for IoUringBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::IoUring
    }

    fn submit_read(&mut self, handle: &mut FileHandle, buf: &mut [u8]) -> io::Result<usize> {
        let fd = types::Fd(handle.file().as_raw_fd());
        let entry = opcode::Read::new(fd, buf.as_mut_ptr(), sqe_len(buf.len()))
            .offset(handle.offset())
            .build()
            .user_data(0);
        let n = loop {
            match self.complete_one(&entry) {
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                result => break result?,
            }
        };
        handle.advance(n);
        Ok(n)
    }

    fn submit_write(&mut self, handle: &mut FileHandle, buf: &[u8]) -> io::Result<usize> {
        let fd = types::Fd(handle.file().as_raw_fd());
        let entry = opcode::Write::new(fd, buf.as_ptr(), sqe_len(buf.len()))
            .offset(handle.offset())
            .build()
            .user_data(1);
        let n = loop {
            match self.complete_one(&entry) {
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                result => break result?,
            }
        };
        handle.advance(n);
        Ok(n)
    }
}
