//! Tests for the io_uring backend.
//!
//! Ring-dependent tests return early when the kernel (or a sandbox) refuses
//! io_uring, mirroring the runtime fallback.

use tempfile::tempdir;

use super::config::{is_io_uring_available, parse_kernel_version};
use super::IoUringBackend;
use crate::backend::{BackendKind, IoBackend};
use crate::file_handle::FileHandle;

fn ring_or_skip() -> Option<IoUringBackend> {
    if !is_io_uring_available() {
        return None;
    }
    IoUringBackend::new().ok()
}

#[test]
fn kernel_version_parsing() {
    assert_eq!(parse_kernel_version("5.15.0-generic"), Some((5, 15)));
    assert_eq!(parse_kernel_version("6.1.0"), Some((6, 1)));
    assert_eq!(parse_kernel_version("4.19.123-aws"), Some((4, 19)));
    assert_eq!(parse_kernel_version("invalid"), None);
}

#[test]
fn availability_is_cached() {
    assert_eq!(is_io_uring_available(), is_io_uring_available());
}

#[test]
fn read_advances_offset_and_reports_eof() {
    let Some(mut backend) = ring_or_skip() else {
        return;
    };
    assert_eq!(backend.kind(), BackendKind::IoUring);

    let dir = tempdir().unwrap();
    let path = dir.path().join("src.bin");
    let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, &data).unwrap();

    let mut handle = FileHandle::open_read(&path, false).unwrap();
    let mut buf = vec![0u8; 4096];
    let mut collected = Vec::new();
    loop {
        let n = backend.submit_read(&mut handle, &mut buf).unwrap();
        if n == 0 {
            break;
        }
        collected.extend_from_slice(&buf[..n]);
    }

    assert_eq!(collected, data);
    assert_eq!(handle.offset(), data.len() as u64);
}

#[test]
fn writes_land_at_successive_offsets() {
    let Some(mut backend) = ring_or_skip() else {
        return;
    };

    let dir = tempdir().unwrap();
    let path = dir.path().join("dst.bin");
    let mut handle = FileHandle::create_write(&path, false).unwrap();

    assert_eq!(backend.submit_write(&mut handle, b"hello ").unwrap(), 6);
    assert_eq!(backend.submit_write(&mut handle, b"ring").unwrap(), 4);
    assert_eq!(handle.offset(), 10);
    drop(handle);

    assert_eq!(std::fs::read(&path).unwrap(), b"hello ring");
}

#[test]
fn read_error_surfaces_as_io_error() {
    let Some(mut backend) = ring_or_skip() else {
        return;
    };

    let dir = tempdir().unwrap();
    let path = dir.path().join("write_only.bin");
    // A write-only descriptor rejects reads with EBADF.
    let mut handle = FileHandle::create_write(&path, false).unwrap();
    let mut buf = [0u8; 16];
    assert!(backend.submit_read(&mut handle, &mut buf).is_err());
    assert_eq!(handle.offset(), 0);
}
