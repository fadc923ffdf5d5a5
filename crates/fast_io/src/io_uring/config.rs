//! Ring sizing and kernel detection.

use std::ffi::CStr;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use io_uring::IoUring as RawIoUring;

/// Minimum kernel version with `IORING_OP_READ`/`IORING_OP_WRITE` (5.6).
const MIN_KERNEL_VERSION: (u32, u32) = (5, 6);

static IO_URING_AVAILABLE: AtomicBool = AtomicBool::new(false);
static IO_URING_CHECKED: AtomicBool = AtomicBool::new(false);

/// Extracts `(major, minor)` from a uname release such as `"6.1.0-13-amd64"`.
pub(super) fn parse_kernel_version(release: &str) -> Option<(u32, u32)> {
    let mut parts = release.split(|c: char| !c.is_ascii_digit());
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}

fn kernel_release() -> Option<String> {
    // SAFETY: `utsname` is plain data and uname fills it on success.
    unsafe {
        let mut utsname: libc::utsname = std::mem::zeroed();
        if libc::uname(&mut utsname) != 0 {
            return None;
        }
        let release = CStr::from_ptr(utsname.release.as_ptr());
        release.to_str().ok().map(String::from)
    }
}

/// Returns `true` when the running kernel can create an io_uring ring.
///
/// The probe (kernel version check plus a throwaway 4-entry ring, which also
/// catches seccomp filters) runs once per process.
#[must_use]
pub fn is_io_uring_available() -> bool {
    if IO_URING_CHECKED.load(Ordering::Relaxed) {
        return IO_URING_AVAILABLE.load(Ordering::Relaxed);
    }

    let available = probe();
    IO_URING_AVAILABLE.store(available, Ordering::Relaxed);
    IO_URING_CHECKED.store(true, Ordering::Relaxed);
    available
}

fn probe() -> bool {
    let Some(version) = kernel_release().as_deref().and_then(parse_kernel_version) else {
        return false;
    };
    if version < MIN_KERNEL_VERSION {
        return false;
    }
    RawIoUring::new(4).is_ok()
}

/// Submission queue entries. The backend keeps one request in flight.
pub const RING_ENTRIES: u32 = 8;

/// Creates the process ring.
pub(super) fn build_ring() -> io::Result<RawIoUring> {
    RawIoUring::new(RING_ENTRIES)
        .map_err(|e| io::Error::other(format!("io_uring init failed: {e}")))
}
