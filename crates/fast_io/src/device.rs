//! Source sizing for regular files and block devices.

use std::fs::File;
use std::io;

/// Sector size reported by `BLKGETSIZE`.
pub const SECTOR_SIZE: u64 = 512;

/// Returns the number of bytes readable from `file`.
///
/// Regular files report their metadata length. Block devices report a zero
/// length through `stat`, so their size is taken from the `BLKGETSIZE` ioctl
/// (sector count) multiplied by [`SECTOR_SIZE`].
pub fn source_size(file: &File) -> io::Result<u64> {
    let metadata = file.metadata()?;
    if is_block_device(&metadata) {
        return block_device_size(file);
    }
    Ok(metadata.len())
}

#[cfg(unix)]
fn is_block_device(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::FileTypeExt;
    metadata.file_type().is_block_device()
}

#[cfg(not(unix))]
fn is_block_device(_metadata: &std::fs::Metadata) -> bool {
    false
}

#[cfg(target_os = "linux")]
fn block_device_size(file: &File) -> io::Result<u64> {
    use std::os::unix::io::AsRawFd;

    // _IO(0x12, 96)
    const BLKGETSIZE: libc::c_ulong = 0x1260;

    let mut sectors: libc::c_ulong = 0;
    // SAFETY: BLKGETSIZE writes one `unsigned long` through the pointer.
    let rc = unsafe { libc::ioctl(file.as_raw_fd(), BLKGETSIZE as _, &mut sectors) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(u64::from(sectors) * SECTOR_SIZE)
}

#[cfg(not(target_os = "linux"))]
fn block_device_size(_file: &File) -> io::Result<u64> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "block device sizing is only supported on Linux",
    ))
}
