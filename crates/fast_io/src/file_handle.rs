//! File descriptors with a monotonic logical offset for positioned I/O.
//!
//! A [`FileHandle`] never seeks. Every transfer is issued at
//! [`FileHandle::offset`], and the offset is advanced by the backend only
//! after the kernel has confirmed how many bytes moved.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

/// Permission bits for newly created destinations (before the umask).
pub const DEFAULT_CREATE_MODE: u32 = 0o664;

/// An open file plus the position of the next positioned transfer.
#[derive(Debug)]
pub struct FileHandle {
    file: File,
    path: PathBuf,
    offset: u64,
    direct: bool,
}

impl FileHandle {
    /// Opens `path` read-only, requesting `O_DIRECT` when `direct` is set.
    ///
    /// Filesystems that reject direct I/O (`EINVAL`, e.g. tmpfs) are retried
    /// without the flag; [`is_direct`](Self::is_direct) reports what the
    /// kernel accepted.
    pub fn open_read(path: &Path, direct: bool) -> io::Result<Self> {
        let mut options = OpenOptions::new();
        options.read(true);
        Self::open_with(options, path, direct)
    }

    /// Creates or truncates `path` for writing with mode `0664 & !umask`.
    ///
    /// Direct I/O is requested the same way as [`open_read`](Self::open_read).
    pub fn create_write(path: &Path, direct: bool) -> io::Result<Self> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(DEFAULT_CREATE_MODE);
        Self::open_with(options, path, direct)
    }

    /// Wraps an already open file positioned at offset zero.
    #[must_use]
    pub fn from_file(file: File, path: impl Into<PathBuf>) -> Self {
        Self {
            file,
            path: path.into(),
            offset: 0,
            direct: false,
        }
    }

    fn open_with(options: OpenOptions, path: &Path, direct: bool) -> io::Result<Self> {
        if direct {
            match open_direct(&options, path) {
                Ok(Some(file)) => {
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                        offset: 0,
                        direct: true,
                    });
                }
                Ok(None) => {
                    tracing::debug!(path = %path.display(), "direct I/O unsupported, opening buffered");
                }
                Err(error) => return Err(error),
            }
        }

        let file = options.open(path)?;
        Ok(Self::from_file(file, path))
    }

    /// Position of the next transfer.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Moves the offset forward after a confirmed transfer of `n` bytes.
    pub fn advance(&mut self, n: usize) {
        self.offset += n as u64;
    }

    /// Returns `true` while the descriptor carries `O_DIRECT`.
    #[must_use]
    pub const fn is_direct(&self) -> bool {
        self.direct
    }

    /// Clears `O_DIRECT` on the open descriptor.
    ///
    /// A no-op when the descriptor is already buffered.
    pub fn set_buffered(&mut self) -> io::Result<()> {
        if !self.direct {
            return Ok(());
        }
        clear_direct_flag(&self.file)?;
        self.direct = false;
        tracing::debug!(path = %self.path.display(), "switched to buffered I/O");
        Ok(())
    }

    /// Path the handle was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Underlying file.
    #[must_use]
    pub const fn file(&self) -> &File {
        &self.file
    }
}

/// Tries an `O_DIRECT` open; `Ok(None)` means the filesystem refused the flag.
#[cfg(target_os = "linux")]
fn open_direct(options: &OpenOptions, path: &Path) -> io::Result<Option<File>> {
    let mut direct = options.clone();
    direct.custom_flags(libc::O_DIRECT);
    match direct.open(path) {
        Ok(file) => Ok(Some(file)),
        Err(error) if error.raw_os_error() == Some(libc::EINVAL) => Ok(None),
        Err(error) => Err(error),
    }
}

#[cfg(not(target_os = "linux"))]
fn open_direct(_options: &OpenOptions, _path: &Path) -> io::Result<Option<File>> {
    Ok(None)
}

#[cfg(target_os = "linux")]
fn clear_direct_flag(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let fd = file.as_raw_fd();
    // SAFETY: `fd` is a valid descriptor owned by `file` for the duration of the call.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: as above; only the status flags are modified.
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_DIRECT) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn clear_direct_flag(_file: &File) -> io::Result<()> {
    Ok(())
}
