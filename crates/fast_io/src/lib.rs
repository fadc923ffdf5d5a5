//! Block-aligned buffers and positioned file I/O for qzip.
//!
//! This crate provides the low-level pieces the transfer pipeline drives:
//!
//! - [`aligned`]: heap buffers aligned to [`BLOCK_SIZE`] with fallible allocation
//! - [`buffer_pool`]: per-file source/destination buffers and the escalation ladder
//! - [`file_handle`]: descriptors with a monotonic offset and `O_DIRECT` downgrade
//! - [`device`]: source sizing, including block devices
//! - [`backend`]: the [`IoBackend`] trait with positioned and io_uring strategies
//!
//! # Design Principles
//!
//! 1. **One operation in flight** - every backend call completes before returning
//! 2. **Graceful fallback** - io_uring and `O_DIRECT` silently degrade to
//!    positioned buffered I/O when the kernel or filesystem refuses them
//! 3. **No hidden allocation failure** - buffer allocation returns [`AllocError`]

#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]

pub mod aligned;
pub mod backend;
pub mod buffer_pool;
pub mod device;
pub mod file_handle;

/// io_uring-based positioned I/O for Linux 5.6+.
///
/// On non-Linux platforms or without the `io_uring` feature, a stub is used
/// whose backend can never be constructed.
#[cfg(all(target_os = "linux", feature = "io_uring"))]
pub mod io_uring;
#[cfg(not(all(target_os = "linux", feature = "io_uring")))]
#[path = "io_uring_stub.rs"]
pub mod io_uring;

pub use aligned::{AlignedBuffer, AllocError, BLOCK_SIZE, is_block_aligned, round_up_to_block};
pub use backend::{BackendKind, IoBackend, SyncBackend, select_backend};
pub use buffer_pool::{BufferPool, DEFAULT_EXPANSION_LADDER, Growth};
pub use device::source_size;
pub use file_handle::FileHandle;
pub use io_uring::{IoUringBackend, RING_ENTRIES, is_io_uring_available};
