//! Linux-specific implementation for i2ctout
//!
//! This crate maps windows of physical memory through `/dev/mem` so that
//! peripheral registers can be read and written from user space. The error
//! type is available everywhere; the window itself only on Linux.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

#[cfg(target_os = "linux")]
mod window;

use std::path::PathBuf;

use thiserror::Error;

#[cfg(target_os = "linux")]
pub use window::{page_size, PhysicalWindow};

/// Default device exposing physical memory.
pub const MEM_DEVICE_PATH: &str = "/dev/mem";

/// Errors raised while mapping or accessing physical memory.
#[derive(Debug, Error)]
pub enum MapError {
    /// The memory device could not be opened.
    #[error("driver open failed for {path} (try sudo)")]
    Open {
        /// Device that was opened.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// `mmap` rejected the request.
    #[error("mmap failed at {base:#010x}")]
    Map {
        /// Physical base address of the window.
        base: u64,
        /// The underlying error.
        #[source]
        source: nix::Error,
    },

    /// `munmap` rejected the request.
    #[error("munmap failed")]
    Unmap(#[source] nix::Error),

    /// The base address does not fit the platform's file offset type.
    #[error("address {base:#x} is out of range for this platform")]
    AddressOutOfRange {
        /// Physical base address of the window.
        base: u64,
    },

    /// The base address is not aligned for 32-bit access.
    #[error("address {base:#x} is not 4-byte aligned")]
    Misaligned {
        /// Physical base address of the window.
        base: u64,
    },

    /// A zero-length window was requested.
    #[error("window length must be greater than 0")]
    EmptyWindow,

    /// A register access fell outside the window.
    #[error("offset {offset:#x} is outside the {len}-byte window")]
    OutOfWindow {
        /// Byte offset of the access.
        offset: usize,
        /// Length of the window.
        len: usize,
    },

    /// The system page size could not be determined.
    #[error("failed to query page size")]
    PageSize(#[source] nix::Error),
}

/// Result type for physical memory operations.
pub type Result<T> = std::result::Result<T, MapError>;
