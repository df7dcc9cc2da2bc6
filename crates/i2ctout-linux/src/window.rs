//! Mapped windows of physical memory.

#![allow(unsafe_code)]

use std::ffi::c_void;
use std::fs::OpenOptions;
use std::mem::ManuallyDrop;
use std::num::NonZeroUsize;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::ptr::NonNull;

use nix::libc::{off_t, O_SYNC};
use nix::sys::mman::{mmap, munmap, MapFlags, ProtFlags};
use nix::unistd::{sysconf, SysconfVar};
use tracing::{debug, trace};

use crate::{MapError, Result};

const FALLBACK_PAGE_SIZE: usize = 4096;

/// Size in bytes of the system memory page.
///
/// # Errors
///
/// Returns an error if `sysconf` fails.
pub fn page_size() -> Result<usize> {
    let size = sysconf(SysconfVar::PAGE_SIZE).map_err(MapError::PageSize)?;
    Ok(size
        .and_then(|s| usize::try_from(s).ok())
        .filter(|s| *s > 0)
        .unwrap_or(FALLBACK_PAGE_SIZE))
}

/// A read/write window onto physical memory.
///
/// The kernel only maps page-aligned offsets, so the mapping starts at the
/// page containing `base` and the window begins `base % page_size` bytes
/// into it. All accesses are volatile 32-bit loads and stores.
#[derive(Debug)]
pub struct PhysicalWindow {
    mapping: NonNull<c_void>,
    mapping_len: usize,
    window_offset: usize,
    len: usize,
    base: u64,
}

impl PhysicalWindow {
    /// Map `len` bytes of physical memory at `base` through the device at
    /// `path` (normally `/dev/mem`).
    ///
    /// The device is opened with `O_SYNC` and closed again once the mapping
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is unusable, the device cannot be
    /// opened, or `mmap` fails.
    pub fn open(path: &Path, base: u64, len: usize) -> Result<Self> {
        if len == 0 {
            return Err(MapError::EmptyWindow);
        }
        if base % 4 != 0 {
            return Err(MapError::Misaligned { base });
        }

        let page = page_size()?;
        let window_offset = usize::try_from(base % page as u64)
            .map_err(|_| MapError::AddressOutOfRange { base })?;
        let aligned = base - window_offset as u64;
        let offset = off_t::try_from(aligned).map_err(|_| MapError::AddressOutOfRange { base })?;
        let mapping_len = window_offset
            .checked_add(len)
            .and_then(NonZeroUsize::new)
            .ok_or(MapError::EmptyWindow)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(O_SYNC)
            .open(path)
            .map_err(|source| MapError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        debug!(
            device = %path.display(),
            base = %format!("{base:#010x}"),
            page_base = %format!("{aligned:#010x}"),
            len = mapping_len.get(),
            "Mapping physical memory"
        );

        // SAFETY: a fresh shared mapping at a kernel-chosen address; nothing
        // else in this process aliases it.
        let mapping = unsafe {
            mmap(
                None,
                mapping_len,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                &file,
                offset,
            )
        }
        .map_err(|source| MapError::Map { base, source })?;

        // The mapping stays valid after the descriptor is closed.
        drop(file);

        Ok(Self {
            mapping,
            mapping_len: mapping_len.get(),
            window_offset,
            len,
            base,
        })
    }

    /// Volatile read of the 32-bit word at `offset` bytes into the window.
    ///
    /// # Errors
    ///
    /// Returns an error if the word does not lie inside the window or is
    /// not 4-byte aligned.
    pub fn read_u32(&self, offset: usize) -> Result<u32> {
        let ptr = self.word_ptr(offset)?;
        // SAFETY: `word_ptr` checked bounds and alignment against the live
        // mapping.
        let value = unsafe { std::ptr::read_volatile(ptr) };
        trace!(offset = %format!("{offset:#04x}"), value, "read");
        Ok(value)
    }

    /// Volatile write of `value` to the 32-bit word at `offset` bytes into
    /// the window.
    ///
    /// # Errors
    ///
    /// Returns an error if the word does not lie inside the window or is
    /// not 4-byte aligned.
    pub fn write_u32(&mut self, offset: usize, value: u32) -> Result<()> {
        let ptr = self.word_ptr(offset)?;
        trace!(offset = %format!("{offset:#04x}"), value, "write");
        // SAFETY: as in `read_u32`; `&mut self` gives exclusive access.
        unsafe { std::ptr::write_volatile(ptr, value) };
        Ok(())
    }

    /// Unmap the window, reporting any failure.
    ///
    /// Dropping the window also unmaps it but discards errors.
    ///
    /// # Errors
    ///
    /// Returns an error if `munmap` fails.
    pub fn unmap(self) -> Result<()> {
        let this = ManuallyDrop::new(self);
        debug!(base = %format!("{:#010x}", this.base), "Unmapping physical memory");
        // SAFETY: the mapping came from `mmap` with this length and is not
        // used again; `Drop` will not run.
        unsafe { munmap(this.mapping, this.mapping_len) }.map_err(MapError::Unmap)
    }

    fn word_ptr(&self, offset: usize) -> Result<*mut u32> {
        let in_bounds = offset
            .checked_add(4)
            .is_some_and(|end| end <= self.len);
        if !in_bounds || offset % 4 != 0 {
            return Err(MapError::OutOfWindow {
                offset,
                len: self.len,
            });
        }
        // SAFETY: `window_offset + offset + 4 <= mapping_len`.
        let ptr = unsafe {
            self.mapping
                .as_ptr()
                .cast::<u8>()
                .add(self.window_offset + offset)
        };
        Ok(ptr.cast::<u32>())
    }
}

impl Drop for PhysicalWindow {
    fn drop(&mut self) {
        // SAFETY: the mapping is owned by this value and unmapped once.
        let _ = unsafe { munmap(self.mapping, self.mapping_len) };
    }
}
