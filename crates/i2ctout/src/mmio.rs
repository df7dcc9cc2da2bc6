//! Register access through a mapped physical memory window.

use std::path::Path;

use i2ctout_linux::PhysicalWindow;

use crate::error::Result;
use crate::register::{BaseAddress, Register, RegisterBlock, BLOCK_SIZE};

/// Map the controller block at `base` through `device`.
///
/// # Errors
///
/// Returns an error if the device cannot be opened or mapped.
pub fn open_block(device: &Path, base: BaseAddress) -> Result<PhysicalWindow> {
    Ok(PhysicalWindow::open(device, base.get(), BLOCK_SIZE)?)
}

impl RegisterBlock for PhysicalWindow {
    fn read(&self, register: Register) -> Result<u32> {
        Ok(self.read_u32(register.offset())?)
    }

    fn write(&mut self, register: Register, value: u32) -> Result<()> {
        Ok(self.write_u32(register.offset(), value)?)
    }
}
