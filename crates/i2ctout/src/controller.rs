//! Operations on a single I2C controller.

use tracing::{debug, info, warn, Level};

use crate::error::Result;
use crate::register::{
    ClockStretchTimeout, Register, RegisterBlock, CLKT_TOUT_MASK, REGISTER_COUNT,
};

/// Values of the controller registers at one point in time.
///
/// Registers whose reads have side effects are not read and have no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterSnapshot {
    words: [Option<u32>; REGISTER_COUNT],
}

impl RegisterSnapshot {
    /// Value of `register` in this snapshot, `None` if it was skipped.
    #[must_use]
    pub fn get(&self, register: Register) -> Option<u32> {
        self.words[register as usize]
    }

    /// Iterate over `(register, value)` pairs in layout order.
    pub fn iter(&self) -> impl Iterator<Item = (Register, Option<u32>)> + '_ {
        Register::ALL.into_iter().map(move |r| (r, self.get(r)))
    }
}

/// A BSC controller reached through a [`RegisterBlock`].
#[derive(Debug)]
pub struct I2cController<B> {
    block: B,
}

impl<B: RegisterBlock> I2cController<B> {
    /// Wrap a register block.
    pub fn new(block: B) -> Self {
        Self { block }
    }

    /// Release the underlying register block.
    pub fn into_inner(self) -> B {
        self.block
    }

    /// Read every register whose read has no side effects.
    ///
    /// `FIFO` is skipped: reading it pops a byte from the receive FIFO.
    ///
    /// # Errors
    ///
    /// Returns an error if any read fails.
    pub fn snapshot(&self) -> Result<RegisterSnapshot> {
        let mut words = [None; REGISTER_COUNT];
        for register in Register::ALL {
            if register.read_has_side_effects() {
                continue;
            }
            words[register as usize] = Some(self.block.read(register)?);
        }
        Ok(RegisterSnapshot { words })
    }

    /// Current value of `CLKT.TOUT`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn clock_stretch_timeout(&self) -> Result<u16> {
        let clkt = self.block.read(Register::Clkt)?;
        // Masked to 16 bits, so the cast cannot truncate.
        #[allow(clippy::cast_possible_truncation)]
        let tout = (clkt & CLKT_TOUT_MASK) as u16;
        Ok(tout)
    }

    /// Write `timeout` to `CLKT` and return the `TOUT` value read back.
    ///
    /// The reserved upper bits are written as zero. A read-back that differs
    /// from the request is logged, not treated as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the write or the read-back fails.
    pub fn set_clock_stretch_timeout(&mut self, timeout: ClockStretchTimeout) -> Result<u16> {
        self.block
            .write(Register::Clkt, u32::from(timeout.cycles()))?;
        let tout = self.clock_stretch_timeout()?;

        if tout == timeout.cycles() {
            info!(tout, "Set CLKT.TOUT");
        } else {
            warn!(
                requested = timeout.cycles(),
                read_back = tout,
                "CLKT.TOUT read back differs from the value written"
            );
        }
        Ok(tout)
    }

    /// Log a register snapshot at debug level.
    ///
    /// Nothing is read unless debug logging is enabled.
    pub(crate) fn log_snapshot(&self, stage: &'static str) {
        if !tracing::enabled!(Level::DEBUG) {
            return;
        }
        match self.snapshot() {
            Ok(snapshot) => {
                for (register, value) in snapshot.iter() {
                    match value {
                        Some(value) => debug!(
                            stage,
                            register = register.name(),
                            value = %format!("{value:#010x}"),
                            "register"
                        ),
                        None => debug!(stage, register = register.name(), "register skipped"),
                    }
                }
            }
            Err(e) => debug!(stage, error = %e, "Register snapshot failed"),
        }
    }
}
