//! Register layout of the Broadcom Serial Controller (BSC), the I2C master
//! found on BCM2835, BCM2836, BCM2837 and BCM2711.
//!
//! See the "BSC" chapter of the BCM2835 ARM Peripherals datasheet.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Error, Result};

/// Number of 32-bit registers in the controller block.
pub const REGISTER_COUNT: usize = 8;

/// Size in bytes of the mapped register window.
pub const BLOCK_SIZE: usize = REGISTER_COUNT * 4;

/// Mask of the `TOUT` field in `CLKT`. Bits 16..=31 are reserved.
pub const CLKT_TOUT_MASK: u32 = 0x0000_ffff;

/// A controller register, in layout order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Register {
    /// Control.
    C,
    /// Status.
    S,
    /// Data length.
    Dlen,
    /// Slave address.
    A,
    /// Data FIFO.
    Fifo,
    /// Clock divider.
    Div,
    /// Data delay.
    Del,
    /// Clock stretch timeout.
    Clkt,
}

impl Register {
    /// Every register, in layout order.
    pub const ALL: [Self; REGISTER_COUNT] = [
        Self::C,
        Self::S,
        Self::Dlen,
        Self::A,
        Self::Fifo,
        Self::Div,
        Self::Del,
        Self::Clkt,
    ];

    /// Byte offset of the register from the controller base.
    #[must_use]
    pub const fn offset(self) -> usize {
        (self as usize) * 4
    }

    /// Datasheet name of the register.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::C => "C",
            Self::S => "S",
            Self::Dlen => "DLEN",
            Self::A => "A",
            Self::Fifo => "FIFO",
            Self::Div => "DIV",
            Self::Del => "DEL",
            Self::Clkt => "CLKT",
        }
    }

    /// Whether reading the register changes controller state. Reading
    /// `FIFO` pops a byte from the receive FIFO.
    #[must_use]
    pub const fn read_has_side_effects(self) -> bool {
        matches!(self, Self::Fifo)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Access to a block of controller registers.
///
/// Implemented by the mapped physical window on Linux.
pub trait RegisterBlock {
    /// Read the current value of `register`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying access fails.
    fn read(&self, register: Register) -> Result<u32>;

    /// Write `value` to `register`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying access fails.
    fn write(&mut self, register: Register, value: u32) -> Result<()>;
}

/// Number of SCL cycles the master waits after a rising SCL edge before
/// deciding the slave is not responding.
///
/// At 100 kHz one cycle is 10 µs, so 2000 is 20 ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockStretchTimeout(u16);

impl ClockStretchTimeout {
    /// Smallest accepted timeout.
    pub const MIN: u16 = 1;

    /// Validate `value`.
    ///
    /// # Errors
    ///
    /// Returns an error unless `1 <= value <= 65535`.
    pub fn new(value: i64) -> Result<Self> {
        u16::try_from(value)
            .ok()
            .filter(|v| *v >= Self::MIN)
            .map(Self)
            .ok_or(Error::TimeoutOutOfRange { value })
    }

    /// The timeout in SCL cycles.
    #[must_use]
    pub fn cycles(self) -> u16 {
        self.0
    }
}

impl FromStr for ClockStretchTimeout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim().parse::<i64>().map_err(|e| Error::InvalidTimeout {
            input: s.to_string(),
            reason: e.to_string(),
        })?;
        Self::new(value)
    }
}

impl fmt::Display for ClockStretchTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physical base address of a controller.
///
/// Known values: BSC0 `0x20205000` and BSC1 `0x20804000` on BCM2835
/// (add `0x1f000000` on BCM2836/BCM2837).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BaseAddress(u64);

impl BaseAddress {
    /// Validate `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is not 4-byte aligned.
    pub fn new(value: u64) -> Result<Self> {
        if value % 4 != 0 {
            return Err(Error::invalid_address(
                format!("{value:#x}"),
                "must be 4-byte aligned",
            ));
        }
        Ok(Self(value))
    }

    /// The address as an integer.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl FromStr for BaseAddress {
    type Err = Error;

    /// Accepts decimal (`545275904`) or `0x`-prefixed hexadecimal
    /// (`0x20804000`). Underscores between digits are ignored in both.
    fn from_str(s: &str) -> Result<Self> {
        let digits = s.trim().replace('_', "");
        let parsed = match digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
        {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => digits.parse::<u64>(),
        };
        let value = parsed.map_err(|e| Error::invalid_address(s, e.to_string()))?;
        Self::new(value).map_err(|_| Error::invalid_address(s, "must be 4-byte aligned"))
    }
}

impl fmt::Display for BaseAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl Serialize for BaseAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// In-memory register block for tests. Records every access.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryBlock {
    pub(crate) words: [u32; REGISTER_COUNT],
    /// Bits that ignore writes and keep their current value.
    pub(crate) read_only_mask: [u32; REGISTER_COUNT],
    pub(crate) reads: std::cell::RefCell<Vec<Register>>,
    pub(crate) writes: Vec<(Register, u32)>,
}

#[cfg(test)]
impl RegisterBlock for MemoryBlock {
    fn read(&self, register: Register) -> Result<u32> {
        self.reads.borrow_mut().push(register);
        Ok(self.words[register as usize])
    }

    fn write(&mut self, register: Register, value: u32) -> Result<()> {
        let index = register as usize;
        let mask = self.read_only_mask[index];
        self.words[index] = (self.words[index] & mask) | (value & !mask);
        self.writes.push((register, value));
        Ok(())
    }
}
