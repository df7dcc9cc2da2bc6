//! `i2ctout` - Set the clock-stretch timeout of a Broadcom I2C controller
//!
//! This library maps the controller's register block through `/dev/mem`,
//! writes the `TOUT` field of its `CLKT` register, and reads it back.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
#[cfg(target_os = "linux")]
pub mod mmio;
pub mod register;
pub mod run;

pub use config::Config;
pub use controller::{I2cController, RegisterSnapshot};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use register::{BaseAddress, ClockStretchTimeout, Register, RegisterBlock, BLOCK_SIZE};
pub use run::{apply, run, Outcome, Request};
