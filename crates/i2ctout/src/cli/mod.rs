//! Command-line interface for i2ctout.
//!
//! This module provides the argument structure for the `i2c-set-tout`
//! binary and the formatting of its single line of output.

mod output;

use std::path::PathBuf;

use clap::Parser;

pub use output::render;

/// i2c-set-tout - Set the I2C clock-stretch timeout
///
/// Writes the TOUT field of the BSC controller's CLKT register through
/// /dev/mem. The timeout is in SCL cycles; at 100 kHz, 2000 is 20 ms.
/// Usually needs root.
///
/// Invalid values are reported as `ERROR <message>` with exit status 1.
#[derive(Debug, Parser)]
#[command(name = "i2c-set-tout")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Physical base address of the controller, decimal or 0x-prefixed hex,
    /// underscores allowed in either (e.g. 0x2080_4000 for BSC1 on BCM2835)
    #[arg(value_name = "BASE_ADDRESS")]
    pub base_address: String,

    /// Clock-stretch timeout in SCL cycles, 1 to 65535
    #[arg(value_name = "TIMEOUT", allow_negative_numbers = true)]
    pub timeout: String,

    /// Path to custom configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Memory device to map (overrides configuration)
    #[arg(short, long, value_name = "PATH")]
    pub device: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }

    /// Parse and validate the positional arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if either argument is invalid.
    pub fn request(&self) -> crate::Result<crate::Request> {
        crate::Request::parse(&self.base_address, &self.timeout)
    }

    /// Apply command-line overrides to a loaded configuration.
    pub fn apply_overrides(&self, config: &mut crate::Config) {
        if let Some(device) = &self.device {
            config.device.path.clone_from(device);
        }
        if self.json {
            config.output.json = true;
        }
    }
}
