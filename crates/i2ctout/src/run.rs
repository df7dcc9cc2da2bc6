//! The one-shot set-timeout sequence.

use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::controller::I2cController;
use crate::error::{Error, Result};
use crate::register::{BaseAddress, ClockStretchTimeout, Register, RegisterBlock};

/// What to write, and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    /// Physical base address of the controller.
    pub base_address: BaseAddress,
    /// Timeout to write.
    pub timeout: ClockStretchTimeout,
}

impl Request {
    /// Parse and validate the two command-line arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the address does not parse or is misaligned, or
    /// if the timeout does not parse or is outside `1..=65535`.
    pub fn parse(base_address: &str, timeout: &str) -> Result<Self> {
        Ok(Self {
            base_address: base_address.parse()?,
            timeout: timeout.parse()?,
        })
    }
}

/// Result of a completed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Physical base address of the controller.
    pub base_address: BaseAddress,
    /// Register that was written.
    pub register: Register,
    /// `TOUT` value read back after the write.
    pub tout: u16,
}

/// Serialized form of an [`Outcome`].
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    status: &'static str,
    base_address: &'a BaseAddress,
    register: Register,
    tout: u16,
}

impl Outcome {
    /// The JSON report for this outcome.
    #[must_use]
    pub fn report(&self) -> Report<'_> {
        Report {
            status: "ok",
            base_address: &self.base_address,
            register: self.register,
            tout: self.tout,
        }
    }
}

/// Write `timeout` through `block` and return the value read back.
///
/// Only `CLKT` is accessed unless debug logging is enabled, in which case
/// the side-effect-free registers are also read before and after.
///
/// # Errors
///
/// Returns an error if any register access fails.
pub fn apply<B: RegisterBlock>(block: B, timeout: ClockStretchTimeout) -> Result<(B, u16)> {
    let mut controller = I2cController::new(block);
    controller.log_snapshot("before");
    let tout = controller.set_clock_stretch_timeout(timeout)?;
    controller.log_snapshot("after");
    Ok((controller.into_inner(), tout))
}

/// Map the controller, write the timeout, and unmap.
///
/// # Errors
///
/// Returns an error if the device path is empty, mapping fails, a register
/// access fails, or unmapping fails.
#[cfg(target_os = "linux")]
pub fn run(config: &Config, request: Request) -> Result<Outcome> {
    let device = &config.device.path;
    if device.as_os_str().is_empty() {
        return Err(Error::Device {
            path: device.clone(),
            message: "path is empty".to_string(),
        });
    }

    debug!(
        device = %device.display(),
        base = %request.base_address,
        timeout = request.timeout.cycles(),
        "Setting clock-stretch timeout"
    );

    let window = crate::mmio::open_block(device, request.base_address)?;
    let (window, tout) = apply(window, request.timeout)?;
    window.unmap()?;

    Ok(Outcome {
        base_address: request.base_address,
        register: Register::Clkt,
        tout,
    })
}

/// Physical memory access is only implemented for Linux.
///
/// # Errors
///
/// Always returns [`Error::Unsupported`].
#[cfg(not(target_os = "linux"))]
pub fn run(_config: &Config, request: Request) -> Result<Outcome> {
    debug!(base = %request.base_address, "Physical memory access unavailable");
    Err(Error::unsupported(std::env::consts::OS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::{MemoryBlock, REGISTER_COUNT};

    #[test]
    fn test_request_parse() {
        let request = Request::parse("0x20804000", "3000").unwrap();
        assert_eq!(request.base_address.get(), 0x2080_4000);
        assert_eq!(request.timeout.cycles(), 3000);
    }

    #[test]
    fn test_request_parse_rejects_bad_timeout() {
        assert!(matches!(
            Request::parse("0x20804000", "0"),
            Err(Error::TimeoutOutOfRange { value: 0 })
        ));
        assert!(matches!(
            Request::parse("0x20804000", "65536"),
            Err(Error::TimeoutOutOfRange { value: 65536 })
        ));
        assert!(matches!(
            Request::parse("0x20804000", "abc"),
            Err(Error::InvalidTimeout { .. })
        ));
    }

    #[test]
    fn test_request_parse_rejects_bad_address() {
        assert!(matches!(
            Request::parse("bsc1", "3000"),
            Err(Error::InvalidAddress { .. })
        ));
        assert!(matches!(
            Request::parse("0x20804002", "3000"),
            Err(Error::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_apply_touches_only_clkt_below_debug() {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter("warn")
            .with_test_writer()
            .finish();

        let (block, tout) = tracing::subscriber::with_default(subscriber, || {
            apply(MemoryBlock::default(), ClockStretchTimeout::new(3000).unwrap()).unwrap()
        });

        assert_eq!(tout, 3000);
        assert_eq!(block.reads.into_inner(), vec![Register::Clkt]);
        assert_eq!(block.writes, vec![(Register::Clkt, 3000)]);
    }

    #[test]
    fn test_apply_at_debug_never_reads_fifo() {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .finish();

        let (block, _) = tracing::subscriber::with_default(subscriber, || {
            apply(MemoryBlock::default(), ClockStretchTimeout::new(3000).unwrap()).unwrap()
        });

        let reads = block.reads.into_inner();
        assert!(!reads.contains(&Register::Fifo));
        // Two snapshots plus the CLKT read-back.
        assert_eq!(reads.len(), 2 * (REGISTER_COUNT - 1) + 1);
        assert_eq!(block.writes, vec![(Register::Clkt, 3000)]);
    }

    #[test]
    fn test_apply_writes_and_reads_back() {
        let (block, tout) =
            apply(MemoryBlock::default(), ClockStretchTimeout::new(50000).unwrap()).unwrap();
        assert_eq!(tout, 50000);
        assert_eq!(block.writes, vec![(Register::Clkt, 50000)]);
    }

    #[test]
    fn test_apply_leaves_other_registers_alone() {
        let block = MemoryBlock {
            words: [0x8000, 0x50, 0, 0x20, 0, 0x5dc, 0x0030_0030, 0x40],
            ..MemoryBlock::default()
        };
        let (block, _) = apply(block, ClockStretchTimeout::new(2000).unwrap()).unwrap();
        assert_eq!(block.words[..REGISTER_COUNT - 1], [0x8000, 0x50, 0, 0x20, 0, 0x5dc, 0x0030_0030]);
        assert_eq!(block.words[Register::Clkt as usize], 2000);
    }

    #[test]
    fn test_outcome_report() {
        let outcome = Outcome {
            base_address: BaseAddress::new(0x2080_4000).unwrap(),
            register: Register::Clkt,
            tout: 1,
        };
        let json = serde_json::to_value(outcome.report()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "ok",
                "base_address": "0x20804000",
                "register": "CLKT",
                "tout": 1
            })
        );
    }

    #[cfg(target_os = "linux")]
    mod linux {
        use super::*;

        use std::fs;
        use std::path::PathBuf;

        use i2ctout_linux::page_size;

        /// A regular file standing in for `/dev/mem`.
        struct FakeMemory {
            path: PathBuf,
        }

        impl FakeMemory {
            fn new(name: &str, len: usize) -> Self {
                let path = std::env::temp_dir()
                    .join(format!("i2ctout-{}-{name}.bin", std::process::id()));
                fs::write(&path, vec![0u8; len]).expect("failed to create fake memory");
                Self { path }
            }

            fn word_at(&self, offset: usize) -> u32 {
                let bytes = fs::read(&self.path).expect("failed to read fake memory");
                let mut word = [0u8; 4];
                word.copy_from_slice(&bytes[offset..offset + 4]);
                u32::from_ne_bytes(word)
            }

            fn config(&self) -> Config {
                let mut config = Config::default();
                config.device.path.clone_from(&self.path);
                config
            }
        }

        impl Drop for FakeMemory {
            fn drop(&mut self) {
                let _ = fs::remove_file(&self.path);
            }
        }

        fn request(base: u64, timeout: i64) -> Request {
            Request {
                base_address: BaseAddress::new(base).unwrap(),
                timeout: ClockStretchTimeout::new(timeout).unwrap(),
            }
        }

        #[test]
        fn test_run_writes_clkt_in_device() {
            let page = page_size().unwrap();
            let memory = FakeMemory::new("run", page * 2);

            let outcome = run(&memory.config(), request(page as u64, 3000)).unwrap();
            assert_eq!(outcome.tout, 3000);
            assert_eq!(outcome.register, Register::Clkt);
            assert_eq!(outcome.base_address.get(), page as u64);

            assert_eq!(memory.word_at(page + Register::Clkt.offset()), 3000);
            assert_eq!(memory.word_at(page), 0);
        }

        #[test]
        fn test_run_with_base_inside_page() {
            let page = page_size().unwrap();
            let memory = FakeMemory::new("inside", page);

            let outcome = run(&memory.config(), request(0x100, 65535)).unwrap();
            assert_eq!(outcome.tout, 65535);
            assert_eq!(memory.word_at(0x100 + 0x1c), 65535);
        }

        #[test]
        fn test_run_missing_device() {
            let mut config = Config::default();
            config.device.path = PathBuf::from("/nonexistent/i2ctout/mem");

            let err = run(&config, request(0x2080_4000, 3000)).unwrap_err();
            assert!(matches!(err, Error::Memory(i2ctout_linux::MapError::Open { .. })));
            assert!(err.to_string().contains("try sudo"));
        }

        #[test]
        fn test_run_empty_device_path() {
            let mut config = Config::default();
            config.device.path = PathBuf::new();

            let err = run(&config, request(0x2080_4000, 3000)).unwrap_err();
            assert!(matches!(err, Error::Device { .. }));
        }
    }
}
