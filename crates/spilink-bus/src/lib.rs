//! Synchronous serial bus abstraction.
//!
//! Provides a single interface over a clocked, full-duplex bus:
//! - one blocking transfer (every byte clocked out clocks one byte in)
//! - a cooperative exclusive lock shared with other processes
//!
//! This is the lowest layer of spilink. Everything else builds on top of
//! the [`SpiBus`] trait provided here. On Linux, [`SpiDevice`] drives a
//! `/dev/spidevX.Y` character device.

pub mod error;
pub mod traits;

#[cfg(target_os = "linux")]
pub mod spidev;

pub use error::{BusError, Result};
pub use traits::SpiBus;

#[cfg(target_os = "linux")]
pub use spidev::{SpiConfig, SpiDevice, DEFAULT_DEVICE, DEFAULT_SPEED_HZ};
