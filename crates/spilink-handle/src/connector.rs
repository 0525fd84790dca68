use spilink_bus::{SpiBus, SpiConfig, SpiDevice};
use tracing::debug;

use crate::config::LinkConfig;
use crate::error::Result;
use crate::handle::BusHandle;

/// Handle on the Linux spidev backend.
pub type SpiHandle = BusHandle<SpiDevice>;

/// Open the well-known device and connect to the peer on it.
///
/// `serial` selects a specific peer; an empty string accepts any.
pub fn open(serial: &str) -> Result<SpiHandle> {
    open_with_config(serial, &SpiConfig::default(), LinkConfig::default())
}

/// Open with explicit bus settings and protocol timing.
pub fn open_with_config(
    serial: &str,
    spi_config: &SpiConfig,
    link_config: LinkConfig,
) -> Result<SpiHandle> {
    let device = SpiDevice::open(spi_config)?;
    BusHandle::connect_with_config(device, serial, link_config)
}

/// Serials of the peers reachable on the well-known device.
///
/// There is at most one peer on the bus, so the result is empty or has a
/// single entry.
pub fn list() -> Vec<String> {
    list_with_config(&SpiConfig::default(), LinkConfig::default())
}

/// [`list`] with explicit bus settings and protocol timing.
pub fn list_with_config(spi_config: &SpiConfig, link_config: LinkConfig) -> Vec<String> {
    match SpiDevice::open(spi_config) {
        Ok(device) => list_bus(device, link_config),
        Err(err) => {
            debug!(error = %err, "no spi device");
            Vec::new()
        }
    }
}

/// Probe `bus` for a peer and report its serial.
pub fn list_bus<B: SpiBus>(bus: B, link_config: LinkConfig) -> Vec<String> {
    match BusHandle::connect_with_config(bus, "", link_config) {
        Ok(handle) => vec![handle.serial().to_string()],
        Err(err) => {
            debug!(error = %err, "no peer on spi");
            Vec::new()
        }
    }
}
