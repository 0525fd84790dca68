use parking_lot::ReentrantMutex;
use spilink_bus::SpiBus;
use spilink_frame::{ControlPacket, CONTROL, REQUEST_GET_SERIAL, SERIAL_LEN};
use tracing::{debug, info};

use crate::config::LinkConfig;
use crate::error::{HandleError, Result};
use crate::lock::{BusGuard, Shared};
use crate::transfer::{Link, Liveness};

/// A live session with the peer.
///
/// Owns the bus, its scratch frames, the cached peer serial and the
/// liveness/health flags. All bus operations are serialized through a
/// reentrant lock combined with the bus's cooperative file lock, so a
/// handle can be shared between threads (`Arc<BusHandle<_>>`) and a
/// thread may nest operations inside [`BusHandle::lock`].
///
/// Dropping the handle closes the bus.
pub struct BusHandle<B: SpiBus> {
    shared: ReentrantMutex<Shared<B>>,
    serial: String,
    liveness: Liveness,
    config: LinkConfig,
}

impl<B: SpiBus> BusHandle<B> {
    /// Identify the peer on `bus` and accept it if its serial matches
    /// `expected_serial` (empty accepts any peer).
    pub fn connect(bus: B, expected_serial: &str) -> Result<Self> {
        Self::connect_with_config(bus, expected_serial, LinkConfig::default())
    }

    /// Connect with explicit protocol timing.
    ///
    /// On failure the bus is dropped before returning, whichever step failed.
    pub fn connect_with_config(bus: B, expected_serial: &str, config: LinkConfig) -> Result<Self> {
        let name = bus.name().to_string();
        let mut handle = Self {
            shared: Shared::new(Link::new(bus)),
            serial: String::new(),
            liveness: Liveness::new(),
            config,
        };

        let mut uid = [0u8; SERIAL_LEN];
        let len = handle
            .control_read(REQUEST_GET_SERIAL, 0, 0, &mut uid)
            .map_err(|err| match err {
                HandleError::Transfer(source) => HandleError::Identify(source),
                other => other,
            })?;
        if len != SERIAL_LEN {
            debug!(len, "failed to get serial");
            return Err(HandleError::ShortSerial {
                len,
                expected: SERIAL_LEN,
            });
        }

        let serial = hex_serial(&uid);
        if !expected_serial.is_empty() && expected_serial != serial {
            debug!(expected = expected_serial, found = %serial, "serial mismatch");
            return Err(HandleError::SerialMismatch {
                expected: expected_serial.to_string(),
                found: serial,
            });
        }

        info!(bus = %name, %serial, "connected to peer");
        handle.serial = serial;
        Ok(handle)
    }

    /// Send a control request with no response data.
    pub fn control_write(&self, request: u8, param1: u16, param2: u16) -> Result<usize> {
        let guard = self.lock()?;
        let packet = ControlPacket::new(request, param1, param2, 0);
        let sent = guard.link().transfer_retry(
            CONTROL,
            &packet.to_bytes(),
            &mut [],
            &self.config,
            &self.liveness,
        )?;
        Ok(sent)
    }

    /// Send a control request and read up to `buf.len()` response bytes.
    ///
    /// Returns the number of bytes written to `buf`.
    ///
    /// # Panics
    ///
    /// Panics if `buf` is not shorter than the frame buffer.
    pub fn control_read(
        &self,
        request: u8,
        param1: u16,
        param2: u16,
        buf: &mut [u8],
    ) -> Result<usize> {
        let guard = self.lock()?;
        let length = u16::try_from(buf.len()).unwrap_or(u16::MAX);
        let packet = ControlPacket::new(request, param1, param2, length);
        let received = guard.link().transfer_retry(
            CONTROL,
            &packet.to_bytes(),
            buf,
            &self.config,
            &self.liveness,
        )?;
        Ok(received)
    }

    /// Send `data` to a bulk endpoint in chunks. Returns the bytes sent.
    pub fn bulk_write(&self, endpoint: u8, data: &[u8]) -> Result<usize> {
        let guard = self.lock()?;
        let mut link = guard.link();
        link.bulk_write(endpoint, data, &self.config, &self.liveness)
    }

    /// Read from a bulk endpoint into `buf` in chunks, stopping at the
    /// first short chunk. Returns the bytes received.
    pub fn bulk_read(&self, endpoint: u8, buf: &mut [u8]) -> Result<usize> {
        let guard = self.lock()?;
        let mut link = guard.link();
        link.bulk_read(endpoint, buf, &self.config, &self.liveness)
    }

    /// Take exclusive access to the bus for a group of operations.
    ///
    /// Operations called on this thread while the guard is alive re-enter
    /// it; other threads and processes block until it is dropped.
    pub fn lock(&self) -> Result<BusGuard<'_, B>> {
        Ok(BusGuard::acquire(&self.shared)?)
    }

    /// Release the bus. Later operations fail with
    /// [`crate::TransferError::Closed`] and are not retried.
    pub fn close(&self) {
        self.liveness.disconnect();
        let shared = self.shared.lock();
        if shared.take_bus().is_some() {
            debug!(serial = %self.serial, "closed bus handle");
        }
    }

    /// Lowercase hex serial of the connected peer.
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// False once the handle has been closed.
    pub fn is_connected(&self) -> bool {
        self.liveness.is_connected()
    }

    /// False once a bulk transfer has failed on this handle.
    pub fn is_healthy(&self) -> bool {
        self.liveness.is_healthy()
    }

    /// Protocol timing in use.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }
}

impl<B: SpiBus> std::fmt::Debug for BusHandle<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusHandle")
            .field("serial", &self.serial)
            .field("connected", &self.is_connected())
            .field("healthy", &self.is_healthy())
            .finish()
    }
}

/// Render an identifier as lowercase hex.
pub fn hex_serial(uid: &[u8]) -> String {
    uid.iter().map(|byte| format!("{byte:02x}")).collect()
}
