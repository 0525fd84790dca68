use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use spilink_bus::SpiBus;
use spilink_frame::{
    Header, RxFrame, TxFrame, BUF_SIZE, DATA_ACK, DATA_ACK_PROBE, HEADER_ACK, HEADER_ACK_PROBE,
    NACK,
};
use tracing::{debug, error, warn};

use crate::config::LinkConfig;
use crate::error::{Phase, TransferError};

/// Handle-wide flags readable without taking the bus lock.
#[derive(Debug)]
pub(crate) struct Liveness {
    connected: AtomicBool,
    healthy: AtomicBool,
}

impl Liveness {
    pub(crate) fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            healthy: AtomicBool::new(true),
        }
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub(crate) fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
    }

    pub(crate) fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    pub(crate) fn mark_unhealthy(&self) {
        self.healthy.store(false, Ordering::Release);
    }
}

/// Bus plus its instance-owned scratch frames.
///
/// `bus` is `None` once the handle has been closed.
pub(crate) struct Link<B> {
    pub(crate) bus: Option<B>,
    tx: TxFrame,
    rx: RxFrame,
}

impl<B: SpiBus> Link<B> {
    pub(crate) fn new(bus: B) -> Self {
        Self {
            bus: Some(bus),
            tx: TxFrame::new(),
            rx: RxFrame::new(),
        }
    }

    /// Run one exchange, retrying while the handle stays connected.
    ///
    /// Returns the last result once `config.max_retries` attempts are used.
    pub(crate) fn transfer_retry(
        &mut self,
        endpoint: u8,
        tx: &[u8],
        rx: &mut [u8],
        config: &LinkConfig,
        liveness: &Liveness,
    ) -> Result<usize, TransferError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.transfer(endpoint, tx, rx, config) {
                Ok(received) => return Ok(received),
                Err(err) if attempt < config.max_retries && liveness.is_connected() => {
                    debug!(endpoint, attempt, error = %err, "retrying spi transfer");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Run one framed exchange: header, header ack, data, data ack,
    /// response length, response data.
    ///
    /// Sends all of `tx` and accepts at most `rx.len()` response bytes.
    /// Returns the number of bytes written to `rx`.
    ///
    /// # Panics
    ///
    /// Panics if either length is not below [`BUF_SIZE`].
    pub(crate) fn transfer(
        &mut self,
        endpoint: u8,
        tx: &[u8],
        rx: &mut [u8],
        config: &LinkConfig,
    ) -> Result<usize, TransferError> {
        assert!(tx.len() < BUF_SIZE, "tx length {} >= {BUF_SIZE}", tx.len());
        assert!(rx.len() < BUF_SIZE, "max rx length {} >= {BUF_SIZE}", rx.len());

        let Link {
            bus,
            tx: tx_frame,
            rx: rx_frame,
        } = self;
        let bus = bus.as_mut().ok_or(TransferError::Closed)?;

        let header = Header::new(endpoint, tx.len() as u16, rx.len() as u16);
        let len = tx_frame.load_header(&header);
        clock(bus, tx_frame.wire(len), rx_frame.scratch_mut(len), Phase::Header)?;

        let ack = AckWait {
            ack: HEADER_ACK,
            probe: HEADER_ACK_PROBE,
            phase: Phase::HeaderAck,
        };
        ack.wait(bus, tx_frame, rx_frame, config)?;

        let len = tx_frame.load_payload(tx);
        clock(bus, tx_frame.wire(len), rx_frame.scratch_mut(len), Phase::Data)?;

        let ack = AckWait {
            ack: DATA_ACK,
            probe: DATA_ACK_PROBE,
            phase: Phase::DataAck,
        };
        ack.wait(bus, tx_frame, rx_frame, config)?;

        let region = rx_frame.length_region_mut();
        let len = region.len();
        clock(bus, tx_frame.wire(len), region, Phase::ResponseLength)?;

        let rx_len = usize::from(rx_frame.declared_len());
        if rx_len >= BUF_SIZE {
            error!(rx_len, "SPI: RX data len larger than buf size");
            return Err(TransferError::ResponseTooLarge { len: rx_len });
        }

        let region = rx_frame.data_region_mut(rx_len);
        let len = region.len();
        clock(bus, tx_frame.wire(len), region, Phase::ResponseData)?;

        if !rx_frame.verify(rx_len) {
            error!(endpoint, rx_len, "SPI: bad checksum");
            return Err(TransferError::Checksum);
        }

        if rx_len > rx.len() {
            error!(rx_len, max = rx.len(), "SPI: response longer than requested");
            return Err(TransferError::ResponseOverflow {
                len: rx_len,
                max: rx.len(),
            });
        }

        rx[..rx_len].copy_from_slice(rx_frame.data(rx_len));
        Ok(rx_len)
    }
}

/// One full-duplex transfer, tagged with the phase it belongs to.
fn clock<B: SpiBus>(
    bus: &mut B,
    tx: &[u8],
    rx: &mut [u8],
    phase: Phase,
) -> Result<(), TransferError> {
    bus.transfer(tx, rx).map(|_| ()).map_err(|source| {
        error!(%phase, error = %source, "SPI: transfer failed");
        TransferError::Bus { phase, source }
    })
}

/// Busy-poll for a single ACK byte.
struct AckWait {
    ack: u8,
    probe: u8,
    phase: Phase,
}

impl AckWait {
    /// Ends on the expected ACK, a NACK, a bus error, or once the timeout
    /// (measured on the monotonic clock) has elapsed.
    fn wait<B: SpiBus>(
        &self,
        bus: &mut B,
        tx_frame: &mut TxFrame,
        rx_frame: &mut RxFrame,
        config: &LinkConfig,
    ) -> Result<(), TransferError> {
        let len = tx_frame.load_probe(self.probe);
        let start = Instant::now();
        loop {
            clock(bus, tx_frame.wire(len), rx_frame.scratch_mut(len), self.phase)?;

            match rx_frame.ack() {
                byte if byte == self.ack => return Ok(()),
                NACK => {
                    warn!(phase = %self.phase, "SPI: got NACK");
                    return Err(TransferError::Nack { phase: self.phase });
                }
                _ => {}
            }

            let waited = start.elapsed();
            if waited > config.ack_timeout {
                debug!(phase = %self.phase, ?waited, "SPI: timed out waiting for ACK");
                return Err(TransferError::AckTimeout {
                    phase: self.phase,
                    waited,
                });
            }
        }
    }
}
