use spilink_bus::SpiBus;
use tracing::{debug, warn};

use crate::config::LinkConfig;
use crate::error::{HandleError, Result, TransferError};
use crate::transfer::{Link, Liveness};

/// Bytes moved per framed exchange in a bulk transfer: fifteen 64-byte
/// wire units.
pub const CHUNK_SIZE: usize = 0x40 * 15;

impl<B: SpiBus> Link<B> {
    /// Send `data` to `endpoint`, one chunk per exchange, in order.
    ///
    /// Returns the number of bytes sent. Any failed chunk aborts the whole
    /// transfer and marks the handle unhealthy.
    pub(crate) fn bulk_write(
        &mut self,
        endpoint: u8,
        data: &[u8],
        config: &LinkConfig,
        liveness: &Liveness,
    ) -> Result<usize> {
        let mut total = 0;
        for (index, chunk) in data.chunks(CHUNK_SIZE).enumerate() {
            self.transfer_retry(endpoint, chunk, &mut [], config, liveness)
                .map_err(|source| bulk_failed(index, source, liveness))?;
            total += chunk.len();
        }
        Ok(total)
    }

    /// Fill `buf` from `endpoint`, one chunk per exchange.
    ///
    /// A chunk shorter than requested ends the stream: the bytes gathered so
    /// far are returned. Any failed chunk aborts the whole transfer and
    /// marks the handle unhealthy.
    pub(crate) fn bulk_read(
        &mut self,
        endpoint: u8,
        buf: &mut [u8],
        config: &LinkConfig,
        liveness: &Liveness,
    ) -> Result<usize> {
        let mut total = 0;
        for (index, chunk) in buf.chunks_mut(CHUNK_SIZE).enumerate() {
            let requested = chunk.len();
            let received = self
                .transfer_retry(endpoint, &[], chunk, config, liveness)
                .map_err(|source| bulk_failed(index, source, liveness))?;
            total += received;
            if received < requested {
                debug!(endpoint, chunk = index, received, requested, "bulk read short chunk");
                break;
            }
        }
        Ok(total)
    }
}

fn bulk_failed(chunk: usize, source: TransferError, liveness: &Liveness) -> HandleError {
    warn!(chunk, error = %source, "SPI: bulk transfer failed");
    liveness.mark_unhealthy();
    HandleError::Bulk { chunk, source }
}
