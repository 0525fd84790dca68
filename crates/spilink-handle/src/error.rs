use std::fmt;
use std::time::Duration;

use spilink_bus::BusError;

/// Step of a framed exchange, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Header,
    HeaderAck,
    Data,
    DataAck,
    ResponseLength,
    ResponseData,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Header => "header",
            Phase::HeaderAck => "header ack",
            Phase::Data => "data",
            Phase::DataAck => "data ack",
            Phase::ResponseLength => "response length",
            Phase::ResponseData => "response data",
        };
        f.write_str(name)
    }
}

/// Failure of one framed exchange.
///
/// The retry wrapper treats every variant alike.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Low-level bus I/O failed.
    #[error("bus error during {phase}: {source}")]
    Bus {
        phase: Phase,
        #[source]
        source: BusError,
    },

    /// The peer rejected a phase.
    #[error("peer sent NACK during {phase}")]
    Nack { phase: Phase },

    /// No ACK or NACK within the poll timeout.
    #[error("timed out waiting for {phase} after {waited:?}")]
    AckTimeout { phase: Phase, waited: Duration },

    /// The response did not fold to zero.
    #[error("bad response checksum")]
    Checksum,

    /// The declared response length does not fit the receive frame.
    #[error("declared response length {len} does not fit the receive frame")]
    ResponseTooLarge { len: usize },

    /// The response is longer than the caller accepts.
    #[error("response of {len} bytes exceeds requested maximum {max}")]
    ResponseOverflow { len: usize, max: usize },

    /// The handle has been closed.
    #[error("bus handle closed")]
    Closed,
}

/// Errors surfaced by [`crate::BusHandle`] operations.
#[derive(Debug, thiserror::Error)]
pub enum HandleError {
    /// Opening, configuring or locking the bus failed.
    #[error("bus error: {0}")]
    Bus(#[from] BusError),

    /// The identity exchange failed.
    #[error("failed to read peer serial: {0}")]
    Identify(#[source] TransferError),

    /// The identity exchange returned too few bytes.
    #[error("short peer serial ({len} bytes, expected {expected})")]
    ShortSerial { len: usize, expected: usize },

    /// The peer is not the one that was asked for.
    #[error("peer serial {found} does not match requested {expected}")]
    SerialMismatch { expected: String, found: String },

    /// A framed exchange failed after all retries.
    #[error("transfer failed: {0}")]
    Transfer(#[from] TransferError),

    /// A chunk of a bulk transfer failed; the handle is marked unhealthy.
    #[error("bulk transfer failed at chunk {chunk}: {source}")]
    Bulk {
        chunk: usize,
        #[source]
        source: TransferError,
    },
}

impl HandleError {
    /// True for failures of the connection itself rather than of one
    /// exchange: opening or configuring the device, taking its file lock,
    /// or identifying the peer.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            HandleError::Bus(
                BusError::Open { .. } | BusError::Configure { .. } | BusError::Lock(_)
            )
                | HandleError::Identify(_)
                | HandleError::ShortSerial { .. }
                | HandleError::SerialMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, HandleError>;
