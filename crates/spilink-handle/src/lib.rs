//! Host side of the spilink bus protocol.
//!
//! A [`BusHandle`] identifies the peer once, then runs checksummed
//! request/response exchanges over the bus:
//! - control requests on endpoint 0 ([`BusHandle::control_read`],
//!   [`BusHandle::control_write`])
//! - chunked bulk transfers on other endpoints ([`BusHandle::bulk_read`],
//!   [`BusHandle::bulk_write`])
//!
//! Every exchange is retried a bounded number of times, and all bus access
//! is serialized across threads and processes.

pub mod bulk;
pub mod config;
#[cfg(target_os = "linux")]
pub mod connector;
pub mod error;
pub mod handle;
pub mod lock;
mod transfer;

#[cfg(test)]
mod sim;

pub use bulk::CHUNK_SIZE;
pub use config::{LinkConfig, ACK_TIMEOUT, MAX_RETRIES};
#[cfg(target_os = "linux")]
pub use connector::{list, list_bus, list_with_config, open, open_with_config, SpiHandle};
pub use error::{HandleError, Phase, Result, TransferError};
pub use handle::{hex_serial, BusHandle};
pub use lock::BusGuard;
