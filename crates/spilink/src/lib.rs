//! Reliable host-side transport to a microcontroller over SPI.
//!
//! spilink frames short command packets and variable-length replies over a
//! synchronous serial bus that has no framing, flow control or error
//! detection of its own.
//!
//! # Crate Structure
//!
//! - [`bus`]: Bus abstraction and the Linux spidev backend
//! - [`frame`]: Header, checksum and frame buffer layout
//! - [`handle`]: Connection, framed transfers, retries and bulk transfer
//!   (behind `handle` feature)

/// Re-export bus types.
pub mod bus {
    pub use spilink_bus::*;
}

/// Re-export frame types.
pub mod frame {
    pub use spilink_frame::*;
}

/// Re-export handle types (requires `handle` feature).
#[cfg(feature = "handle")]
pub mod handle {
    pub use spilink_handle::*;
}
