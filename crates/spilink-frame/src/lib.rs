//! Checksummed framing for the spilink bus protocol.
//!
//! Every exchange on the bus is made of small units, each followed by a
//! one-byte XOR checksum seeded with [`CHECKSUM_SEED`]:
//! - a 6-byte header (sync, endpoint, tx length, max rx length)
//! - the request payload
//! - the response (ack byte, 2-byte length, data)
//!
//! This crate only builds and checks bytes. It never touches the bus.

pub mod buffer;
pub mod codec;
pub mod endpoint;
pub mod error;

pub use buffer::{RxFrame, TxFrame, DATA_OFFSET, LENGTH_OFFSET, RESPONSE_OVERHEAD};
pub use codec::{
    checksum, decode_header, verify_checksum, ControlPacket, Header, BUF_SIZE, CHECKSUM_SEED,
    CONTROL_PACKET_SIZE, DATA_ACK, DATA_ACK_PROBE, HEADER_ACK, HEADER_ACK_PROBE, HEADER_SIZE,
    NACK, SYNC,
};
pub use endpoint::{CONTROL, REQUEST_GET_SERIAL, SERIAL_LEN};
pub use error::{FrameError, Result};
