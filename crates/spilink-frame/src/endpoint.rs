//! Well-known endpoints and request codes.
//!
//! Endpoint 0 carries control packets. Other endpoints are bulk pipes whose
//! meaning belongs to the peer firmware.

/// Control endpoint.
pub const CONTROL: u8 = 0;

/// Control request returning the peer's unique hardware identifier.
pub const REQUEST_GET_SERIAL: u8 = 0xc3;

/// Length of the unique hardware identifier in bytes.
pub const SERIAL_LEN: usize = 12;
