use bytes::Buf;

use crate::codec::{checksum, verify_checksum, Header, BUF_SIZE, HEADER_SIZE};

/// Offset of the ack byte left over from the last poll.
pub const ACK_OFFSET: usize = 0;
/// Offset of the 2-byte little-endian response length.
pub const LENGTH_OFFSET: usize = 1;
/// Offset of the response data.
pub const DATA_OFFSET: usize = 3;
/// Bytes of a response frame around its data: ack (1) + length (2) + checksum (1).
pub const RESPONSE_OVERHEAD: usize = 4;

const LENGTH_SIZE: usize = DATA_OFFSET - LENGTH_OFFSET;

/// Transmit scratch buffer.
///
/// Each `load_*` call stages one unit at the start of the buffer, appends
/// its checksum where the unit has one, and returns the number of bytes to
/// clock out.
pub struct TxFrame {
    buf: Box<[u8; BUF_SIZE]>,
}

impl TxFrame {
    pub fn new() -> Self {
        Self {
            buf: Box::new([0u8; BUF_SIZE]),
        }
    }

    /// Stage a header followed by its checksum.
    pub fn load_header(&mut self, header: &Header) -> usize {
        header.encode(&mut &mut self.buf[..HEADER_SIZE]);
        self.seal(HEADER_SIZE)
    }

    /// Stage the single byte clocked out while polling for an ack.
    pub fn load_probe(&mut self, probe: u8) -> usize {
        self.buf[0] = probe;
        1
    }

    /// Stage a request payload followed by its checksum.
    ///
    /// # Panics
    ///
    /// Panics if the payload leaves no room for the checksum byte.
    pub fn load_payload(&mut self, payload: &[u8]) -> usize {
        assert!(
            payload.len() < BUF_SIZE,
            "payload of {} bytes does not fit the {BUF_SIZE}-byte frame",
            payload.len()
        );
        self.buf[..payload.len()].copy_from_slice(payload);
        self.seal(payload.len())
    }

    /// The first `len` staged bytes.
    pub fn wire(&self, len: usize) -> &[u8] {
        &self.buf[..len]
    }

    fn seal(&mut self, len: usize) -> usize {
        self.buf[len] = checksum(&self.buf[..len]);
        len + 1
    }
}

impl Default for TxFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// Receive scratch buffer.
///
/// Laid out as the peer checksums its response:
/// ```text
/// ┌──────────┬───────────┬──────────────────┬──────────┐
/// │ Ack (1B) │ Length    │ Data             │ Checksum │
/// │ 0x85     │ (2B LE)   │ (Length bytes)   │ (1B)     │
/// └──────────┴───────────┴──────────────────┴──────────┘
/// ```
/// The ack byte is whatever the last poll left at [`ACK_OFFSET`] and is part
/// of the verified region.
pub struct RxFrame {
    buf: Box<[u8; DATA_OFFSET + BUF_SIZE]>,
}

impl RxFrame {
    pub fn new() -> Self {
        Self {
            buf: Box::new([0u8; DATA_OFFSET + BUF_SIZE]),
        }
    }

    /// Region filled by transfers whose reply carries no response bytes
    /// (header, data, ack polls). Starts at the buffer origin.
    pub fn scratch_mut(&mut self, len: usize) -> &mut [u8] {
        &mut self.buf[..len]
    }

    /// Byte returned by the last single-byte poll.
    pub fn ack(&self) -> u8 {
        self.buf[ACK_OFFSET]
    }

    /// Region receiving the response length.
    pub fn length_region_mut(&mut self) -> &mut [u8] {
        &mut self.buf[LENGTH_OFFSET..DATA_OFFSET]
    }

    /// Response length declared by the peer.
    pub fn declared_len(&self) -> u16 {
        let mut region = &self.buf[LENGTH_OFFSET..LENGTH_OFFSET + LENGTH_SIZE];
        region.get_u16_le()
    }

    /// Region receiving `data_len` response bytes plus their checksum.
    ///
    /// # Panics
    ///
    /// Panics if `data_len` is not below [`BUF_SIZE`].
    pub fn data_region_mut(&mut self, data_len: usize) -> &mut [u8] {
        assert!(data_len < BUF_SIZE, "response of {data_len} bytes overflows frame");
        &mut self.buf[DATA_OFFSET..DATA_OFFSET + data_len + 1]
    }

    /// True if ack, length, data and checksum fold to zero.
    pub fn verify(&self, data_len: usize) -> bool {
        verify_checksum(&self.buf[..data_len + RESPONSE_OVERHEAD])
    }

    /// The verified response data.
    pub fn data(&self, data_len: usize) -> &[u8] {
        &self.buf[DATA_OFFSET..DATA_OFFSET + data_len]
    }
}

impl Default for RxFrame {
    fn default() -> Self {
        Self::new()
    }
}
