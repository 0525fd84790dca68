use bytes::{Buf, BufMut};

use crate::error::{FrameError, Result};

/// Leading byte of every header.
pub const SYNC: u8 = 0x5a;
/// Peer accepted the header.
pub const HEADER_ACK: u8 = 0x79;
/// Peer accepted the data, response follows.
pub const DATA_ACK: u8 = 0x85;
/// Peer rejected the current phase.
pub const NACK: u8 = 0x1f;
/// Starting value of the XOR fold.
pub const CHECKSUM_SEED: u8 = 0xab;

/// Byte clocked out while polling for the header ack.
pub const HEADER_ACK_PROBE: u8 = 0x12;
/// Byte clocked out while polling for the data ack.
pub const DATA_ACK_PROBE: u8 = 0xab;

/// Header: sync (1) + endpoint (1) + tx_len (2) + max_rx_len (2) = 6 bytes.
pub const HEADER_SIZE: usize = 6;

/// Scratch buffer capacity on both sides of the bus.
///
/// Lengths carried in a header must stay strictly below this, leaving room
/// for the trailing checksum byte.
pub const BUF_SIZE: usize = 1024;

/// Control packet: request (1) + param1 (2) + param2 (2) + length (2) = 7 bytes.
pub const CONTROL_PACKET_SIZE: usize = 7;

/// XOR-fold `data` over [`CHECKSUM_SEED`].
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(CHECKSUM_SEED, |acc, byte| acc ^ byte)
}

/// True if `unit` (data followed by its checksum byte) folds to zero.
pub fn verify_checksum(unit: &[u8]) -> bool {
    checksum(unit) == 0
}

/// Transfer header sent at the start of every exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Target endpoint on the peer.
    pub endpoint: u8,
    /// Number of payload bytes the host will send.
    pub tx_len: u16,
    /// Largest response the host will accept.
    pub max_rx_len: u16,
}

impl Header {
    /// Create a new header.
    pub fn new(endpoint: u8, tx_len: u16, max_rx_len: u16) -> Self {
        Self {
            endpoint,
            tx_len,
            max_rx_len,
        }
    }

    /// Encode the header into the wire format (without checksum).
    ///
    /// Wire format:
    /// ```text
    /// ┌──────────┬──────────┬───────────┬──────────────┬──────────┐
    /// │ Sync     │ Endpoint │ Tx length │ Max rx len   │ Checksum │
    /// │ 0x5A     │ (1B)     │ (2B LE)   │ (2B LE)      │ (1B)     │
    /// └──────────┴──────────┴───────────┴──────────────┴──────────┘
    /// ```
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u8(SYNC);
        dst.put_u8(self.endpoint);
        dst.put_u16_le(self.tx_len);
        dst.put_u16_le(self.max_rx_len);
    }
}

/// Decode a header and its trailing checksum from the start of `src`.
pub fn decode_header(src: &[u8]) -> Result<Header> {
    let need = HEADER_SIZE + 1;
    if src.len() < need {
        return Err(FrameError::Truncated {
            len: src.len(),
            need,
        });
    }
    if src[0] != SYNC {
        return Err(FrameError::InvalidSync(src[0]));
    }
    if !verify_checksum(&src[..need]) {
        return Err(FrameError::Checksum);
    }

    let mut body = &src[1..HEADER_SIZE];
    Ok(Header {
        endpoint: body.get_u8(),
        tx_len: body.get_u16_le(),
        max_rx_len: body.get_u16_le(),
    })
}

/// Fixed-shape control request carried as the payload of one exchange on
/// the control endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlPacket {
    pub request: u8,
    pub param1: u16,
    pub param2: u16,
    /// Expected response length.
    pub length: u16,
}

impl ControlPacket {
    /// Create a new control packet.
    pub fn new(request: u8, param1: u16, param2: u16, length: u16) -> Self {
        Self {
            request,
            param1,
            param2,
            length,
        }
    }

    /// Packed little-endian wire bytes.
    pub fn to_bytes(&self) -> [u8; CONTROL_PACKET_SIZE] {
        let mut out = [0u8; CONTROL_PACKET_SIZE];
        let mut dst = &mut out[..];
        dst.put_u8(self.request);
        dst.put_u16_le(self.param1);
        dst.put_u16_le(self.param2);
        dst.put_u16_le(self.length);
        out
    }

    /// Parse a packet from its packed wire bytes.
    pub fn from_bytes(src: &[u8]) -> Result<Self> {
        if src.len() < CONTROL_PACKET_SIZE {
            return Err(FrameError::Truncated {
                len: src.len(),
                need: CONTROL_PACKET_SIZE,
            });
        }
        let mut src = src;
        Ok(Self {
            request: src.get_u8(),
            param1: src.get_u16_le(),
            param2: src.get_u16_le(),
            length: src.get_u16_le(),
        })
    }
}
