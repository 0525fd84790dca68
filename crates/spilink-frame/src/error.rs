/// Errors that can occur while decoding frames.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameError {
    /// The header does not start with the sync byte.
    #[error("invalid sync byte 0x{0:02x} (expected 0x5a)")]
    InvalidSync(u8),

    /// The unit does not fold to zero with its trailing checksum.
    #[error("bad checksum")]
    Checksum,

    /// Fewer bytes than the unit needs.
    #[error("truncated frame ({len} bytes, need {need})")]
    Truncated { len: usize, need: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
