use std::time::Duration;

/// How long to poll for a header or data ACK.
pub const ACK_TIMEOUT: Duration = Duration::from_millis(50);

/// Attempts per logical exchange, first try included.
pub const MAX_RETRIES: u32 = 5;

/// Protocol timing for a [`crate::BusHandle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Wall-clock bound on each ACK poll loop. Default: 50 ms.
    pub ack_timeout: Duration,
    /// Attempts per exchange while the handle is connected. Default: 5.
    pub max_retries: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            ack_timeout: ACK_TIMEOUT,
            max_retries: MAX_RETRIES,
        }
    }
}
