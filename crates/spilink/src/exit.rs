use std::fmt;
use std::io;

use spilink_bus::BusError;
use spilink_handle::{HandleError, TransferError};

// Process exit codes.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn bus_error(context: &str, err: BusError) -> CliError {
    match err {
        BusError::Open { ref source, .. } if source.kind() == io::ErrorKind::PermissionDenied => {
            CliError::new(PERMISSION_DENIED, format!("{context}: {err}"))
        }
        BusError::Open { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
        BusError::Io(source) | BusError::Lock(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn transfer_error(context: &str, err: TransferError) -> CliError {
    match err {
        TransferError::Bus { source, .. } => bus_error(context, source),
        TransferError::AckTimeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        TransferError::Checksum
        | TransferError::ResponseTooLarge { .. }
        | TransferError::ResponseOverflow { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        other => CliError::new(FAILURE, format!("{context}: {other}")),
    }
}

pub fn handle_error(context: &str, err: HandleError) -> CliError {
    match err {
        HandleError::Bus(err) => bus_error(context, err),
        HandleError::Identify(err) | HandleError::Transfer(err) => transfer_error(context, err),
        HandleError::Bulk { source, .. } => transfer_error(context, source),
        HandleError::ShortSerial { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        other => CliError::new(FAILURE, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_device_is_failure() {
        let err = BusError::Open {
            path: "/dev/spidev9.9".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(bus_error("open", err).code, FAILURE);
    }

    #[test]
    fn protocol_errors_map_to_stable_codes() {
        let timeout = TransferError::AckTimeout {
            phase: spilink_handle::Phase::HeaderAck,
            waited: std::time::Duration::from_millis(51),
        };
        assert_eq!(transfer_error("x", timeout).code, TIMEOUT);
        assert_eq!(transfer_error("x", TransferError::Checksum).code, DATA_INVALID);
        assert_eq!(
            handle_error(
                "x",
                HandleError::SerialMismatch {
                    expected: "a".into(),
                    found: "b".into()
                }
            )
            .code,
            FAILURE
        );
    }
}
