use std::path::PathBuf;

/// Errors that can occur in bus operations.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// Failed to open the bus device.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to apply a transfer setting to the opened device.
    #[error("failed to set SPI {setting} on {path}: {source}")]
    Configure {
        setting: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    /// A transfer on the bus failed.
    #[error("bus I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Acquiring or releasing the cross-process lock failed.
    #[error("bus lock error: {0}")]
    Lock(std::io::Error),
}

pub type Result<T> = std::result::Result<T, BusError>;
