use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::os::fd::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{BusError, Result};
use crate::traits::SpiBus;

/// Well-known device node of the peer.
pub const DEFAULT_DEVICE: &str = "/dev/spidev0.0";

/// Practical maximum clock rate of the host controller (50 MHz).
pub const DEFAULT_SPEED_HZ: u32 = 50_000_000;

// Generic Linux ioctl encoding: dir (2 bits) | size (14 bits) | type | nr.
const IOC_WRITE: u32 = 1;
const SPI_IOC_MAGIC: u32 = b'k' as u32;

const fn iow(nr: u32, size: usize) -> u32 {
    (IOC_WRITE << 30) | ((size as u32) << 16) | (SPI_IOC_MAGIC << 8) | nr
}

const SPI_IOC_WR_MODE: u32 = iow(1, std::mem::size_of::<u8>());
const SPI_IOC_WR_BITS_PER_WORD: u32 = iow(3, std::mem::size_of::<u8>());
const SPI_IOC_WR_MAX_SPEED_HZ: u32 = iow(4, std::mem::size_of::<u32>());
const SPI_IOC_MESSAGE_1: u32 = iow(0, std::mem::size_of::<SpiIocTransfer>());

/// Kernel `struct spi_ioc_transfer`.
#[repr(C)]
#[derive(Debug, Default)]
struct SpiIocTransfer {
    tx_buf: u64,
    rx_buf: u64,
    len: u32,
    speed_hz: u32,
    delay_usecs: u16,
    bits_per_word: u8,
    cs_change: u8,
    tx_nbits: u8,
    rx_nbits: u8,
    word_delay_usecs: u8,
    pad: u8,
}

/// Transfer parameters applied when the device is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiConfig {
    /// Device node to open.
    pub device: PathBuf,
    /// Clock polarity/phase mode. Default: 0.
    pub mode: u8,
    /// Maximum clock rate in Hz. Default: 50 MHz.
    pub speed_hz: u32,
    /// Word size. Default: 8 bits.
    pub bits_per_word: u8,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from(DEFAULT_DEVICE),
            mode: 0,
            speed_hz: DEFAULT_SPEED_HZ,
            bits_per_word: 8,
        }
    }
}

impl SpiConfig {
    /// Default settings on a different device node.
    pub fn with_device(device: impl AsRef<Path>) -> Self {
        Self {
            device: device.as_ref().to_path_buf(),
            ..Self::default()
        }
    }
}

/// Linux spidev character device.
///
/// The descriptor is closed when the value is dropped, on every path,
/// including a failed [`SpiDevice::open`].
pub struct SpiDevice {
    file: File,
    path: PathBuf,
    name: String,
}

impl SpiDevice {
    /// Open the device and apply mode, clock rate and word size.
    pub fn open(config: &SpiConfig) -> Result<Self> {
        let path = config.device.clone();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| BusError::Open {
                path: path.clone(),
                source,
            })?;
        let fd = file.as_raw_fd();

        let configure = |setting: &'static str, source: std::io::Error| BusError::Configure {
            setting,
            path: path.clone(),
            source,
        };

        ioctl_retry(fd, SPI_IOC_WR_MODE, &config.mode).map_err(|e| configure("mode", e))?;
        ioctl_retry(fd, SPI_IOC_WR_MAX_SPEED_HZ, &config.speed_hz)
            .map_err(|e| configure("speed", e))?;
        ioctl_retry(fd, SPI_IOC_WR_BITS_PER_WORD, &config.bits_per_word)
            .map_err(|e| configure("bits per word", e))?;

        info!(
            ?path,
            mode = config.mode,
            speed_hz = config.speed_hz,
            bits_per_word = config.bits_per_word,
            "opened spi device"
        );

        let name = path.display().to_string();
        Ok(Self { file, path, name })
    }

    /// The device node this bus was opened on.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SpiBus for SpiDevice {
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<usize> {
        assert_eq!(tx.len(), rx.len(), "full-duplex transfer needs equal lengths");

        let transfer = SpiIocTransfer {
            tx_buf: tx.as_ptr() as u64,
            rx_buf: rx.as_mut_ptr() as u64,
            len: tx.len() as u32,
            ..SpiIocTransfer::default()
        };
        let clocked = ioctl_retry(self.file.as_raw_fd(), SPI_IOC_MESSAGE_1, &transfer)?;
        Ok(clocked as usize)
    }

    fn lock_exclusive(&self) -> Result<()> {
        flock_retry(self.file.as_raw_fd(), libc::LOCK_EX).map_err(BusError::Lock)
    }

    fn unlock(&self) -> Result<()> {
        flock_retry(self.file.as_raw_fd(), libc::LOCK_UN).map_err(BusError::Lock)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for SpiDevice {
    fn drop(&mut self) {
        debug!(path = ?self.path, "closing spi device");
    }
}

impl std::fmt::Debug for SpiDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpiDevice")
            .field("path", &self.path)
            .field("fd", &self.file.as_raw_fd())
            .finish()
    }
}

/// `ioctl` that restarts on `EINTR`.
fn ioctl_retry<T>(fd: RawFd, request: u32, arg: &T) -> std::io::Result<libc::c_int> {
    loop {
        // SAFETY: `arg` is a live reference to the exact type the request
        // encodes, and `fd` is an open descriptor owned by the caller.
        let rc = unsafe { libc::ioctl(fd, request as _, arg as *const T) };
        if rc >= 0 {
            return Ok(rc);
        }
        let err = std::io::Error::last_os_error();
        if err.kind() != ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// `flock` that restarts on `EINTR`.
fn flock_retry(fd: RawFd, operation: libc::c_int) -> std::io::Result<()> {
    loop {
        // SAFETY: `fd` is an open descriptor owned by the caller.
        let rc = unsafe { libc::flock(fd, operation) };
        if rc == 0 {
            return Ok(());
        }
        let err = std::io::Error::last_os_error();
        if err.kind() != ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(tag: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "spilink-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::write(&path, b"not-a-spi-device").expect("temp file should be writable");
        path
    }

    #[test]
    fn test_ioctl_numbers_match_kernel_headers() {
        assert_eq!(std::mem::size_of::<SpiIocTransfer>(), 32);
        assert_eq!(SPI_IOC_WR_MODE, 0x4001_6b01);
        assert_eq!(SPI_IOC_WR_BITS_PER_WORD, 0x4001_6b03);
        assert_eq!(SPI_IOC_WR_MAX_SPEED_HZ, 0x4004_6b04);
        assert_eq!(SPI_IOC_MESSAGE_1, 0x4020_6b00);
    }

    #[test]
    fn test_default_config() {
        let config = SpiConfig::default();
        assert_eq!(config.device, PathBuf::from("/dev/spidev0.0"));
        assert_eq!(config.mode, 0);
        assert_eq!(config.speed_hz, 50_000_000);
        assert_eq!(config.bits_per_word, 8);
    }

    #[test]
    fn test_open_missing_device() {
        let config = SpiConfig::with_device("/nonexistent/spidev9.9");
        let result = SpiDevice::open(&config);
        assert!(matches!(result, Err(BusError::Open { .. })));
    }

    #[test]
    fn test_open_regular_file_fails_configuration() {
        let path = temp_file("configure");
        let result = SpiDevice::open(&SpiConfig::with_device(&path));
        assert!(matches!(
            result,
            Err(BusError::Configure {
                setting: "mode",
                ..
            })
        ));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_flock_excludes_second_descriptor() {
        let path = temp_file("flock");
        let first = File::open(&path).unwrap();
        let second = File::open(&path).unwrap();

        flock_retry(first.as_raw_fd(), libc::LOCK_EX).unwrap();

        // SAFETY: `second` is an open descriptor for the duration of the call.
        let rc = unsafe { libc::flock(second.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
        assert_eq!(rc, -1, "second descriptor must not acquire a held lock");

        flock_retry(first.as_raw_fd(), libc::LOCK_UN).unwrap();
        flock_retry(second.as_raw_fd(), libc::LOCK_EX).unwrap();
        flock_retry(second.as_raw_fd(), libc::LOCK_UN).unwrap();

        let _ = std::fs::remove_file(&path);
    }
}
