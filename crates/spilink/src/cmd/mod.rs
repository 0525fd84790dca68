use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use spilink_bus::{SpiConfig, DEFAULT_DEVICE, DEFAULT_SPEED_HZ};
use spilink_handle::{open_with_config, LinkConfig, SpiHandle};

use crate::exit::{handle_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod bulk;
pub mod control;
pub mod doctor;
pub mod list;
pub mod probe;
pub mod version;

/// Largest response a single control read can carry.
const MAX_CONTROL_READ: i64 = spilink_frame::BUF_SIZE as i64 - 1;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the serial of the peer on the bus, if any.
    List,
    /// Connect to the peer and print its serial.
    Probe(ProbeArgs),
    /// Send a control request without response data.
    ControlWrite(ControlWriteArgs),
    /// Send a control request and print the response.
    ControlRead(ControlReadArgs),
    /// Write data to a bulk endpoint.
    BulkWrite(BulkWriteArgs),
    /// Read data from a bulk endpoint.
    BulkRead(BulkReadArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Check that the device is usable from this process.
    Doctor,
}

pub fn run(command: Command, bus: &BusArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::List => list::run(bus, format),
        Command::Probe(args) => probe::run(args, bus, format),
        Command::ControlWrite(args) => control::run_write(args, bus, format),
        Command::ControlRead(args) => control::run_read(args, bus, format),
        Command::BulkWrite(args) => bulk::run_write(args, bus, format),
        Command::BulkRead(args) => bulk::run_read(args, bus, format),
        Command::Version(args) => version::run(args),
        Command::Doctor => doctor::run(bus, format),
    }
}

/// Bus selection and protocol timing shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct BusArgs {
    /// spidev device node.
    #[arg(
        long,
        env = "SPILINK_DEVICE",
        default_value = DEFAULT_DEVICE,
        global = true
    )]
    pub device: PathBuf,
    /// Bus clock in Hz.
    #[arg(long, env = "SPILINK_SPEED_HZ", default_value_t = DEFAULT_SPEED_HZ, global = true)]
    pub speed: u32,
    /// How long to poll for each ACK (e.g. 50ms, 1s).
    #[arg(long, default_value = "50ms", global = true)]
    pub ack_timeout: String,
    /// Attempts per exchange, first try included.
    #[arg(long, default_value_t = spilink_handle::MAX_RETRIES, global = true)]
    pub retries: u32,
}

impl BusArgs {
    pub fn spi_config(&self) -> SpiConfig {
        SpiConfig {
            speed_hz: self.speed,
            ..SpiConfig::with_device(&self.device)
        }
    }

    pub fn link_config(&self) -> CliResult<LinkConfig> {
        if self.retries == 0 {
            return Err(CliError::new(USAGE, "retries must be greater than zero"));
        }
        Ok(LinkConfig {
            ack_timeout: parse_timeout(&self.ack_timeout)?,
            max_retries: self.retries,
        })
    }

    /// Open the device and connect to the peer whose serial is `serial`
    /// (any peer when empty).
    pub fn open(&self, serial: &str) -> CliResult<SpiHandle> {
        let link_config = self.link_config()?;
        open_with_config(serial, &self.spi_config(), link_config)
            .map_err(|err| handle_error("connect failed", err))
    }
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Require this serial (lowercase hex).
    #[arg(long, default_value = "")]
    pub serial: String,
}

#[derive(Args, Debug)]
pub struct ControlWriteArgs {
    /// Request code.
    #[arg(long, value_parser = parse_u8)]
    pub request: u8,
    #[arg(long, default_value = "0", value_parser = parse_u16)]
    pub param1: u16,
    #[arg(long, default_value = "0", value_parser = parse_u16)]
    pub param2: u16,
    /// Require this serial (lowercase hex).
    #[arg(long, default_value = "")]
    pub serial: String,
}

#[derive(Args, Debug)]
pub struct ControlReadArgs {
    /// Request code.
    #[arg(long, value_parser = parse_u8)]
    pub request: u8,
    #[arg(long, default_value = "0", value_parser = parse_u16)]
    pub param1: u16,
    #[arg(long, default_value = "0", value_parser = parse_u16)]
    pub param2: u16,
    /// Maximum response length in bytes.
    #[arg(long, value_parser = clap::value_parser!(u16).range(0..=MAX_CONTROL_READ))]
    pub length: u16,
    /// Require this serial (lowercase hex).
    #[arg(long, default_value = "")]
    pub serial: String,
}

#[derive(Args, Debug)]
pub struct BulkWriteArgs {
    /// Bulk endpoint number.
    #[arg(long, short = 'e', value_parser = parse_u8)]
    pub endpoint: u8,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Hex payload (e.g. "0a0b0c").
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex"])]
    pub file: Option<PathBuf>,
    /// Require this serial (lowercase hex).
    #[arg(long, default_value = "")]
    pub serial: String,
}

#[derive(Args, Debug)]
pub struct BulkReadArgs {
    /// Bulk endpoint number.
    #[arg(long, short = 'e', value_parser = parse_u8)]
    pub endpoint: u8,
    /// Number of bytes to read.
    #[arg(long, value_parser = clap::value_parser!(u16))]
    pub length: u16,
    /// Require this serial (lowercase hex).
    #[arg(long, default_value = "")]
    pub serial: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_u8(input: &str) -> Result<u8, String> {
    parse_int(input).and_then(|v| u8::try_from(v).map_err(|_| format!("{input} exceeds 0xff")))
}

fn parse_u16(input: &str) -> Result<u16, String> {
    parse_int(input).and_then(|v| u16::try_from(v).map_err(|_| format!("{input} exceeds 0xffff")))
}

/// Decimal or `0x`-prefixed hex.
fn parse_int(input: &str) -> Result<u32, String> {
    let input = input.trim();
    let parsed = match input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| format!("invalid number: {input}"))
}

pub(crate) fn parse_timeout(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "ms")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
