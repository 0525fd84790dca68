#[cfg(not(target_os = "linux"))]
compile_error!("the spilink CLI drives Linux spidev devices and only builds on Linux");

mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::{BusArgs, Command};
use crate::logging::{init_logging, LogFormat, LogLevel, LogTimestamps};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "spilink", version, about = "Talk to a microcontroller over SPI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Timestamp on log lines.
    #[arg(long, value_name = "KIND", default_value = "wall", global = true)]
    log_timestamps: LogTimestamps,

    #[command(flatten)]
    bus: BusArgs,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level, cli.log_timestamps);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, &cli.bus, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
