use serde::Serialize;

use crate::cmd::{BusArgs, ProbeArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct ProbeOutput<'a> {
    device: String,
    serial: &'a str,
    connected: bool,
    healthy: bool,
    ack_timeout_ms: u64,
    max_retries: u32,
}

pub fn run(args: ProbeArgs, bus: &BusArgs, format: OutputFormat) -> CliResult<i32> {
    let handle = bus.open(&args.serial)?;

    let out = ProbeOutput {
        device: bus.device.display().to_string(),
        serial: handle.serial(),
        connected: handle.is_connected(),
        healthy: handle.is_healthy(),
        ack_timeout_ms: u64::try_from(handle.config().ack_timeout.as_millis()).unwrap_or(u64::MAX),
        max_retries: handle.config().max_retries,
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("Peer:");
            println!("  Device:       {}", out.device);
            println!("  Serial:       {}", out.serial);
            println!("  Healthy:      {}", out.healthy);
            println!("  ACK timeout:  {}ms", out.ack_timeout_ms);
            println!("  Retries:      {}", out.max_retries);
        }
        OutputFormat::Raw => println!("{}", out.serial),
    }

    handle.close();
    Ok(SUCCESS)
}
