use serde::Serialize;
use spilink_handle::list_with_config;

use crate::cmd::BusArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct ListOutput<'a> {
    device: String,
    serials: &'a [String],
}

pub fn run(bus: &BusArgs, format: OutputFormat) -> CliResult<i32> {
    let serials = list_with_config(&bus.spi_config(), bus.link_config()?);

    match format {
        OutputFormat::Json => print_json(&ListOutput {
            device: bus.device.display().to_string(),
            serials: &serials,
        }),
        OutputFormat::Table | OutputFormat::Pretty => {
            if serials.is_empty() {
                println!("no peer on {}", bus.device.display());
            }
            for serial in &serials {
                println!("{}  {serial}", bus.device.display());
            }
        }
        OutputFormat::Raw => {
            for serial in &serials {
                println!("{serial}");
            }
        }
    }

    Ok(SUCCESS)
}
