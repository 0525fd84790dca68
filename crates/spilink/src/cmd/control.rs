use tracing::debug;

use crate::cmd::{BusArgs, ControlReadArgs, ControlWriteArgs};
use crate::exit::{handle_error, CliResult, SUCCESS};
use crate::output::{print_transfer, OutputFormat};

pub fn run_write(args: ControlWriteArgs, bus: &BusArgs, format: OutputFormat) -> CliResult<i32> {
    let handle = bus.open(&args.serial)?;
    debug!(
        request = args.request,
        param1 = args.param1,
        param2 = args.param2,
        "control write"
    );
    handle
        .control_write(args.request, args.param1, args.param2)
        .map_err(|err| handle_error("control write failed", err))?;

    print_transfer(
        "control-write",
        spilink_frame::CONTROL,
        &[],
        0,
        handle.serial(),
        format,
    );
    Ok(SUCCESS)
}

pub fn run_read(args: ControlReadArgs, bus: &BusArgs, format: OutputFormat) -> CliResult<i32> {
    let handle = bus.open(&args.serial)?;
    let mut buf = vec![0u8; usize::from(args.length)];
    let received = handle
        .control_read(args.request, args.param1, args.param2, &mut buf)
        .map_err(|err| handle_error("control read failed", err))?;
    buf.truncate(received);

    print_transfer(
        "control-read",
        spilink_frame::CONTROL,
        &buf,
        received,
        handle.serial(),
        format,
    );
    Ok(SUCCESS)
}
