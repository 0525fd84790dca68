use crate::cmd::{BulkReadArgs, BulkWriteArgs, BusArgs};
use crate::exit::{handle_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{parse_hex, print_transfer, OutputFormat};

pub fn run_write(args: BulkWriteArgs, bus: &BusArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = payload(&args)?;
    let handle = bus.open(&args.serial)?;
    let sent = handle
        .bulk_write(args.endpoint, &payload)
        .map_err(|err| handle_error("bulk write failed", err))?;

    print_transfer("bulk-write", args.endpoint, &[], sent, handle.serial(), format);
    Ok(SUCCESS)
}

pub fn run_read(args: BulkReadArgs, bus: &BusArgs, format: OutputFormat) -> CliResult<i32> {
    let handle = bus.open(&args.serial)?;
    let mut buf = vec![0u8; usize::from(args.length)];
    let received = handle
        .bulk_read(args.endpoint, &mut buf)
        .map_err(|err| handle_error("bulk read failed", err))?;
    buf.truncate(received);

    print_transfer("bulk-read", args.endpoint, &buf, received, handle.serial(), format);
    Ok(SUCCESS)
}

fn payload(args: &BulkWriteArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(hex) = &args.hex {
        return parse_hex(hex).ok_or_else(|| CliError::new(USAGE, format!("invalid hex payload: {hex}")));
    }
    if let Some(path) = &args.file {
        return std::fs::read(path)
            .map_err(|err| io_error(&format!("failed to read {}", path.display()), err));
    }
    Err(CliError::new(USAGE, "one of --data, --hex or --file is required"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> BulkWriteArgs {
        BulkWriteArgs {
            endpoint: 2,
            data: None,
            hex: None,
            file: None,
            serial: String::new(),
        }
    }

    #[test]
    fn payload_from_hex() {
        let args = BulkWriteArgs {
            hex: Some("5a01ff".to_string()),
            ..args()
        };
        assert_eq!(payload(&args).unwrap(), vec![0x5a, 0x01, 0xff]);
    }

    #[test]
    fn payload_requires_a_source() {
        assert_eq!(payload(&args()).unwrap_err().code, USAGE);
    }

    #[test]
    fn payload_rejects_bad_hex() {
        let args = BulkWriteArgs {
            hex: Some("xyz".to_string()),
            ..args()
        };
        assert_eq!(payload(&args).unwrap_err().code, USAGE);
    }
}
