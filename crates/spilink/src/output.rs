use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct TransferOutput<'a> {
    operation: &'a str,
    endpoint: u8,
    length: usize,
    data: String,
    serial: &'a str,
}

/// Print the outcome of one read or write.
pub fn print_transfer(
    operation: &str,
    endpoint: u8,
    data: &[u8],
    length: usize,
    serial: &str,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = TransferOutput {
                operation,
                endpoint,
                length,
                data: to_hex(data),
                serial,
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["OPERATION", "ENDPOINT", "LENGTH", "DATA"])
                .add_row(vec![
                    operation.to_string(),
                    endpoint.to_string(),
                    length.to_string(),
                    hex_preview(data),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{operation} endpoint={endpoint} length={length} serial={serial} data={}",
                hex_preview(data)
            );
        }
        OutputFormat::Raw => {
            print_raw(data);
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn to_hex(data: &[u8]) -> String {
    data.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Parse a hex string, ignoring whitespace and an optional `0x` prefix.
pub fn parse_hex(input: &str) -> Option<Vec<u8>> {
    let digits: String = input
        .trim()
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).ok())
        .collect()
}

const PREVIEW_BYTES: usize = 32;

fn hex_preview(data: &[u8]) -> String {
    if data.len() <= PREVIEW_BYTES {
        to_hex(data)
    } else {
        format!(
            "{}… ({} bytes)",
            to_hex(&data[..PREVIEW_BYTES]),
            data.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        assert_eq!(to_hex(&[0x00, 0x5a, 0xff]), "005aff");
        assert_eq!(parse_hex("0x00 5a ff"), Some(vec![0x00, 0x5a, 0xff]));
    }

    #[test]
    fn parse_hex_rejects_odd_or_invalid() {
        assert_eq!(parse_hex("abc"), None);
        assert_eq!(parse_hex("zz"), None);
    }

    #[test]
    fn preview_truncates_long_data() {
        let preview = hex_preview(&[0xab; 100]);
        assert!(preview.ends_with("(100 bytes)"));
    }
}
