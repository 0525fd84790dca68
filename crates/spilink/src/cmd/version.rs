use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("spilink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: spilink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("SPILINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "features: handle={}, cli=true",
        cfg!(feature = "handle")
    );
    println!(
        "protocol: buf_size={}, chunk_size={}, ack_timeout={}ms, retries={}",
        spilink_frame::BUF_SIZE,
        spilink_handle::CHUNK_SIZE,
        spilink_handle::ACK_TIMEOUT.as_millis(),
        spilink_handle::MAX_RETRIES
    );

    Ok(SUCCESS)
}
