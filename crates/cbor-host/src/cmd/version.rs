use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("cbor-host {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: cbor-host");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("CBOR_HOST_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("features: serial={}, cli=true", cfg!(feature = "serial"));
    println!(
        "device: {}x{} rgb565, rx buffer {} bytes",
        cbor_host_rpc::IMAGE_WIDTH,
        cbor_host_rpc::IMAGE_HEIGHT,
        cbor_host_rpc::DEVICE_RX_BUFFER_SIZE
    );

    Ok(SUCCESS)
}
