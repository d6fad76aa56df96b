use std::path::PathBuf;
use std::time::Duration;

use cbor_host::image::ByteOrder;
use cbor_host_frame::DEFAULT_MAX_RESPONSE_PAYLOAD;
use cbor_host_rpc::{SessionConfig, TransportProfile};
use cbor_host_transport::Endpoint;
use clap::{Args, Subcommand, ValueEnum};

use crate::exit::{transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod call;
pub mod clear_display;
pub mod display_default;
pub mod display_image;
pub mod header;
pub mod simulate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Test RPC communication without sending image data.
    Test(TestArgs),
    /// Send a raw image to the display.
    DisplayImage(DisplayImageArgs),
    /// Clear the display.
    ClearDisplay(ConnectionArgs),
    /// Show the device's built-in default image.
    DisplayDefault(ConnectionArgs),
    /// Call an arbitrary RPC method.
    Call(CallArgs),
    /// Run a simulated device on a TCP port.
    Simulate(SimulateArgs),
    /// Convert raw RGB565 data into a C array fragment.
    Header(HeaderArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Test(args) => test::run(args, format),
        Command::DisplayImage(args) => display_image::run(args, format),
        Command::ClearDisplay(args) => clear_display::run(args, format),
        Command::DisplayDefault(args) => display_default::run(args, format),
        Command::Call(args) => call::run(args, format),
        Command::Simulate(args) => simulate::run(args),
        Command::Header(args) => header::run(args),
        Command::Version(args) => version::run(args),
    }
}

/// How the device paces replies.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProfileArg {
    /// Device answers synchronously with no flow control; wait before reading.
    Synchronous,
    /// Device buffers input; read immediately.
    FlowControlled,
}

impl From<ProfileArg> for TransportProfile {
    fn from(profile: ProfileArg) -> Self {
        match profile {
            ProfileArg::Synchronous => TransportProfile::SynchronousPeer,
            ProfileArg::FlowControlled => TransportProfile::FlowControlled,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Device endpoint (socket://host:port, serial:///dev/ttyUSB0?baud=115200).
    #[arg(
        long,
        short = 'e',
        env = "CBOR_HOST_ENDPOINT",
        default_value = "socket://localhost:3456"
    )]
    pub endpoint: String,
    /// Response timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
    /// Device pacing profile.
    #[arg(long, value_enum, default_value = "synchronous")]
    pub profile: ProfileArg,
    /// Override the profile's settle delay (e.g. 0ms, 200ms).
    #[arg(long, value_name = "DURATION")]
    pub settle_delay: Option<String>,
    /// Largest accepted response payload in bytes.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_RESPONSE_PAYLOAD)]
    pub max_response: usize,
}

impl ConnectionArgs {
    pub fn endpoint(&self) -> CliResult<Endpoint> {
        self.endpoint
            .parse()
            .map_err(|err| transport_error("bad --endpoint", err))
    }

    pub fn session_config(&self) -> CliResult<SessionConfig> {
        let mut config = SessionConfig::for_profile(self.profile.into());
        config.read_timeout = Some(parse_duration(&self.timeout)?);
        if let Some(delay) = &self.settle_delay {
            let delay = parse_duration_allow_zero(delay)?;
            config.settle_delay = (!delay.is_zero()).then_some(delay);
        }
        if self.max_response == 0 {
            return Err(CliError::new(USAGE, "--max-response must be greater than zero"));
        }
        config.max_response_payload = self.max_response;
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct TestArgs {
    /// Message the device should echo back.
    pub message: String,
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Args, Debug)]
pub struct DisplayImageArgs {
    /// Raw pixel file (RGB565, or RGB888 with --rgb888).
    pub file: PathBuf,
    /// Input holds 3-byte RGB888 pixels to be packed into RGB565.
    #[arg(long)]
    pub rgb888: bool,
    /// Byte order of 16-bit input pixels. Ignored with --rgb888.
    #[arg(long, value_enum, default_value = "little")]
    pub endian: ByteOrder,
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Method name.
    pub method: String,
    /// Parameters as a JSON object.
    #[arg(long, default_value = "{}")]
    pub params: String,
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Address to listen on.
    #[arg(long, short = 'l', default_value = "127.0.0.1:3456")]
    pub listen: String,
    /// Raw RGB565 little-endian image shown by display_default.
    #[arg(long, value_name = "FILE")]
    pub default_image: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct HeaderArgs {
    /// Raw RGB565 input file. Reads stdin when omitted.
    #[arg(long, short = 'i')]
    pub input: Option<PathBuf>,
    /// Output C header file.
    #[arg(long, short = 'o')]
    pub output: PathBuf,
    /// Byte order of the input file.
    #[arg(long, value_enum, default_value = "little")]
    pub endian: ByteOrder,
    /// Number of values per line.
    #[arg(long, default_value_t = 14)]
    pub columns: usize,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse "5s", "500ms" or a bare number of seconds. Zero is rejected.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let duration = parse_duration_allow_zero(input)?;
    if duration.is_zero() {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }
    Ok(duration)
}

fn parse_duration_allow_zero(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
