mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "cbor-host",
    version,
    about = "CBOR Host - Communication tools for Device LCD display"
)]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_test_subcommand() {
        let cli = Cli::try_parse_from([
            "cbor-host",
            "test",
            "hello",
            "--endpoint",
            "socket://127.0.0.1:3456",
            "--timeout",
            "2s",
        ])
        .expect("test args should parse");

        match cli.command {
            Command::Test(args) => {
                assert_eq!(args.message, "hello");
                assert_eq!(args.connection.timeout, "2s");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_requires_message() {
        let err = Cli::try_parse_from(["cbor-host", "test"]).expect_err("message is required");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_display_image_options() {
        let cli = Cli::try_parse_from([
            "cbor-host",
            "display-image",
            "frame.raw",
            "--rgb888",
            "--profile",
            "flow-controlled",
        ])
        .expect("display-image args should parse");
        assert!(matches!(cli.command, Command::DisplayImage(ref args) if args.rgb888));
    }

    #[test]
    fn header_requires_output() {
        let err = Cli::try_parse_from(["cbor-host", "header", "--input", "in.raw"])
            .expect_err("--output is required");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["cbor-host", "clear-display", "--format", "json"])
            .expect("global flags should parse anywhere");
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        assert!(matches!(cli.command, Command::ClearDisplay(_)));
    }
}
