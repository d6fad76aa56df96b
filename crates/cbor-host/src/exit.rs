use std::fmt;
use std::io;

use cbor_host::image::ImageError;
use cbor_host_rpc::SessionError;
use cbor_host_transport::TransportError;

pub const SUCCESS: i32 = 0;
/// The device answered with a non-success status.
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => USAGE,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof
        | io::ErrorKind::WriteZero
        | io::ErrorKind::AddrNotAvailable
        | io::ErrorKind::AddrInUse => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Connect { endpoint, source } => {
            io_error(&format!("{context} ({endpoint})"), source)
        }
        TransportError::Io(source) => io_error(context, source),
        TransportError::InvalidEndpoint(_) | TransportError::Unsupported(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        TransportError::Serial { .. } => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Protocol(err) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        SessionError::Timeout => CliError::new(TIMEOUT, format!("{context}: {err}")),
        SessionError::Transport(err) => transport_error(context, err),
    }
}

pub fn image_error(context: &str, err: ImageError) -> CliError {
    match err {
        ImageError::ZeroColumns => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use cbor_host_rpc::ProtocolError;

    use super::*;

    #[test]
    fn session_errors_map_to_exit_codes() {
        assert_eq!(session_error("x", SessionError::Timeout).code, TIMEOUT);
        assert_eq!(
            session_error(
                "x",
                SessionError::Protocol(ProtocolError::ShortHeader { received: 1 })
            )
            .code,
            DATA_INVALID
        );
        assert_eq!(
            session_error(
                "x",
                SessionError::Transport(TransportError::Io(io::Error::from(
                    io::ErrorKind::ConnectionRefused
                )))
            )
            .code,
            TRANSPORT_ERROR
        );
    }

    #[test]
    fn connect_timeout_is_timeout() {
        let err = TransportError::Connect {
            endpoint: "localhost:3456".to_string(),
            source: io::Error::from(io::ErrorKind::TimedOut),
        };
        let cli = transport_error("connect failed", err);
        assert_eq!(cli.code, TIMEOUT);
        assert!(cli.message.contains("localhost:3456"));
    }

    #[test]
    fn bad_endpoint_is_usage() {
        let err = TransportError::InvalidEndpoint("missing port".to_string());
        assert_eq!(transport_error("x", err).code, USAGE);
    }
}
