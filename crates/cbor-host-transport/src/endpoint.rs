use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, TransportError};
use crate::tcp::TcpSerial;
use crate::traits::ByteTransport;

/// Default baud rate for serial endpoints.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Where a device can be reached.
///
/// Accepted forms:
/// - `socket://host:port`, `tcp://host:port`, `host:port`: TCP serial emulation
/// - `serial:///dev/ttyUSB0`, `serial:///dev/ttyUSB0?baud=9600`, `/dev/ttyUSB0`,
///   `COM3`: serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp(String),
    Serial { path: String, baud_rate: u32 },
}

impl Endpoint {
    /// Open a transport for this endpoint with `timeout` as read (and connect) timeout.
    pub fn open(&self, timeout: Option<Duration>) -> Result<Box<dyn ByteTransport + Send>> {
        match self {
            Endpoint::Tcp(addr) => {
                let mut transport = TcpSerial::connect(addr, timeout)?;
                transport.set_read_timeout(timeout)?;
                Ok(Box::new(transport))
            }
            #[cfg(feature = "serial")]
            Endpoint::Serial { path, baud_rate } => Ok(Box::new(crate::serial::SerialDevice::open(
                path, *baud_rate, timeout,
            )?)),
            #[cfg(not(feature = "serial"))]
            Endpoint::Serial { .. } => Err(TransportError::Unsupported(
                "serial ports require the `serial` feature",
            )),
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Tcp(TcpSerial::DEFAULT_ADDR.to_string())
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(TransportError::InvalidEndpoint(
                "endpoint must not be empty".to_string(),
            ));
        }

        if let Some(addr) = input
            .strip_prefix("socket://")
            .or_else(|| input.strip_prefix("tcp://"))
        {
            return parse_tcp(addr);
        }

        if let Some(rest) = input.strip_prefix("serial://") {
            return parse_serial(rest);
        }

        if let Some((scheme, _)) = input.split_once("://") {
            return Err(TransportError::InvalidEndpoint(format!(
                "unknown scheme '{scheme}'"
            )));
        }

        if input.starts_with('/') || is_com_port(input) {
            return parse_serial(input);
        }

        parse_tcp(input)
    }
}

fn is_com_port(input: &str) -> bool {
    match (input.get(..3), input.get(3..)) {
        (Some(prefix), Some(number)) => {
            prefix.eq_ignore_ascii_case("com")
                && !number.is_empty()
                && number.bytes().all(|b| b.is_ascii_digit())
        }
        _ => false,
    }
}

fn parse_tcp(addr: &str) -> Result<Endpoint> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| TransportError::InvalidEndpoint(format!("missing port in '{addr}'")))?;
    if host.is_empty() {
        return Err(TransportError::InvalidEndpoint(format!(
            "missing host in '{addr}'"
        )));
    }
    port.parse::<u16>()
        .map_err(|_| TransportError::InvalidEndpoint(format!("invalid port '{port}'")))?;
    Ok(Endpoint::Tcp(addr.to_string()))
}

fn parse_serial(input: &str) -> Result<Endpoint> {
    let (path, query) = match input.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (input, None),
    };
    if path.is_empty() {
        return Err(TransportError::InvalidEndpoint(
            "serial endpoint is missing a device path".to_string(),
        ));
    }

    let mut baud_rate = DEFAULT_BAUD_RATE;
    if let Some(query) = query {
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            match pair.split_once('=') {
                Some(("baud", value)) => {
                    baud_rate = value.parse().map_err(|_| {
                        TransportError::InvalidEndpoint(format!("invalid baud rate '{value}'"))
                    })?;
                }
                _ => {
                    return Err(TransportError::InvalidEndpoint(format!(
                        "unknown serial option '{pair}'"
                    )))
                }
            }
        }
    }

    Ok(Endpoint::Serial {
        path: path.to_string(),
        baud_rate,
    })
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "socket://{addr}"),
            Endpoint::Serial { path, baud_rate } if *baud_rate == DEFAULT_BAUD_RATE => {
                write!(f, "serial://{path}")
            }
            Endpoint::Serial { path, baud_rate } => write!(f, "serial://{path}?baud={baud_rate}"),
        }
    }
}
