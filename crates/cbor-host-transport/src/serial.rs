use std::io::{Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::ByteTransport;

/// Serial ports cannot block forever; `None` timeouts map to this bound.
const UNBOUNDED_READ_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// A physical (or pty-backed) serial port.
pub struct SerialDevice {
    port: Box<dyn SerialPort>,
    path: String,
    read_timeout: Option<Duration>,
}

impl SerialDevice {
    /// Open `path` at `baud_rate` with the given read timeout.
    pub fn open(path: &str, baud_rate: u32, read_timeout: Option<Duration>) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .timeout(read_timeout.unwrap_or(UNBOUNDED_READ_TIMEOUT))
            .open()
            .map_err(|err| serial_error(path, err))?;
        debug!(path, baud_rate, "opened serial port");
        Ok(Self {
            port,
            path: path.to_string(),
            read_timeout,
        })
    }

    /// Device path this port was opened from.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn clear(&self, which: ClearBuffer) -> Result<()> {
        self.port
            .clear(which)
            .map_err(|err| serial_error(&self.path, err))
    }
}

fn serial_error(path: &str, err: serialport::Error) -> TransportError {
    TransportError::Serial {
        path: path.to_string(),
        message: err.to_string(),
    }
}

impl Read for SerialDevice {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialDevice {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

impl ByteTransport for SerialDevice {
    fn reset_input_buffer(&mut self) -> Result<()> {
        self.clear(ClearBuffer::Input)
    }

    fn reset_output_buffer(&mut self) -> Result<()> {
        self.clear(ClearBuffer::Output)
    }

    fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.port
            .set_timeout(timeout.unwrap_or(UNBOUNDED_READ_TIMEOUT))
            .map_err(|err| serial_error(&self.path, err))?;
        self.read_timeout = timeout;
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "serial-port"
    }
}

impl std::fmt::Debug for SerialDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialDevice")
            .field("path", &self.path)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}
