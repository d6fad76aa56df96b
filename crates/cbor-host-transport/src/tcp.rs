use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::ByteTransport;

const DRAIN_CHUNK_SIZE: usize = 1024;

/// TCP-backed serial emulation.
///
/// Board simulators expose a UART as a raw TCP socket (`socket://host:port`).
/// The stream carries the same bytes a physical serial line would, with no
/// framing of its own.
pub struct TcpSerial {
    stream: TcpStream,
    peer: String,
    read_timeout: Option<Duration>,
}

impl TcpSerial {
    /// Default emulated UART endpoint.
    pub const DEFAULT_ADDR: &'static str = "localhost:3456";

    /// Connect to `addr` (`host:port`).
    ///
    /// With a `connect_timeout`, each resolved address is tried in turn with
    /// that bound; the last failure is reported.
    pub fn connect(addr: &str, connect_timeout: Option<Duration>) -> Result<Self> {
        let connect_err = |source: std::io::Error| TransportError::Connect {
            endpoint: addr.to_string(),
            source,
        };

        let stream = match connect_timeout {
            None => TcpStream::connect(addr).map_err(connect_err)?,
            Some(timeout) => {
                let mut last_err = None;
                let mut connected = None;
                for candidate in addr.to_socket_addrs().map_err(connect_err)? {
                    match TcpStream::connect_timeout(&candidate, timeout) {
                        Ok(stream) => {
                            connected = Some(stream);
                            break;
                        }
                        Err(err) => last_err = Some(err),
                    }
                }
                match connected {
                    Some(stream) => stream,
                    None => {
                        return Err(connect_err(last_err.unwrap_or_else(|| {
                            std::io::Error::new(
                                ErrorKind::AddrNotAvailable,
                                "address resolved to nothing",
                            )
                        })))
                    }
                }
            }
        };

        debug!(addr, "connected to tcp serial endpoint");
        Self::from_stream(stream, addr)
    }

    /// Wrap an already-connected stream.
    pub fn from_stream(stream: TcpStream, peer: impl Into<String>) -> Result<Self> {
        stream.set_nodelay(true)?;
        let read_timeout = stream.read_timeout()?;
        Ok(Self {
            stream,
            peer: peer.into(),
            read_timeout,
        })
    }

    /// The address this transport was opened against.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    fn drain_readable(&mut self) -> std::io::Result<usize> {
        let mut scratch = [0u8; DRAIN_CHUNK_SIZE];
        let mut discarded = 0usize;
        loop {
            match self.stream.read(&mut scratch) {
                // Peer closed; the next write surfaces the disconnection.
                Ok(0) => return Ok(discarded),
                Ok(n) => discarded += n,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(discarded),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }
}

impl Read for TcpSerial {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for TcpSerial {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.stream.flush()
    }
}

impl ByteTransport for TcpSerial {
    fn reset_input_buffer(&mut self) -> Result<()> {
        self.stream.set_nonblocking(true)?;
        let drained = self.drain_readable();
        self.stream.set_nonblocking(false)?;

        let discarded = drained?;
        if discarded > 0 {
            debug!(discarded, peer = %self.peer, "discarded stale input");
        }
        Ok(())
    }

    fn reset_output_buffer(&mut self) -> Result<()> {
        // Writes go straight to the kernel; nothing is held host side.
        Ok(())
    }

    fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.stream.set_read_timeout(timeout)?;
        self.read_timeout = timeout;
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "tcp-serial"
    }
}

impl std::fmt::Debug for TcpSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpSerial")
            .field("peer", &self.peer)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn pair() -> (TcpSerial, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let handle = std::thread::spawn(move || listener.accept().unwrap().0);
        let client = TcpSerial::connect(&addr, Some(Duration::from_secs(2))).unwrap();
        let server = handle.join().unwrap();
        (client, server)
    }

    #[test]
    fn connect_write_read() {
        let (mut client, mut server) = pair();

        client.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");

        server.write_all(b"pong").unwrap();
        client.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"pong");
    }

    #[test]
    fn reset_input_discards_pending_bytes() {
        let (mut client, mut server) = pair();

        server.write_all(b"stale").unwrap();
        std::thread::sleep(Duration::from_millis(50));
        client.reset_input_buffer().unwrap();

        server.write_all(b"fresh").unwrap();
        let mut buf = [0u8; 5];
        client.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"fresh");
    }

    #[test]
    fn reset_on_unused_transport_is_noop() {
        let (mut client, _server) = pair();
        client.reset_input_buffer().unwrap();
        client.reset_output_buffer().unwrap();
        client.reset_input_buffer().unwrap();
        assert_eq!(client.read_timeout(), None);
    }

    #[test]
    fn read_timeout_reports_deadline_error() {
        let (mut client, _server) = pair();
        client
            .set_read_timeout(Some(Duration::from_millis(20)))
            .unwrap();
        assert_eq!(client.read_timeout(), Some(Duration::from_millis(20)));

        let mut buf = [0u8; 1];
        let err = client.read(&mut buf).unwrap_err();
        assert!(crate::is_deadline_error(&err));
    }

    #[test]
    fn connect_refused_reports_endpoint() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = TcpSerial::connect(&addr, Some(Duration::from_millis(200))).unwrap_err();
        match err {
            TransportError::Connect { endpoint, .. } => assert_eq!(endpoint, addr),
            other => panic!("unexpected error: {other}"),
        }
    }
}
