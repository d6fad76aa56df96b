use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use cbor_host_transport::{is_deadline_error, Result, TransportError};
use tracing::{debug, info, warn};

use crate::device::SimulatedDevice;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const READ_CHUNK: usize = 4096;

/// Serves a [`SimulatedDevice`] over TCP, one client at a time.
///
/// The byte stream is handed to the device exactly as received, so clients
/// see the same framing behavior as on a serial line.
pub struct DeviceServer {
    listener: TcpListener,
    device: SimulatedDevice,
}

impl DeviceServer {
    pub fn bind(addr: impl ToSocketAddrs, device: SimulatedDevice) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self { listener, device })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn device(&self) -> &SimulatedDevice {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut SimulatedDevice {
        &mut self.device
    }

    /// Accept and serve clients until `running` is cleared.
    pub fn run(&mut self, running: &AtomicBool) -> Result<()> {
        self.listener.set_nonblocking(true)?;
        info!(addr = %self.local_addr()?, "simulated device listening");

        while running.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    stream.set_nonblocking(false)?;
                    self.serve_client(stream, peer, running)?;
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        info!("simulated device stopped");
        Ok(())
    }

    /// Accept a single client and serve it until it disconnects.
    pub fn serve_one(&mut self) -> Result<()> {
        self.listener.set_nonblocking(false)?;
        let (stream, peer) = self.listener.accept()?;
        self.serve_client(stream, peer, &AtomicBool::new(true))
    }

    fn serve_client(
        &mut self,
        mut stream: TcpStream,
        peer: SocketAddr,
        running: &AtomicBool,
    ) -> Result<()> {
        info!(%peer, "client connected");
        stream.set_read_timeout(Some(POLL_INTERVAL))?;
        stream.set_nodelay(true)?;
        self.device.discard_partial();

        let mut buf = vec![0u8; READ_CHUNK];
        while running.load(Ordering::SeqCst) {
            let n = match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_deadline_error(&err) => continue,
                Err(err) if err.kind() == ErrorKind::ConnectionReset => break,
                Err(err) => return Err(TransportError::Io(err)),
            };

            for reply in self.device.receive(&buf[..n]) {
                if let Err(err) = stream.write_all(&reply).and_then(|()| stream.flush()) {
                    warn!(%peer, error = %err, "failed to send reply");
                    return Ok(());
                }
                debug!(%peer, bytes = reply.len(), "reply sent");
            }
        }

        info!(%peer, "client disconnected");
        Ok(())
    }
}
