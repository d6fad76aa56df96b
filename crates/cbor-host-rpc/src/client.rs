use std::time::Duration;

use cbor_host_transport::{ByteTransport, Endpoint};
use tracing::info;

use crate::error::Result;
use crate::request::Request;
use crate::response::Response;
use crate::session::{Exchange, ExchangeReport, SessionConfig};

/// RPC client that owns a transport for its whole lifetime.
///
/// Calls take `&mut self`, so at most one exchange is ever in flight on the
/// transport. The transport is closed when the client is dropped.
pub struct RpcClient<T> {
    transport: T,
    config: SessionConfig,
}

impl<T: ByteTransport> RpcClient<T> {
    /// Wrap an open transport and apply the configured read timeout.
    pub fn new(mut transport: T, config: SessionConfig) -> Result<Self> {
        transport.set_read_timeout(config.read_timeout)?;
        Ok(Self { transport, config })
    }

    /// Run one exchange and return the full report.
    pub fn call_with_report(&mut self, request: &Request) -> ExchangeReport {
        Exchange::new(&mut self.transport, &self.config).run(request)
    }

    /// Run one exchange. Device-reported failures are returned as `Ok`.
    pub fn call(&mut self, request: &Request) -> Result<Response> {
        self.call_with_report(request).outcome.into_result()
    }

    pub fn test(&mut self, message: impl Into<String>) -> Result<Response> {
        self.call(&Request::test(message))
    }

    pub fn display_image(&mut self, image_data: impl Into<Vec<u8>>) -> Result<Response> {
        self.call(&Request::display_image(image_data))
    }

    pub fn clear_display(&mut self) -> Result<Response> {
        self.call(&Request::clear_display())
    }

    pub fn display_default(&mut self) -> Result<Response> {
        self.call(&Request::display_default())
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Replace the session policy for subsequent calls.
    pub fn set_config(&mut self, config: SessionConfig) -> Result<()> {
        self.transport.set_read_timeout(config.read_timeout)?;
        self.config = config;
        Ok(())
    }

    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.transport.set_read_timeout(timeout)?;
        self.config.read_timeout = timeout;
        Ok(())
    }

    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }
}

/// Open `endpoint` and wrap it in a client.
pub fn connect(
    endpoint: &Endpoint,
    config: SessionConfig,
) -> Result<RpcClient<Box<dyn ByteTransport + Send>>> {
    let transport = endpoint.open(config.read_timeout)?;
    info!(%endpoint, transport = transport.transport_name(), "connected");
    RpcClient::new(transport, config)
}

#[cfg(test)]
mod tests {
    use cbor_host_transport::ScriptedTransport;

    use super::*;
    use crate::error::SessionError;

    #[test]
    fn new_applies_read_timeout() {
        let config = SessionConfig {
            read_timeout: Some(Duration::from_millis(300)),
            ..SessionConfig::default()
        };
        let client = RpcClient::new(ScriptedTransport::default(), config).unwrap();
        assert_eq!(
            client.get_ref().read_timeout(),
            Some(Duration::from_millis(300))
        );
    }

    #[test]
    fn silent_device_times_out() {
        let mut client =
            RpcClient::new(ScriptedTransport::default(), SessionConfig::default()).unwrap();
        assert!(matches!(client.clear_display(), Err(SessionError::Timeout)));
    }

    #[test]
    fn set_read_timeout_updates_transport_and_config() {
        let mut client =
            RpcClient::new(ScriptedTransport::default(), SessionConfig::default()).unwrap();
        client.set_read_timeout(None).unwrap();
        assert_eq!(client.config().read_timeout, None);
        assert_eq!(client.get_mut().read_timeout(), None);
        let _transport = client.into_inner();
    }

    #[test]
    fn connect_to_unreachable_endpoint_fails() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint = Endpoint::Tcp(addr.to_string());
        let config = SessionConfig {
            read_timeout: Some(Duration::from_millis(500)),
            ..SessionConfig::default()
        };
        assert!(matches!(
            connect(&endpoint, config),
            Err(SessionError::Transport(_))
        ));
    }
}
