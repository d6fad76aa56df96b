use std::fmt;
use std::io::ErrorKind;
use std::time::{Duration, Instant};

use cbor_host_frame::{FrameConfig, FrameError, FrameReader, FrameWriter, HEADER_SIZE};
use cbor_host_transport::{ByteTransport, TransportError};
use tracing::{debug, warn};

use crate::device::DEVICE_RX_BUFFER_SIZE;
use crate::error::{ProtocolError, SessionError};
use crate::payload;
use crate::request::Request;
use crate::response::Response;

/// Default bound on waiting for a response.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause between sending and reading for peers that process synchronously.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Largest response a device is expected to send.
pub const DEFAULT_MAX_RESPONSE_PAYLOAD: usize = cbor_host_frame::DEFAULT_MAX_RESPONSE_PAYLOAD;

/// How the peer on the other end of a transport paces itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportProfile {
    /// The peer buffers input and answers when ready. No settle delay.
    #[default]
    FlowControlled,
    /// The peer handles a request synchronously and has no flow control,
    /// so the host waits [`DEFAULT_SETTLE_DELAY`] before reading.
    SynchronousPeer,
}

impl TransportProfile {
    pub fn settle_delay(self) -> Option<Duration> {
        match self {
            TransportProfile::FlowControlled => None,
            TransportProfile::SynchronousPeer => Some(DEFAULT_SETTLE_DELAY),
        }
    }
}

/// Policy for one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Read deadline for the response. `None` blocks indefinitely.
    pub read_timeout: Option<Duration>,
    /// Wait between the write and the first read.
    pub settle_delay: Option<Duration>,
    /// Largest request payload that will be sent.
    pub max_request_payload: usize,
    /// Largest response payload that will be accepted.
    pub max_response_payload: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
            settle_delay: None,
            max_request_payload: DEVICE_RX_BUFFER_SIZE,
            max_response_payload: DEFAULT_MAX_RESPONSE_PAYLOAD,
        }
    }
}

impl SessionConfig {
    /// Defaults with the settle delay of `profile`.
    pub fn for_profile(profile: TransportProfile) -> Self {
        Self {
            settle_delay: profile.settle_delay(),
            ..Self::default()
        }
    }

    fn request_frames(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.max_request_payload,
            ..FrameConfig::default()
        }
    }

    fn response_frames(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.max_response_payload,
            read_timeout: self.read_timeout,
            ..FrameConfig::default()
        }
    }
}

/// Phases of one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    Sending,
    AwaitingResponse,
    Decoding,
    Done,
}

impl fmt::Display for ExchangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExchangeState::Idle => "idle",
            ExchangeState::Sending => "sending",
            ExchangeState::AwaitingResponse => "awaiting_response",
            ExchangeState::Decoding => "decoding",
            ExchangeState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Result of one exchange.
#[derive(Debug)]
pub enum SessionOutcome {
    /// A response was decoded. The device may still report failure in it.
    Success(Response),
    /// Framing or decoding failed; the stream is no longer frame-aligned.
    ProtocolError(ProtocolError),
    /// No response byte arrived before the deadline.
    Timeout,
    /// The transport failed.
    TransportError(TransportError),
}

impl SessionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SessionOutcome::Success(_))
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            SessionOutcome::Success(response) => Some(response),
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<Response, SessionError> {
        match self {
            SessionOutcome::Success(response) => Ok(response),
            SessionOutcome::ProtocolError(err) => Err(SessionError::Protocol(err)),
            SessionOutcome::Timeout => Err(SessionError::Timeout),
            SessionOutcome::TransportError(err) => Err(SessionError::Transport(err)),
        }
    }
}

impl From<SessionError> for SessionOutcome {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Protocol(err) => SessionOutcome::ProtocolError(err),
            SessionError::Timeout => SessionOutcome::Timeout,
            SessionError::Transport(err) => SessionOutcome::TransportError(err),
        }
    }
}

/// What happened during one exchange, including partial progress.
#[derive(Debug)]
pub struct ExchangeReport {
    pub outcome: SessionOutcome,
    /// Last phase entered before the exchange finished.
    pub phase: ExchangeState,
    /// Wire bytes written, length prefix included.
    pub bytes_sent: usize,
    /// Wire bytes read, length prefix included.
    pub bytes_received: usize,
    pub elapsed: Duration,
}

/// One request/response cycle over a borrowed transport.
///
/// Consumed by [`Exchange::run`]; a new exchange is created for every request.
pub struct Exchange<'a, T: ?Sized> {
    transport: &'a mut T,
    config: &'a SessionConfig,
    state: ExchangeState,
    bytes_sent: usize,
    bytes_received: usize,
}

impl<'a, T: ByteTransport + ?Sized> Exchange<'a, T> {
    pub fn new(transport: &'a mut T, config: &'a SessionConfig) -> Self {
        Self {
            transport,
            config,
            state: ExchangeState::Idle,
            bytes_sent: 0,
            bytes_received: 0,
        }
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Send `request` and wait for its response.
    pub fn run(mut self, request: &Request) -> ExchangeReport {
        let started = Instant::now();
        let outcome = match self.drive(request) {
            Ok(response) => SessionOutcome::Success(response),
            Err(err) => {
                warn!(
                    method = %request.method,
                    phase = %self.state,
                    error = %err,
                    "exchange failed"
                );
                SessionOutcome::from(err)
            }
        };
        let phase = self.state;
        self.transition(ExchangeState::Done);

        ExchangeReport {
            outcome,
            phase,
            bytes_sent: self.bytes_sent,
            bytes_received: self.bytes_received,
            elapsed: started.elapsed(),
        }
    }

    fn drive(&mut self, request: &Request) -> Result<Response, SessionError> {
        self.transition(ExchangeState::Sending);
        self.transport.reset_input_buffer()?;
        self.transport.reset_output_buffer()?;

        let body = request.encode().map_err(ProtocolError::MalformedPayload)?;
        let mut writer = FrameWriter::with_config(&mut *self.transport, self.config.request_frames());
        self.bytes_sent = writer.send(&body).map_err(send_error)?;
        debug!(
            method = %request.method,
            bytes = self.bytes_sent,
            transport = self.transport.transport_name(),
            "request sent"
        );

        self.transport.set_read_timeout(self.config.read_timeout)?;
        if let Some(delay) = self.config.settle_delay {
            debug!(delay = ?delay, "settling before read");
            std::thread::sleep(delay);
        }

        self.transition(ExchangeState::AwaitingResponse);
        let mut reader = FrameReader::with_config(&mut *self.transport, self.config.response_frames());
        let frame = match reader.read_frame_bounded() {
            Ok(frame) => frame,
            Err(err) => {
                self.bytes_received = partial_len(&err);
                return Err(receive_error(err));
            }
        };
        self.bytes_received = HEADER_SIZE + frame.len();

        self.transition(ExchangeState::Decoding);
        let value = payload::decode_value(&frame).map_err(ProtocolError::MalformedPayload)?;
        Ok(Response::decode(request.method.clone(), value))
    }

    fn transition(&mut self, next: ExchangeState) {
        debug!(from = %self.state, to = %next, "exchange state");
        self.state = next;
    }
}

/// Run one exchange and return only its outcome.
pub fn exchange<T: ByteTransport + ?Sized>(
    transport: &mut T,
    request: &Request,
    config: &SessionConfig,
) -> SessionOutcome {
    Exchange::new(transport, config).run(request).outcome
}

fn send_error(err: FrameError) -> SessionError {
    match err {
        FrameError::PayloadTooLarge { size, max } => {
            SessionError::Protocol(ProtocolError::PayloadTooLarge { size, max })
        }
        FrameError::ConnectionClosed => SessionError::Transport(TransportError::Io(
            std::io::Error::new(ErrorKind::WriteZero, "partial write of request frame"),
        )),
        FrameError::Io(err) => SessionError::Transport(TransportError::Io(err)),
        other => SessionError::Transport(TransportError::Io(std::io::Error::other(
            other.to_string(),
        ))),
    }
}

fn receive_error(err: FrameError) -> SessionError {
    match err {
        FrameError::Timeout => SessionError::Timeout,
        FrameError::ShortHeader { received } => {
            SessionError::Protocol(ProtocolError::ShortHeader { received })
        }
        FrameError::ShortPayload { expected, received } => {
            SessionError::Protocol(ProtocolError::ShortPayload { expected, received })
        }
        FrameError::PayloadTooLarge { size, max } => {
            SessionError::Protocol(ProtocolError::PayloadTooLarge { size, max })
        }
        FrameError::ConnectionClosed => SessionError::Transport(TransportError::Io(
            std::io::Error::new(ErrorKind::UnexpectedEof, "connection closed before response"),
        )),
        FrameError::Io(err) => SessionError::Transport(TransportError::Io(err)),
    }
}

fn partial_len(err: &FrameError) -> usize {
    match err {
        FrameError::ShortHeader { received } => *received,
        FrameError::ShortPayload { received, .. } => HEADER_SIZE + received,
        FrameError::PayloadTooLarge { .. } => HEADER_SIZE,
        _ => 0,
    }
}
