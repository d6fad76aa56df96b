//! Request/response sessions with a device.
//!
//! One exchange sends a CBOR-encoded request inside a length-prefixed frame
//! and reads back exactly one framed CBOR response. The protocol carries no
//! correlation identifiers, so a transport holds at most one exchange in
//! flight; [`RpcClient`] enforces that through `&mut self`.
//!
//! Application-level failures reported by the device (`status != "success"`)
//! come back as ordinary [`Response`] data. Only transport, framing and
//! decoding failures produce a non-success [`SessionOutcome`].

pub mod client;
pub mod device;
pub mod error;
pub mod payload;
pub mod request;
pub mod response;
pub mod server;
pub mod session;

pub use client::{connect, RpcClient};
pub use device::{
    SimulatedDevice, DEVICE_RX_BUFFER_SIZE, IMAGE_DATA_SIZE, IMAGE_HEIGHT, IMAGE_PIXEL_COUNT,
    IMAGE_WIDTH,
};
pub use error::{PayloadError, ProtocolError, SessionError};
pub use request::{Method, Request};
pub use response::{AppStatus, Response, ResponseBody, StatusReply, TestReply};
pub use server::DeviceServer;
pub use session::{
    exchange, Exchange, ExchangeReport, ExchangeState, SessionConfig, SessionOutcome,
    TransportProfile, DEFAULT_READ_TIMEOUT, DEFAULT_SETTLE_DELAY,
};

/// Re-export of the structured value type carried in payloads.
pub use ciborium::value::Value;
