//! Byte-stream transports for talking to a device.
//!
//! Provides a single [`ByteTransport`] interface over the links a host tool
//! reaches a board through:
//! - TCP-backed serial emulation (`socket://host:port`, as exposed by board
//!   simulators)
//! - Physical serial ports (behind the `serial` feature)
//! - A scripted in-memory transport for tests (behind the `test-util` feature)
//!
//! This is the lowest layer of cbor-host. Framing and RPC build on top of it.

pub mod endpoint;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod scripted;
#[cfg(feature = "serial")]
pub mod serial;
pub mod tcp;
pub mod traits;

pub use endpoint::{Endpoint, DEFAULT_BAUD_RATE};
pub use error::{Result, TransportError};
#[cfg(any(test, feature = "test-util"))]
pub use scripted::{ReadStep, ScriptedTransport};
#[cfg(feature = "serial")]
pub use serial::SerialDevice;
pub use tcp::TcpSerial;
pub use traits::{is_deadline_error, ByteTransport};
