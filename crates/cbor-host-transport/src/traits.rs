use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use crate::error::Result;

/// A bidirectional, ordered byte stream to a device.
///
/// Reads block for at most the configured read timeout. A read that runs
/// into the deadline fails with [`ErrorKind::TimedOut`] or
/// [`ErrorKind::WouldBlock`]; a disconnected peer reads as `Ok(0)`.
///
/// The protocol carried over a transport has no correlation identifiers, so
/// at most one exchange may be in flight at a time. Callers serialize access
/// through `&mut`.
pub trait ByteTransport: Read + Write {
    /// Discard any bytes received but not yet read.
    ///
    /// Must succeed without side effects on a transport that has never been used.
    fn reset_input_buffer(&mut self) -> Result<()>;

    /// Discard any bytes written but not yet transmitted.
    fn reset_output_buffer(&mut self) -> Result<()>;

    /// Currently configured read timeout. `None` blocks indefinitely.
    fn read_timeout(&self) -> Option<Duration>;

    /// Change the read timeout applied to subsequent reads.
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()>;

    /// Transport name for diagnostics.
    fn transport_name(&self) -> &'static str;
}

impl<T: ByteTransport + ?Sized> ByteTransport for Box<T> {
    fn reset_input_buffer(&mut self) -> Result<()> {
        (**self).reset_input_buffer()
    }

    fn reset_output_buffer(&mut self) -> Result<()> {
        (**self).reset_output_buffer()
    }

    fn read_timeout(&self) -> Option<Duration> {
        (**self).read_timeout()
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        (**self).set_read_timeout(timeout)
    }

    fn transport_name(&self) -> &'static str {
        (**self).transport_name()
    }
}

impl<T: ByteTransport + ?Sized> ByteTransport for &mut T {
    fn reset_input_buffer(&mut self) -> Result<()> {
        (**self).reset_input_buffer()
    }

    fn reset_output_buffer(&mut self) -> Result<()> {
        (**self).reset_output_buffer()
    }

    fn read_timeout(&self) -> Option<Duration> {
        (**self).read_timeout()
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        (**self).set_read_timeout(timeout)
    }

    fn transport_name(&self) -> &'static str {
        (**self).transport_name()
    }
}

/// Returns true if the error means a read deadline elapsed.
///
/// Platforms disagree on the kind reported for socket timeouts
/// (`WouldBlock` on Unix, `TimedOut` on Windows and serial ports).
pub fn is_deadline_error(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_kinds() {
        assert!(is_deadline_error(&std::io::Error::from(ErrorKind::TimedOut)));
        assert!(is_deadline_error(&std::io::Error::from(
            ErrorKind::WouldBlock
        )));
        assert!(!is_deadline_error(&std::io::Error::from(
            ErrorKind::BrokenPipe
        )));
    }

    #[test]
    fn boxed_transport_delegates() {
        let inner = crate::ScriptedTransport::new(Vec::new());
        let mut boxed: Box<dyn ByteTransport> = Box::new(inner);

        boxed
            .set_read_timeout(Some(Duration::from_millis(250)))
            .unwrap();
        assert_eq!(boxed.read_timeout(), Some(Duration::from_millis(250)));
        boxed.reset_input_buffer().unwrap();
        boxed.reset_output_buffer().unwrap();
        assert_eq!(boxed.transport_name(), "scripted");
    }

    #[test]
    fn borrowed_transport_delegates() {
        fn configure<T: ByteTransport>(mut transport: T) {
            transport
                .set_read_timeout(Some(Duration::from_millis(40)))
                .unwrap();
            transport.reset_input_buffer().unwrap();
            assert_eq!(transport.transport_name(), "scripted");
        }

        let mut inner = crate::ScriptedTransport::new(Vec::new());
        configure(&mut inner);
        assert_eq!(inner.read_timeout(), Some(Duration::from_millis(40)));
        assert_eq!(inner.input_resets(), 1);
    }
}
