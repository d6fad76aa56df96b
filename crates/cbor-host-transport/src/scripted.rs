use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use crate::error::Result;
use crate::traits::ByteTransport;

/// One scripted event on the read side of a [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStep {
    /// Bytes that become readable. May be consumed across several reads.
    Data(Vec<u8>),
    /// The read deadline elapses before anything else arrives.
    TimedOut,
    /// The peer disconnects; every later read returns `Ok(0)`.
    Closed,
    /// A read fails with the given error kind.
    Fail(ErrorKind),
}

/// In-memory transport driven by a script of read events.
///
/// When the script runs dry, reads behave like an idle serial line and
/// fail with [`ErrorKind::TimedOut`]. Written bytes are recorded for
/// inspection.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    stale: Vec<u8>,
    script: VecDeque<ReadStep>,
    written: Vec<u8>,
    unflushed: usize,
    write_capacity: Option<usize>,
    write_failure: Option<ErrorKind>,
    read_timeout: Option<Duration>,
    consumed: usize,
    input_resets: usize,
    output_resets: usize,
}

impl ScriptedTransport {
    /// Create a transport that replays `script` on the read side.
    pub fn new(script: Vec<ReadStep>) -> Self {
        Self {
            script: script.into(),
            ..Self::default()
        }
    }

    /// Create a transport whose read side yields exactly `bytes`, then times out.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(vec![ReadStep::Data(bytes.into())])
    }

    /// Bytes already sitting in the receive buffer, discarded by
    /// [`ByteTransport::reset_input_buffer`].
    pub fn with_stale_input(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.stale = bytes.into();
        self
    }

    /// Accept at most `capacity` written bytes; further writes return `Ok(0)`.
    pub fn with_write_capacity(mut self, capacity: usize) -> Self {
        self.write_capacity = Some(capacity);
        self
    }

    /// Fail every write with `kind`.
    pub fn with_write_failure(mut self, kind: ErrorKind) -> Self {
        self.write_failure = Some(kind);
        self
    }

    /// Append a step to the read script.
    pub fn push(&mut self, step: ReadStep) {
        self.script.push_back(step);
    }

    /// Everything written so far.
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Bytes handed out by `read` so far (stale input included).
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Scripted data bytes not yet read.
    pub fn remaining_data(&self) -> usize {
        self.script
            .iter()
            .map(|step| match step {
                ReadStep::Data(bytes) => bytes.len(),
                _ => 0,
            })
            .sum()
    }

    /// Number of input buffer resets performed.
    pub fn input_resets(&self) -> usize {
        self.input_resets
    }

    /// Number of output buffer resets performed.
    pub fn output_resets(&self) -> usize {
        self.output_resets
    }
}

impl Read for ScriptedTransport {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        if !self.stale.is_empty() {
            let n = buf.len().min(self.stale.len());
            buf[..n].copy_from_slice(&self.stale[..n]);
            self.stale.drain(..n);
            self.consumed += n;
            return Ok(n);
        }

        loop {
            match self.script.front_mut() {
                None => return Err(std::io::Error::from(ErrorKind::TimedOut)),
                Some(ReadStep::Closed) => return Ok(0),
                Some(ReadStep::Data(bytes)) if bytes.is_empty() => {
                    self.script.pop_front();
                }
                Some(ReadStep::Data(bytes)) => {
                    let n = buf.len().min(bytes.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    bytes.drain(..n);
                    if bytes.is_empty() {
                        self.script.pop_front();
                    }
                    self.consumed += n;
                    return Ok(n);
                }
                Some(ReadStep::TimedOut) => {
                    self.script.pop_front();
                    return Err(std::io::Error::from(ErrorKind::TimedOut));
                }
                Some(ReadStep::Fail(kind)) => {
                    let kind = *kind;
                    self.script.pop_front();
                    return Err(std::io::Error::from(kind));
                }
            }
        }
    }
}

impl Write for ScriptedTransport {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Some(kind) = self.write_failure {
            return Err(std::io::Error::from(kind));
        }
        let n = match self.write_capacity {
            Some(capacity) => buf.len().min(capacity.saturating_sub(self.written.len())),
            None => buf.len(),
        };
        self.written.extend_from_slice(&buf[..n]);
        self.unflushed += n;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.unflushed = 0;
        Ok(())
    }
}

impl ByteTransport for ScriptedTransport {
    fn reset_input_buffer(&mut self) -> Result<()> {
        self.stale.clear();
        self.input_resets += 1;
        Ok(())
    }

    fn reset_output_buffer(&mut self) -> Result<()> {
        let keep = self.written.len() - self.unflushed;
        self.written.truncate(keep);
        self.unflushed = 0;
        self.output_resets += 1;
        Ok(())
    }

    fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.read_timeout = timeout;
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "scripted"
    }
}
