//! Submission round trip
//!
//! One exchange runs `INIT -> CREATE_TRANSPORT -> GREETING -> SEND ->
//! WAIT_REPLY -> DONE`. Datagram transports skip the greeting and the reply.
//! A socket created here is closed when the exchange returns, on every path;
//! a stream handed in by the caller is never closed.

use std::io::{Read, Write};
#[cfg(unix)]
use std::os::unix::io::AsRawFd;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, trace};
use txp_protocol::{encode_event, read_event, Event};

use crate::config::ClientConfig;
use crate::error::TxpError;
use crate::greeting::{read_greeting, Greeting};
#[cfg(unix)]
use crate::readiness::{wait_readable, Readiness};
use crate::transport::{create_transport_kind, write_frame, Transport, TransportKind, TransportSpec};

/// Status code reported for a failed submission
pub const STATUS_FAILED: u8 = 0;

/// Outcome of a successful submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStatus {
    /// Delivered; no reply frame will follow
    Accepted,
    /// Delivered; the server will send a reply frame on the same stream
    ReplyExpected,
}

impl SubmitStatus {
    /// Status derived from the acknowledgement frame's `bExpectReply` flag
    pub fn from_ack(ack: &Event) -> Self {
        if ack.expects_reply() {
            SubmitStatus::ReplyExpected
        } else {
            SubmitStatus::Accepted
        }
    }

    /// Numeric status: 1 accepted, 2 reply expected
    pub fn code(self) -> u8 {
        match self {
            SubmitStatus::Accepted => 1,
            SubmitStatus::ReplyExpected => 2,
        }
    }
}

/// Numeric status of a submission result: 0 failed, 1 accepted, 2 reply expected
pub fn status_code(result: &Result<Submission, TxpError>) -> u8 {
    match result {
        Ok(submission) => submission.status.code(),
        Err(_) => STATUS_FAILED,
    }
}

/// Everything learned from one exchange
#[derive(Debug, Clone)]
pub struct Submission {
    pub status: SubmitStatus,
    pub transport: TransportKind,
    /// Server greeting (stream only)
    pub greeting: Option<Greeting>,
    /// Acknowledgement frame read right after sending (stream only)
    pub ack: Option<Event>,
    /// Follow-up reply, when requested and announced
    pub reply: Option<Event>,
}

impl Submission {
    fn datagram() -> Self {
        Self {
            status: SubmitStatus::Accepted,
            transport: TransportKind::Datagram,
            greeting: None,
            ack: None,
            reply: None,
        }
    }
}

/// Drives single submissions to one configured destination
#[derive(Debug, Clone)]
pub struct Exchange {
    spec: TransportSpec,
    connect_timeout: Option<Duration>,
    reply_timeout: Option<Duration>,
    verbose: bool,
}

impl Exchange {
    pub fn new(spec: TransportSpec) -> Self {
        Self {
            spec,
            connect_timeout: None,
            reply_timeout: None,
            verbose: false,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            spec: config.transport_spec(),
            connect_timeout: (!config.connect_timeout.is_zero()).then_some(config.connect_timeout),
            reply_timeout: config.reply_timeout,
            verbose: config.verbose,
        }
    }

    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn reply_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.reply_timeout = timeout;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn spec(&self) -> &TransportSpec {
        &self.spec
    }

    /// Submit `event` over a newly created transport
    pub fn submit(&self, event: &Event) -> Result<Submission, TxpError> {
        self.run(event, false)
    }

    /// Submit `event` and, when the server announces one, read the reply
    /// frame before the transport is closed
    pub fn submit_and_wait(&self, event: &Event) -> Result<Submission, TxpError> {
        self.run(event, true)
    }

    /// Submit `event` on a caller-owned stream
    ///
    /// The stream is always treated as stream mode and stays open; on
    /// [`SubmitStatus::ReplyExpected`] the caller reads the reply from it.
    pub fn submit_on<S: Read + Write>(
        &self,
        stream: &mut S,
        event: &Event,
    ) -> Result<Submission, TxpError> {
        let frame = self.encode(event)?;
        self.exchange_stream(stream, &frame)
    }

    fn encode(&self, event: &Event) -> Result<Bytes, TxpError> {
        let frame = encode_event(event)?;
        self.log_frame("Sending", &frame);
        Ok(frame)
    }

    fn log_frame(&self, direction: &str, frame: &[u8]) {
        if self.verbose {
            info!(len = frame.len(), "{} frame: {}", direction, String::from_utf8_lossy(frame));
        } else {
            trace!(len = frame.len(), "{} frame: {}", direction, String::from_utf8_lossy(frame));
        }
    }

    fn run(&self, event: &Event, follow_reply: bool) -> Result<Submission, TxpError> {
        // Encode first: the frame size decides between datagram and stream
        let frame = self.encode(event)?;
        let kind = self.spec.kind_for(frame.len())?;
        debug!(?kind, "Creating transport");

        match create_transport_kind(&self.spec, kind, self.connect_timeout)? {
            Transport::Stream(mut stream) => {
                stream.set_read_timeout(self.reply_timeout)?;
                let mut submission = self.exchange_stream(&mut stream, &frame)?;
                if follow_reply && submission.status == SubmitStatus::ReplyExpected {
                    debug!("Waiting for reply");
                    let reply = self.await_reply(&mut stream)?;
                    submission.reply = Some(reply);
                }
                Ok(submission)
            }
            // Datagrams carry no greeting and no reply
            #[cfg(unix)]
            mut transport => {
                let written = transport.send_frame(&frame)?;
                debug!(len = written, kind = ?transport.kind(), "Frame sent");
                Ok(Submission::datagram())
            }
        }
    }

    #[cfg(unix)]
    fn await_reply<S: Read + AsRawFd>(&self, stream: &mut S) -> Result<Event, TxpError> {
        let reply = read_reply(stream, self.reply_timeout)?;
        debug!("Reply received: {}", reply);
        Ok(reply)
    }

    #[cfg(not(unix))]
    fn await_reply<S: Read>(&self, stream: &mut S) -> Result<Event, TxpError> {
        Ok(read_event(stream)?)
    }

    fn exchange_stream<S: Read + Write>(
        &self,
        stream: &mut S,
        frame: &[u8],
    ) -> Result<Submission, TxpError> {
        let greeting = read_greeting(stream)?;

        let written = write_frame(stream, frame)?;
        debug!(len = written, "Frame sent");

        let ack = read_event(stream)?;
        let status = SubmitStatus::from_ack(&ack);
        debug!(?status, "Acknowledged: {}", ack);

        Ok(Submission {
            status,
            transport: TransportKind::Stream,
            greeting: Some(greeting),
            ack: Some(ack),
            reply: None,
        })
    }
}

/// Wait up to `timeout` for a reply frame on `stream` and read it
///
/// `None` waits indefinitely.
#[cfg(unix)]
pub fn read_reply<S: Read + AsRawFd>(
    stream: &mut S,
    timeout: Option<Duration>,
) -> Result<Event, TxpError> {
    if wait_readable(&*stream, timeout)? == Readiness::TimedOut {
        return Err(TxpError::ReplyTimeout(timeout.unwrap_or_default()));
    }
    Ok(read_event(stream)?)
}
