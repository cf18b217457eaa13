//! Exchange tests against in-process servers
//!
//! Stream tests run a loopback `TcpListener` that speaks the server side of
//! the protocol; datagram tests bind a Unix datagram socket in a temp dir.

#![cfg(unix)]

use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use txp_core::{
    read_reply, status_code, Exchange, SubmitStatus, TransportError, TransportKind, TransportSpec,
    TxpError, MAX_DATAGRAM_LEN,
};
use txp_protocol::{decode_event, encode_event, read_event, Event, EventType, SystemParams};

const GREETING: &[u8] = b"032:txProc@tiferet pver 3.0 md 32768";

fn url_event() -> Event {
    let mut event = Event::new(EventType::Url);
    event.set_dest_queue("default");
    event.set_url("http://host/test.php");
    event.set_return_fd(0);
    event.exec.add_param("param1", "4");
    event.exec.add_param("param2", "param2");
    event.exec.add_param("param3", "3");
    event
}

fn ack(expect_reply: bool) -> Event {
    let mut event = Event::new(EventType::Reply);
    event.system = SystemParams {
        success: Some(true),
        expect_reply: Some(expect_reply),
        ..SystemParams::default()
    };
    event
}

fn result_event() -> Event {
    let mut event = Event::new(EventType::Result);
    event.system.result = Some("done".to_string());
    event.system.success = Some(true);
    event
}

/// What the fake server does after reading the submitted frame
#[derive(Clone, Copy)]
enum Script {
    /// Acknowledge without a follow-up reply
    Ack,
    /// Acknowledge, then send a result frame
    AckThenReply,
    /// Acknowledge with a reply announced, then stay silent
    AckThenSilence,
}

struct FakeServer {
    port: u16,
    handle: JoinHandle<Event>,
    release: mpsc::Sender<()>,
}

impl FakeServer {
    fn start(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (release, released) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(GREETING).unwrap();

            let submitted = read_event(&mut stream).unwrap();
            let expect_reply = !matches!(script, Script::Ack);
            stream.write_all(&encode_event(&ack(expect_reply)).unwrap()).unwrap();

            if let Script::AckThenReply = script {
                stream.write_all(&encode_event(&result_event()).unwrap()).unwrap();
            }

            // Hold the connection until the client is done
            let _ = released.recv_timeout(Duration::from_secs(10));
            submitted
        });

        Self {
            port,
            handle,
            release,
        }
    }

    fn spec(&self) -> TransportSpec {
        TransportSpec::remote("127.0.0.1", self.port.to_string())
    }

    fn finish(self) -> Event {
        let _ = self.release.send(());
        self.handle.join().unwrap()
    }
}

#[test]
fn test_stream_submit_accepted() {
    let server = FakeServer::start(Script::Ack);
    let exchange = Exchange::new(server.spec()).connect_timeout(Some(Duration::from_secs(5)));

    let result = exchange.submit(&url_event());
    assert_eq!(status_code(&result), 1);

    let submission = result.unwrap();
    assert_eq!(submission.transport, TransportKind::Stream);
    assert_eq!(submission.greeting.unwrap().protocol_version, "3.0");

    assert_eq!(server.finish(), url_event());
}

#[test]
fn test_stream_submit_and_wait_reads_reply() {
    let server = FakeServer::start(Script::AckThenReply);
    let exchange = Exchange::new(server.spec()).reply_timeout(Some(Duration::from_secs(5)));

    let submission = exchange.submit_and_wait(&url_event()).unwrap();
    assert_eq!(submission.status, SubmitStatus::ReplyExpected);
    assert_eq!(submission.reply, Some(result_event()));

    server.finish();
}

#[test]
fn test_reply_timeout() {
    let server = FakeServer::start(Script::AckThenSilence);
    let exchange = Exchange::new(server.spec()).reply_timeout(Some(Duration::from_millis(200)));

    let result = exchange.submit_and_wait(&url_event());
    assert!(matches!(result, Err(TxpError::ReplyTimeout(_))));

    server.finish();
}

#[test]
fn test_caller_owned_stream_stays_open() {
    let server = FakeServer::start(Script::AckThenReply);
    let mut stream = TcpStream::connect(("127.0.0.1", server.port)).unwrap();

    let exchange = Exchange::new(TransportSpec::default());
    let submission = exchange.submit_on(&mut stream, &url_event()).unwrap();
    assert_eq!(submission.status.code(), 2);

    // The reply arrives on the same, still open, stream
    let reply = read_reply(&mut stream, Some(Duration::from_secs(5))).unwrap();
    assert_eq!(reply, result_event());

    server.finish();
}

#[test]
fn test_datagram_submit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("txProc.sock");
    let server = std::os::unix::net::UnixDatagram::bind(&path).unwrap();

    let exchange = Exchange::new(TransportSpec::local(&path));
    let submission = exchange.submit(&url_event()).unwrap();
    assert_eq!(submission.status, SubmitStatus::Accepted);
    assert_eq!(submission.transport, TransportKind::Datagram);
    assert!(submission.ack.is_none());

    let mut buf = vec![0u8; 65536];
    let n = server.recv(&mut buf).unwrap();
    assert_eq!(decode_event(&buf[..n]).unwrap(), url_event());
}

fn oversized_event() -> Event {
    let mut event = url_event();
    event.exec.add_param("blob", "x".repeat(MAX_DATAGRAM_LEN));
    event
}

#[test]
fn test_oversized_datagram_without_stream() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("txProc.sock");
    let _server = std::os::unix::net::UnixDatagram::bind(&path).unwrap();

    let result = Exchange::new(TransportSpec::local(&path)).submit(&oversized_event());
    assert!(matches!(
        result,
        Err(TxpError::Transport(TransportError::DatagramTooLarge { .. }))
    ));
    assert_eq!(status_code(&result), 0);
}

#[test]
fn test_oversized_datagram_falls_back_to_stream() {
    let server = FakeServer::start(Script::Ack);
    let spec = TransportSpec {
        local_path: Some("/nonexistent/txProc.sock".into()),
        ..server.spec()
    };

    let submission = Exchange::new(spec).submit(&oversized_event()).unwrap();
    assert_eq!(submission.transport, TransportKind::Stream);

    assert_eq!(server.finish(), oversized_event());
}

#[test]
fn test_greeting_version_mismatch_closes_local_socket() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.write_all(b"032:txProc@tiferet pver 2.0 md 32768").unwrap();
        // The client gives up without sending; the read sees end of stream
        let mut rest = Vec::new();
        std::io::Read::read_to_end(&mut stream, &mut rest).unwrap();
        rest
    });

    let result = Exchange::new(TransportSpec::remote("127.0.0.1", port.to_string()))
        .submit(&url_event());
    assert!(matches!(result, Err(TxpError::Handshake(_))));

    assert!(handle.join().unwrap().is_empty());
}
