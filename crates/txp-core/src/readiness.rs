//! Blocking readiness wait
//!
//! Waits until a descriptor is readable without reading from it. Timing out is
//! a normal outcome; only a failing `poll` call is an error.

use std::io;
use std::os::unix::io::AsRawFd;
use std::time::Duration;

use crate::error::ReadinessError;

/// Outcome of a readiness wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// A read will not block (data, end of stream or a pending error)
    Ready,
    /// Nothing arrived within the timeout
    TimedOut,
}

fn timeout_millis(timeout: Option<Duration>) -> libc::c_int {
    match timeout {
        None => -1,
        Some(d) => d.as_millis().min(libc::c_int::MAX as u128) as libc::c_int,
    }
}

/// Wait until `source` is readable or `timeout` elapses; `None` waits forever
///
/// An interrupted wait is restarted with the full timeout.
pub fn wait_readable<F: AsRawFd + ?Sized>(
    source: &F,
    timeout: Option<Duration>,
) -> Result<Readiness, ReadinessError> {
    let fd = source.as_raw_fd();
    let mut pollfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let millis = timeout_millis(timeout);

    loop {
        // SAFETY: `pollfd` is a valid, exclusively borrowed array of length 1
        let rc = unsafe { libc::poll(&mut pollfd, 1, millis) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(ReadinessError::Poll(err));
        }
        if rc == 0 {
            tracing::trace!(fd, ?timeout, "Readiness wait timed out");
            return Ok(Readiness::TimedOut);
        }
        if pollfd.revents & libc::POLLNVAL != 0 {
            return Err(ReadinessError::InvalidDescriptor(fd));
        }
        return Ok(Readiness::Ready);
    }
}
