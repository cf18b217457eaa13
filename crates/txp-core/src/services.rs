//! Service name to port resolution
//!
//! A service is a port number or a name. Names go to the system resolver
//! first (`getservbyname`, which follows the NSS configuration) and then to
//! a services database file (`/etc/services` format:
//! `name port/protocol [aliases...] [# comment]`). Only `tcp` entries are
//! considered.

use std::fs;
use std::path::Path;

use crate::error::TransportError;

/// Resolve `service` to a TCP port
pub fn resolve_service(service: &str, services_file: &Path) -> Result<u16, TransportError> {
    let service = service.trim();
    if let Ok(port) = service.parse::<u16>() {
        return Ok(port);
    }

    if let Some(port) = system_lookup(service) {
        tracing::debug!(service, port, "Resolved service via system resolver");
        return Ok(port);
    }

    let content = fs::read_to_string(services_file).map_err(|source| TransportError::ServicesFile {
        path: services_file.to_path_buf(),
        source,
    })?;

    let port = lookup_service(&content, service).ok_or_else(|| TransportError::UnknownService {
        service: service.to_string(),
        path: services_file.to_path_buf(),
    })?;
    tracing::debug!(service, port, path = %services_file.display(), "Resolved service");
    Ok(port)
}

/// Look up a TCP service through the C library resolver
#[cfg(unix)]
pub fn system_lookup(name: &str) -> Option<u16> {
    use std::ffi::CString;
    use std::sync::Mutex;

    // getservbyname returns a pointer into static storage
    static RESOLVER: Mutex<()> = Mutex::new(());
    const TCP: &[u8] = b"tcp\0";

    let name = CString::new(name).ok()?;
    let _guard = RESOLVER.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    // SAFETY: both arguments are NUL-terminated strings that outlive the call,
    // and the returned entry is read while the lock is held
    unsafe {
        let entry = libc::getservbyname(name.as_ptr(), TCP.as_ptr().cast());
        if entry.is_null() {
            return None;
        }
        // s_port holds the port in network byte order
        Some(u16::from_be((*entry).s_port as u16))
    }
}

#[cfg(not(unix))]
pub fn system_lookup(_name: &str) -> Option<u16> {
    None
}

/// Find the TCP port for `name` in services database text
pub fn lookup_service(content: &str, name: &str) -> Option<u16> {
    content.lines().find_map(|line| {
        let line = line.split('#').next().unwrap_or_default();
        let mut fields = line.split_whitespace();
        let service = fields.next()?;
        let (port, protocol) = fields.next()?.split_once('/')?;
        if protocol != "tcp" {
            return None;
        }
        let matches = service == name || fields.any(|alias| alias == name);
        if matches {
            port.parse().ok()
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVICES: &str = "\
# Network services
ssh             22/tcp                          # SSH Remote Login Protocol
domain          53/udp
txproc          7000/udp
txproc          7000/tcp        txp tx-proc     # event server
http            80/tcp          www
";

    #[test]
    fn test_lookup_by_name_and_alias() {
        assert_eq!(lookup_service(SERVICES, "txproc"), Some(7000));
        assert_eq!(lookup_service(SERVICES, "tx-proc"), Some(7000));
        assert_eq!(lookup_service(SERVICES, "www"), Some(80));
        assert_eq!(lookup_service(SERVICES, "ssh"), Some(22));
    }

    #[test]
    fn test_udp_only_and_unknown() {
        assert_eq!(lookup_service(SERVICES, "domain"), None);
        assert_eq!(lookup_service(SERVICES, "missing"), None);
        assert_eq!(lookup_service(SERVICES, "Network"), None);
    }

    #[test]
    fn test_numeric_service_skips_file() {
        let port = resolve_service("7001", Path::new("/nonexistent/services")).unwrap();
        assert_eq!(port, 7001);
    }

    #[cfg(unix)]
    #[test]
    fn test_system_resolver_before_file() {
        // Only meaningful where the host's services database lists ssh
        let Some(expected) = fs::read_to_string("/etc/services")
            .ok()
            .and_then(|content| lookup_service(&content, "ssh"))
        else {
            return;
        };

        assert_eq!(system_lookup("ssh"), Some(expected));
        let absent = Path::new("/nonexistent/services");
        assert_eq!(resolve_service("ssh", absent).unwrap(), expected);
    }

    #[cfg(unix)]
    #[test]
    fn test_system_resolver_unknown_name() {
        assert_eq!(system_lookup("no-such-txproc-service"), None);
        assert_eq!(system_lookup("bad\0name"), None);
    }

    #[test]
    fn test_resolve_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("services");
        fs::write(&path, SERVICES).unwrap();

        assert_eq!(resolve_service("txproc", &path).unwrap(), 7000);
        assert!(matches!(
            resolve_service("nope", &path),
            Err(TransportError::UnknownService { .. })
        ));
        assert!(matches!(
            resolve_service("txproc", &dir.path().join("absent")),
            Err(TransportError::ServicesFile { .. })
        ));
    }
}
