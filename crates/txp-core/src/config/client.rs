//! Client configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::serde_utils::{duration_secs, duration_secs_opt};
use crate::transport::TransportSpec;

/// Default location of the system services database
pub const DEFAULT_SERVICES_FILE: &str = "/etc/services";

/// Where and how to submit events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Local datagram socket of the server. Takes precedence over host/service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,

    /// Server host name or address for stream submission
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Service name or port number on `host`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    /// Services database used to resolve non-numeric service names
    pub services_file: PathBuf,

    /// Connection timeout
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,

    /// How long to wait for a reply frame; unset waits indefinitely
    #[serde(with = "duration_secs_opt", skip_serializing_if = "Option::is_none")]
    pub reply_timeout: Option<Duration>,

    /// Log every frame sent and received
    pub verbose: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            local_path: None,
            host: None,
            service: None,
            services_file: PathBuf::from(DEFAULT_SERVICES_FILE),
            connect_timeout: Duration::from_secs(10),
            reply_timeout: None,
            verbose: false,
        }
    }
}

impl ClientConfig {
    /// Transport selection derived from this configuration
    pub fn transport_spec(&self) -> TransportSpec {
        TransportSpec {
            local_path: self.local_path.clone(),
            host: self.host.clone().filter(|h| !h.is_empty()),
            service: self.service.clone().filter(|s| !s.is_empty()),
            services_file: self.services_file.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.services_file, PathBuf::from("/etc/services"));
    }

    #[test]
    fn test_parse_full_config() {
        let config: ClientConfig = toml::from_str(
            r#"
            local_path = "/var/log/txProc/txProc.sock"
            host = "localhost"
            service = "txproc"
            connect_timeout = 3
            reply_timeout = 20
            verbose = true
            "#,
        )
        .unwrap();

        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.reply_timeout, Some(Duration::from_secs(20)));
        assert!(config.verbose);

        let spec = config.transport_spec();
        assert_eq!(spec.host.as_deref(), Some("localhost"));
        assert_eq!(spec.service.as_deref(), Some("txproc"));
    }

    #[test]
    fn test_empty_host_is_unset() {
        let config = ClientConfig {
            host: Some(String::new()),
            service: Some("7000".to_string()),
            ..ClientConfig::default()
        };
        assert!(config.transport_spec().host.is_none());
    }

    #[test]
    fn test_roundtrip_toml() {
        let config = ClientConfig {
            host: Some("server".to_string()),
            service: Some("7000".to_string()),
            reply_timeout: Some(Duration::from_secs(5)),
            ..ClientConfig::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(!text.contains("local_path"));

        let parsed: ClientConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
