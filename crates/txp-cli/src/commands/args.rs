//! Shared argument groups for event-building commands

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use txp_core::ClientConfig;
use txp_protocol::Event;

/// Parse a single `key=value` pair
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{}`", s))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in `{}`", s));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Flags describing the event to send
#[derive(Args, Debug, Clone)]
pub struct EventArgs {
    /// Event type name
    #[arg(short = 't', long = "type", default_value = "EV_SCRIPT")]
    pub event_type: String,

    /// Destination queue
    #[arg(long)]
    pub queue: Option<String>,

    /// URL to fetch (EV_URL)
    #[arg(short, long)]
    pub url: Option<String>,

    /// Script to run (EV_SCRIPT, EV_PERL, EV_BIN)
    #[arg(short, long)]
    pub script: Option<String>,

    /// Command name for EV_COMMAND, e.g. CMD_STATS
    #[arg(long)]
    pub command: Option<String>,

    /// Caller reference echoed back in replies
    #[arg(short, long)]
    pub reference: Option<String>,

    /// Return channel the server should reply on
    #[arg(long)]
    pub return_fd: Option<String>,

    /// Trace tag
    #[arg(long)]
    pub trace: Option<String>,

    /// Lifetime in seconds
    #[arg(long)]
    pub lifetime: Option<i64>,

    /// Named exec parameter (repeatable)
    #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub params: Vec<(String, String)>,

    /// Positional script argument (repeatable)
    #[arg(short, long = "arg", value_name = "VALUE")]
    pub args: Vec<String>,
}

impl EventArgs {
    /// Build the event described by these flags
    pub fn build(&self) -> Result<Event> {
        let mut event = Event::with_type_name(&self.event_type)
            .with_context(|| format!("Invalid event type {:?}", self.event_type))?;

        if let Some(queue) = &self.queue {
            event.set_dest_queue(queue);
        }
        if let Some(url) = &self.url {
            event.set_url(url);
        }
        if let Some(script) = &self.script {
            event.set_script_name(script);
        }
        if let Some(command) = &self.command {
            event
                .set_command_name(command)
                .with_context(|| format!("Invalid command {:?}", command))?;
        }
        if let Some(reference) = &self.reference {
            event.set_reference(reference);
        }
        if let Some(fd) = &self.return_fd {
            event.set_return_fd(fd);
        }
        event.trace.trace = self.trace.clone();
        event.trace.lifetime = self.lifetime;

        for (key, value) in &self.params {
            event.exec.add_param(key, value);
        }
        for value in &self.args {
            event.exec.add_script_param(value);
        }

        Ok(event)
    }
}

/// Flags overriding where and how events are sent
#[derive(Args, Debug, Clone, Default)]
pub struct DestinationArgs {
    /// Local datagram socket path
    #[arg(long, env = "TXPROC_LOCAL_PATH")]
    pub local_path: Option<std::path::PathBuf>,

    /// Server host for stream connections
    #[arg(long, env = "TXPROC_HOST")]
    pub host: Option<String>,

    /// Server port number or service name
    #[arg(long, env = "TXPROC_SERVICE")]
    pub service: Option<String>,

    /// Seconds to wait for the connection (0 waits indefinitely)
    #[arg(long, value_name = "SECS")]
    pub connect_timeout: Option<u64>,

    /// Seconds to wait for the acknowledgement and reply (0 waits indefinitely)
    #[arg(long, value_name = "SECS")]
    pub reply_timeout: Option<u64>,
}

impl DestinationArgs {
    /// Overlay these flags on a loaded configuration
    pub fn apply(&self, config: &mut ClientConfig) {
        if let Some(path) = &self.local_path {
            config.local_path = Some(path.clone());
        }
        if let Some(host) = &self.host {
            config.host = Some(host.clone());
        }
        if let Some(service) = &self.service {
            config.service = Some(service.clone());
        }
        if let Some(secs) = self.connect_timeout {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.reply_timeout {
            config.reply_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
    }
}
