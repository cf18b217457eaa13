//! The event record
//!
//! An event is made of four independently serialized segments:
//!
//! 1. [`Identity`]: event type, reference, return channel and destination queue.
//!    Always present on the wire.
//! 2. [`Trace`]: tracing and lifetime bookkeeping.
//! 3. [`SystemParams`]: parameters interpreted by the server itself.
//! 4. [`ExecParams`]: parameters handed to the executed script or URL.
//!
//! Segments 2-4 are optional. A segment whose fields are all unset is written
//! as an empty section and read back as an empty segment.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::VocabularyError;
use crate::params::ExecParams;
use crate::serde_utils::{bool_as_int_opt, bool_opt, number_opt, string_opt};
use crate::vocab::{Command, EventType};

/// Identity and routing segment (`part1`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Kind of work requested
    #[serde(default)]
    pub event_type: EventType,

    /// Caller supplied reference, echoed in replies
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_opt::deserialize"
    )]
    pub reference: Option<String>,

    /// Return channel; `"0"` asks for a reply on the submitting stream
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_opt::deserialize"
    )]
    pub return_fd: Option<String>,

    /// Queue that should process the event
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_opt::deserialize"
    )]
    pub dest_queue: Option<String>,
}

/// Tracing and lifetime segment (`part2`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trace {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_opt::deserialize"
    )]
    pub trace: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_opt::deserialize"
    )]
    pub trace_timestamp: Option<String>,

    /// Absolute expiry time (unix seconds)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "number_opt::deserialize"
    )]
    pub expiry_time: Option<u64>,

    /// Requested lifetime in seconds
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "number_opt::deserialize"
    )]
    pub lifetime: Option<i64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "number_opt::deserialize"
    )]
    pub retries: Option<i64>,

    /// Pid of the worker that handled the event
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "number_opt::deserialize"
    )]
    pub wpid: Option<i64>,
}

/// System parameter segment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemParams {
    /// Ask the server to parse old style text responses
    #[serde(
        rename = "bStandardResponse",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "bool_opt::deserialize"
    )]
    pub standard_response: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Command>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_opt::deserialize"
    )]
    pub url: Option<String>,

    #[serde(
        rename = "scriptName",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_opt::deserialize"
    )]
    pub script_name: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_opt::deserialize"
    )]
    pub result: Option<String>,

    #[serde(
        rename = "bSuccess",
        default,
        skip_serializing_if = "Option::is_none",
        with = "bool_as_int_opt"
    )]
    pub success: Option<bool>,

    /// Set by the server when a reply frame will follow on the stream
    #[serde(
        rename = "bExpectReply",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "bool_opt::deserialize"
    )]
    pub expect_reply: Option<bool>,

    #[serde(
        rename = "errorString",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_opt::deserialize"
    )]
    pub error_string: Option<String>,

    #[serde(
        rename = "failureCause",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_opt::deserialize"
    )]
    pub failure_cause: Option<String>,

    #[serde(
        rename = "systemParam",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_opt::deserialize"
    )]
    pub system_param: Option<String>,

    /// Processing time reported by the server
    #[serde(
        rename = "elapsedTime",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "number_opt::deserialize"
    )]
    pub elapsed_time: Option<u64>,

    #[serde(
        rename = "bGeneratedRecoveryEvent",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "bool_opt::deserialize"
    )]
    pub generated_recovery_event: Option<bool>,
}

impl Trace {
    /// True if no field is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl SystemParams {
    /// True if no field is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A unit of work submitted to, or received from, the server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    pub identity: Identity,
    pub trace: Trace,
    pub system: SystemParams,
    pub exec: ExecParams,
}

impl Event {
    /// Create an event of the given type
    pub fn new(event_type: EventType) -> Self {
        Self {
            identity: Identity {
                event_type,
                ..Identity::default()
            },
            ..Self::default()
        }
    }

    /// Create an event from a symbolic type name such as `EV_URL`
    pub fn with_type_name(name: &str) -> Result<Self, VocabularyError> {
        let mut event = Self::default();
        event.set_event_type_name(name)?;
        Ok(event)
    }

    pub fn event_type(&self) -> EventType {
        self.identity.event_type
    }

    pub fn set_event_type(&mut self, event_type: EventType) {
        self.identity.event_type = event_type;
    }

    /// Set the event type by name.
    ///
    /// Unknown names are logged and leave the current type unchanged.
    pub fn set_event_type_name(&mut self, name: &str) -> Result<(), VocabularyError> {
        match EventType::from_name(name) {
            Ok(event_type) => {
                self.identity.event_type = event_type;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(value = name, "Rejected event type: {}", e);
                Err(e)
            }
        }
    }

    pub fn command(&self) -> Option<Command> {
        self.system.command
    }

    pub fn set_command(&mut self, command: Command) {
        self.system.command = Some(command);
    }

    /// Set the command by name.
    ///
    /// Unknown names are logged and leave the current command unchanged.
    pub fn set_command_name(&mut self, name: &str) -> Result<(), VocabularyError> {
        match Command::from_name(name) {
            Ok(command) => {
                self.system.command = Some(command);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(value = name, "Rejected command: {}", e);
                Err(e)
            }
        }
    }

    /// Set the return channel; the value is always carried as a string
    pub fn set_return_fd(&mut self, fd: impl ToString) {
        self.identity.return_fd = Some(fd.to_string());
    }

    pub fn set_dest_queue(&mut self, queue: impl Into<String>) {
        self.identity.dest_queue = Some(queue.into());
    }

    pub fn set_reference(&mut self, reference: impl Into<String>) {
        self.identity.reference = Some(reference.into());
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.system.url = Some(url.into());
    }

    pub fn set_script_name(&mut self, script: impl Into<String>) {
        self.system.script_name = Some(script.into());
    }

    /// True if the server announced a follow-up reply frame
    pub fn expects_reply(&self) -> bool {
        self.system.expect_reply.unwrap_or(false)
    }

    /// True if the server reported success
    pub fn is_success(&self) -> bool {
        self.system.success.unwrap_or(false)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = &self.identity;
        write!(f, "{}", id.event_type)?;
        if let Some(queue) = id.dest_queue.as_deref().filter(|q| !q.is_empty()) {
            write!(f, " q:'{}'", queue)?;
        }
        if let Some(reference) = id.reference.as_deref().filter(|r| !r.is_empty()) {
            write!(f, " ref:'{}'", reference)?;
        }
        if let Some(fd) = id.return_fd.as_deref().filter(|fd| !fd.is_empty() && *fd != "-1") {
            write!(f, " rFd:{}", fd)?;
        }

        let sys = &self.system;
        if let Some(command) = sys.command.filter(|c| *c != Command::None) {
            write!(f, " {}", command)?;
        }
        if let Some(url) = &sys.url {
            write!(f, " url:{}", url)?;
        }
        if let Some(script) = &sys.script_name {
            write!(f, " scriptName:'{}'", script)?;
        }
        if let Some(result) = &sys.result {
            write!(f, " result:'{}'", result)?;
        }
        if let Some(success) = sys.success {
            write!(f, " bSuccess:{}", u8::from(success))?;
        }
        if let Some(err) = &sys.error_string {
            write!(f, " errorString:{}", err)?;
        }
        if let Some(cause) = &sys.failure_cause {
            write!(f, " failureCause:{}", cause)?;
        }
        if let Some(param) = &sys.system_param {
            write!(f, " systemParam:{}", param)?;
        }

        if !self.exec.is_empty() {
            let params: Vec<String> = self
                .exec
                .iter()
                .enumerate()
                .map(|(i, p)| match &p.key {
                    Some(key) => format!("{}={}", key, p.value),
                    None => format!("{}={}", i, p.value),
                })
                .collect();
            write!(f, " execParams:[{}]", params.join(","))?;
        }

        let trace = &self.trace;
        if let Some(expiry) = trace.expiry_time.filter(|t| *t > 0) {
            write!(f, " expires:{}", expiry)?;
        }
        if let Some(retries) = trace.retries.filter(|r| *r > 0) {
            write!(f, " retries:{}", retries)?;
        }
        if let Some(text) = &trace.trace {
            write!(f, " traceB||{}||traceE", text)?;
        }
        if let Some(ts) = &trace.trace_timestamp {
            write!(f, " traceTS:{}", ts)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_json() {
        let mut event = Event::new(EventType::Url);
        event.set_return_fd(0);
        event.set_dest_queue("default");

        let json = serde_json::to_string(&event.identity).unwrap();
        assert_eq!(json, r#"{"eventType":5,"returnFd":"0","destQueue":"default"}"#);
    }

    #[test]
    fn test_empty_segments() {
        let event = Event::new(EventType::Script);
        assert!(event.trace.is_empty());
        assert!(event.system.is_empty());
        assert!(event.exec.is_empty());
    }

    #[test]
    fn test_unknown_type_name_leaves_type_unchanged() {
        let mut event = Event::new(EventType::Bin);
        assert!(event.set_event_type_name("EV_BOGUS").is_err());
        assert_eq!(event.event_type(), EventType::Bin);

        event.set_event_type_name("EV_COMMAND").unwrap();
        assert_eq!(event.event_type(), EventType::Command);
    }

    #[test]
    fn test_unknown_command_name_leaves_command_unset() {
        let mut event = Event::new(EventType::Command);
        assert!(event.set_command_name("CMD_BOGUS").is_err());
        assert_eq!(event.command(), None);

        event.set_command_name("CMD_STATS").unwrap();
        assert_eq!(event.command(), Some(Command::Stats));
    }

    #[test]
    fn test_success_written_as_integer() {
        let system = SystemParams {
            success: Some(true),
            expect_reply: Some(false),
            ..SystemParams::default()
        };
        let json = serde_json::to_string(&system).unwrap();
        assert_eq!(json, r#"{"bSuccess":1,"bExpectReply":false}"#);
    }

    #[test]
    fn test_system_params_accept_loose_types() {
        let json = r#"{"bSuccess":true,"bExpectReply":1,"elapsedTime":"12","command":1}"#;
        let system: SystemParams = serde_json::from_str(json).unwrap();
        assert_eq!(system.success, Some(true));
        assert_eq!(system.expect_reply, Some(true));
        assert_eq!(system.elapsed_time, Some(12));
        assert_eq!(system.command, Some(Command::Stats));
    }

    #[test]
    fn test_display_summary() {
        let mut event = Event::new(EventType::Url);
        event.set_dest_queue("default");
        event.set_url("http://host/test.php");
        event.exec.add_param("param1", "4");

        let text = event.to_string();
        assert!(text.starts_with("EV_URL q:'default'"));
        assert!(text.contains("url:http://host/test.php"));
        assert!(text.contains("execParams:[param1=4]"));
    }
}
