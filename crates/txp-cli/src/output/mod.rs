//! Output formatting utilities for the CLI
//!
//! Event tables for `decode` and submission results, plus colored status
//! messages.

use serde_json::Value;
use tabled::{
    settings::{Style, Width},
    Table, Tabled,
};
use txp_core::{Submission, TransportKind};
use txp_protocol::{Event, Section};

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "SECTION")]
    section: String,
    #[tabled(rename = "FIELD")]
    field: String,
    #[tabled(rename = "VALUE")]
    value: String,
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn push_section<T: serde::Serialize>(rows: &mut Vec<FieldRow>, section: Section, segment: &T) {
    if let Ok(Value::Object(fields)) = serde_json::to_value(segment) {
        for (field, value) in fields {
            rows.push(FieldRow {
                section: section.to_string(),
                field,
                value: display_value(&value),
            });
        }
    }
}

/// Format every set field of an event as an ASCII table
///
/// Event types and commands are shown by name rather than wire number.
pub fn format_event(event: &Event) -> String {
    let mut rows = vec![FieldRow {
        section: Section::Identity.to_string(),
        field: "eventType".to_string(),
        value: event.event_type().to_string(),
    }];

    let mut identity = Vec::new();
    push_section(&mut identity, Section::Identity, &event.identity);
    rows.extend(identity.into_iter().filter(|r| r.field != "eventType"));

    push_section(&mut rows, Section::Trace, &event.trace);

    let mut system = Vec::new();
    push_section(&mut system, Section::System, &event.system);
    for mut row in system {
        if row.field == "command" {
            if let Some(command) = event.command() {
                row.value = command.to_string();
            }
        }
        rows.push(row);
    }

    for (i, param) in event.exec.iter().enumerate() {
        rows.push(FieldRow {
            section: Section::Exec.to_string(),
            field: param.key.clone().unwrap_or_else(|| format!("[{}]", i)),
            value: truncate(&param.value, 200),
        });
    }

    Table::new(rows)
        .with(Style::rounded())
        .with(Width::wrap(120))
        .to_string()
}

/// Raw JSON view of the four sections
pub fn event_json(event: &Event) -> Value {
    serde_json::json!({
        "identity": event.identity,
        "trace": event.trace,
        "sysParams": event.system,
        "execParams": event.exec,
    })
}

/// One-line description of a submission outcome
pub fn format_submission(submission: &Submission) -> String {
    let transport = match submission.transport {
        TransportKind::Datagram => "datagram",
        TransportKind::Stream => "stream",
    };
    let mut line = format!(
        "status {} via {}",
        submission.status.code(),
        transport
    );
    if let Some(greeting) = &submission.greeting {
        line.push_str(&format!(" (server: {})", greeting.text));
    }
    line
}

/// Truncate a string with ellipsis if too long
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

/// Print a success message in green with a checkmark prefix
pub fn print_success(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Green),
        Print("✓ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an error message in red with an X prefix
pub fn print_error(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Red),
        Print("✗ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print a warning message in yellow with a warning symbol prefix
pub fn print_warning(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stderr = std::io::stderr();
    let _ = crossterm::execute!(
        stderr,
        SetForegroundColor(Color::Yellow),
        Print("⚠ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Print an informational message in cyan with an info symbol prefix
pub fn print_info(msg: &str) {
    use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};

    let mut stdout = std::io::stdout();
    let _ = crossterm::execute!(
        stdout,
        SetForegroundColor(Color::Cyan),
        Print("ℹ "),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use txp_protocol::{Command, EventType};

    #[test]
    fn test_format_event_uses_names() {
        let mut event = Event::new(EventType::Command);
        event.set_command(Command::Stats);
        event.set_dest_queue("default");
        event.exec.add_script_param("first");

        let table = format_event(&event);
        assert!(table.contains("EV_COMMAND"));
        assert!(table.contains("CMD_STATS"));
        assert!(table.contains("destQueue"));
        assert!(table.contains("[0]"));
    }

    #[test]
    fn test_event_json_sections() {
        let mut event = Event::new(EventType::Url);
        event.exec.add_param("param1", "4");

        let json = event_json(&event);
        assert_eq!(json["identity"]["eventType"], 5);
        assert_eq!(json["execParams"]["param1"], "4");
        assert!(json["trace"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
        assert_eq!(truncate("ééééééééé", 5), "éé...");
    }
}
