//! Submit command implementation

use anyhow::{Context, Result};
use txp_core::{ClientConfig, Exchange, SubmitStatus};

use super::args::{DestinationArgs, EventArgs};
use crate::output::{event_json, format_event, format_submission, print_info, print_success};

/// Build an event from flags and submit it to the configured server
///
/// With `wait`, a reply announced by the server is read and printed before
/// the connection is closed.
pub fn submit_command(
    mut config: ClientConfig,
    event_args: &EventArgs,
    dest: &DestinationArgs,
    wait: bool,
    json: bool,
) -> Result<()> {
    dest.apply(&mut config);
    let event = event_args.build()?;
    tracing::debug!("Submitting {}", event);

    let exchange = Exchange::from_config(&config);
    let result = if wait {
        exchange.submit_and_wait(&event)
    } else {
        exchange.submit(&event)
    };
    let submission = result.context("Submit failed")?;

    print_success(&format_submission(&submission));

    match &submission.reply {
        Some(reply) if json => println!("{}", serde_json::to_string_pretty(&event_json(reply))?),
        Some(reply) => println!("{}", format_event(reply)),
        None if submission.status == SubmitStatus::ReplyExpected && !wait => {
            print_info("Server will send a reply; use --wait to read it");
        }
        None => {}
    }

    Ok(())
}
