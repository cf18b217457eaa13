//! Frame file commands

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use txp_protocol::{encode_event, load_event, read_event};

use super::args::EventArgs;
use crate::output::{event_json, format_event, print_success};

/// Encode an event built from flags; writes to `output` or raw to stdout
pub fn encode_command(event_args: &EventArgs, output: Option<&Path>) -> Result<()> {
    let event = event_args.build()?;
    let frame = encode_event(&event).context("Failed to encode event")?;

    match output {
        Some(path) => {
            std::fs::write(path, &frame)
                .with_context(|| format!("Failed to write frame to {:?}", path))?;
            print_success(&format!("Wrote {} bytes to {:?}", frame.len(), path));
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&frame)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Decode a frame from a file, or from stdin when `input` is `-`
pub fn decode_command(input: &Path, json: bool) -> Result<()> {
    let event = if input == Path::new("-") {
        read_event(&mut io::stdin().lock()).context("Failed to decode frame from stdin")?
    } else {
        load_event(input).with_context(|| format!("Failed to decode frame from {:?}", input))?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&event_json(&event))?);
    } else {
        println!("{}", event);
        println!("{}", format_event(&event));
    }
    Ok(())
}
