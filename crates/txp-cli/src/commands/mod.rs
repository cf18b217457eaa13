//! CLI command implementations

mod args;
mod config;
mod frame;
mod submit;

pub use args::{DestinationArgs, EventArgs};
pub use config::{config_init, config_show, resolve_config_path};
pub use frame::{decode_command, encode_command};
pub use submit::submit_command;
