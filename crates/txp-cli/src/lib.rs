//! txproc: Command-line client for txProc servers
//!
//! Builds events from flags, submits them over the configured transport and
//! inspects frame files.

pub mod commands;
pub mod output;
