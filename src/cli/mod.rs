//! CLI module for matapi
//!
//! Provides command-line interface for:
//! - serve: Seed collections and start the HTTP server
//! - indexes: Print the indexes each resource relies on

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{collect_indexes, indexes, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
