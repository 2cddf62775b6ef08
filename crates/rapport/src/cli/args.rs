//! CLI argument structs for all commands.
//!
//! Each command has its own argument struct with clap derive attributes
//! for parsing and validation.

use clap::Parser;
use std::path::PathBuf;

use super::validators::{validate_base_url, validate_id, validate_message};

/// Arguments for the `init` command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Public URL the publish directory is served under
    ///
    /// Published graph links are formed as `<base-url>/<file name>`.
    #[arg(long, value_parser = validate_base_url)]
    pub base_url: Option<String>,

    /// Suppress output messages
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug, Clone)]
pub struct InfoArgs {}

/// Arguments for the `connect` command
#[derive(Parser, Debug, Clone)]
pub struct ConnectArgs {
    /// Users to connect with each other (at least two)
    #[arg(required = true, num_args = 1.., value_parser = validate_id)]
    pub users: Vec<String>,
}

/// Arguments for the `delete` command
#[derive(Parser, Debug, Clone)]
pub struct DeleteArgs {
    /// First user of the connection
    #[arg(value_parser = validate_id)]
    pub first: String,

    /// Second user of the connection
    #[arg(value_parser = validate_id)]
    pub second: String,
}

/// Arguments for the `graph` command
#[derive(Parser, Debug, Clone)]
pub struct GraphArgs {
    /// Where to write the rendered graph (defaults to `graph.dot` in the
    /// current directory)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Arguments for the `clear-graph` command
#[derive(Parser, Debug, Clone)]
pub struct ClearGraphArgs {
    /// Answer the confirmation prompt with `yes` without reading stdin
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the `say` command
#[derive(Parser, Debug, Clone)]
pub struct SayArgs {
    /// Chat message, e.g. `-connect <@1> <@2>`
    #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    pub words: Vec<String>,
}

impl SayArgs {
    /// The message as typed in a chat
    pub fn message(&self) -> Result<String, String> {
        validate_message(&self.words.join(" "))
    }
}
