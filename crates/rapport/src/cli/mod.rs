//! CLI argument parsing and command dispatch.
//!
//! This module provides the command-line interface for rapport using clap's
//! derive API. The CLI stands in for a chat platform: the global flags say
//! which community and channel a command is issued in, and by whom.
//!
//! # Commands
//!
//! - `init`: Initialize a new rapport workspace
//! - `info`: Show workspace information and stored graphs
//! - `set-channel`: Designate the current channel (admin)
//! - `connect`: Connect every given user with each other
//! - `delete`: Remove the connection between two users
//! - `graph`: Write the static graph to a file
//! - `link`: Publish the interactive graph and print its URL
//! - `clear-graph`: Clear the graph after confirmation (admin)
//! - `say`: Handle a raw chat message such as `-connect <@1> <@2>`
//!
//! # Global Flags
//!
//! - `--community`, `--channel`, `--user`: where and by whom
//! - `--admin`: the user holds the administrator permission
//! - `--json`: Output in JSON format (applies to all commands)
//!
//! # Example
//!
//! ```bash
//! rapport init --base-url https://graphs.example.org
//! rapport --admin set-channel
//! rapport connect 1001 1002 1003
//! rapport delete 1001 1003
//! rapport link
//! rapport say -- -connect "<@1001>" "<@1004>"
//! ```

mod args;
mod execute;
mod validators;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::service::OperationContext;

// Re-export argument structs
pub use args::{ClearGraphArgs, ConnectArgs, DeleteArgs, GraphArgs, InfoArgs, InitArgs, SayArgs};

// Re-export validators for external use
pub use validators::{validate_base_url, validate_id, validate_message};

pub use execute::StdinReplies;

/// Rapport - community relationship graphs
///
/// Record who is connected to whom in a community, then render the graph as
/// Graphviz DOT or publish it as an interactive page.
#[derive(Parser, Debug)]
#[command(name = "rapport")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Community the command is issued in
    #[arg(long, global = true, default_value = "local", value_parser = validate_id)]
    pub community: String,

    /// Channel the command is issued in
    #[arg(long, global = true, default_value = "main", value_parser = validate_id)]
    pub channel: String,

    /// User issuing the command
    #[arg(long, global = true, default_value = "cli", value_parser = validate_id)]
    pub user: String,

    /// Issue the command with administrator permission
    #[arg(long, global = true)]
    pub admin: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize a new rapport workspace
    ///
    /// Creates the `.rapport/` directory with configuration, an empty graph
    /// file, a channel registry and a member roster template.
    Init(InitArgs),

    /// Show workspace information
    ///
    /// Displays the data file, base URL and node/edge counts of every stored
    /// graph.
    Info(InfoArgs),

    /// Designate the current channel for graph operations
    ///
    /// Requires `--admin`. Re-designating starts a fresh graph; the old one
    /// stays in storage.
    SetChannel,

    /// Connect every given user with each other
    ///
    /// Pairs that are already connected are left alone. Publishes a fresh
    /// interactive link afterwards.
    Connect(ConnectArgs),

    /// Remove the connection between two users
    ///
    /// Users stay in the graph. Publishes a fresh interactive link afterwards.
    Delete(DeleteArgs),

    /// Render the graph as Graphviz DOT
    ///
    /// Users no longer listed in the member roster are left out.
    Graph(GraphArgs),

    /// Publish the interactive graph and print its URL
    Link,

    /// Clear the graph after confirmation
    ///
    /// Requires `--admin`. Type `yes` on stdin to confirm.
    ClearGraph(ClearGraphArgs),

    /// Handle a raw chat message
    ///
    /// Runs the message through the same command parser and replies a chat
    /// integration would use. Confirmation replies are read from stdin.
    Say(SayArgs),
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// The operation context described by the global flags
    pub fn context(&self) -> OperationContext {
        let ctx = OperationContext::new(
            self.community.as_str(),
            self.channel.as_str(),
            self.user.as_str(),
        );
        if self.admin { ctx.as_admin() } else { ctx }
    }

    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        use crate::output::OutputMode;

        let output_mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };
        let ctx = self.context();

        match &self.command {
            Some(Commands::Init(args)) => execute::execute_init(args).await,
            Some(Commands::Info(args)) => execute::execute_info(&open_app().await?, args, output_mode).await,
            Some(Commands::SetChannel) => {
                execute::execute_set_channel(&open_app().await?, &ctx, output_mode).await
            }
            Some(Commands::Connect(args)) => {
                execute::execute_connect(&open_app().await?, &ctx, args, output_mode).await
            }
            Some(Commands::Delete(args)) => {
                execute::execute_delete(&open_app().await?, &ctx, args, output_mode).await
            }
            Some(Commands::Graph(args)) => {
                execute::execute_graph(&open_app().await?, &ctx, args, output_mode).await
            }
            Some(Commands::Link) => execute::execute_link(&open_app().await?, &ctx, output_mode).await,
            Some(Commands::ClearGraph(args)) => {
                execute::execute_clear_graph(&open_app().await?, &ctx, args, output_mode).await
            }
            Some(Commands::Say(args)) => execute::execute_say(&open_app().await?, &ctx, args, output_mode).await,
            None => {
                println!("Rapport community relationship graphs");
                println!("Use --help for more information");
                Ok(())
            }
        }
    }
}

/// Open the workspace containing the current directory.
async fn open_app() -> Result<crate::app::App> {
    Ok(crate::app::App::from_directory(&std::env::current_dir()?).await?)
}
