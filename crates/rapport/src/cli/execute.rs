//! Command execution logic.
//!
//! This module contains the implementation of all CLI commands.

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::args::{ClearGraphArgs, ConnectArgs, DeleteArgs, GraphArgs, InfoArgs, InitArgs, SayArgs};
use crate::app::App;
use crate::commands::{Outbox, Response};
use crate::confirm::{AFFIRMATIVE, Reply, ReplySource};
use crate::domain::{ChannelId, UserId};
use crate::error::Error;
use crate::output::{self, OutputMode};
use crate::service::{OperationContext, ViewOutcome};

/// Confirmation replies typed on stdin, attributed to the CLI user.
pub struct StdinReplies {
    author: UserId,
    channel: ChannelId,
    lines: Lines<BufReader<Stdin>>,
}

impl StdinReplies {
    /// Read replies from stdin as `author` speaking in `channel`.
    pub fn new(author: UserId, channel: ChannelId) -> Self {
        Self {
            author,
            channel,
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

#[async_trait]
impl ReplySource for StdinReplies {
    async fn next_reply(&mut self) -> Option<Reply> {
        match self.lines.next_line().await {
            Ok(Some(line)) => Some(Reply::new(self.author.clone(), self.channel.clone(), line)),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read reply from stdin");
                None
            }
        }
    }
}

/// Prints dispatcher responses as they are posted.
struct StdoutOutbox {
    mode: OutputMode,
}

#[async_trait]
impl Outbox for StdoutOutbox {
    async fn post(&mut self, response: Response) -> crate::error::Result<()> {
        output::print_response(&response, self.mode)?;
        Ok(())
    }
}

/// A token cancelled when the user presses Ctrl-C.
fn interrupt_token() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("Interrupted");
            child.cancel();
        }
    });
    token
}

fn require_admin(ctx: &OperationContext) -> Result<()> {
    if ctx.requester.is_admin {
        Ok(())
    } else {
        Err(Error::PermissionDenied("Administrator").into())
    }
}

/// Execute the init command
pub async fn execute_init(args: &InitArgs) -> Result<()> {
    use crate::commands::init;

    let current_dir = std::env::current_dir()?;

    if !args.quiet {
        println!("Initializing rapport workspace...");
    }

    let result = init::init(&current_dir, args.base_url.as_deref()).await?;

    if !args.quiet {
        println!("Initialized rapport in {}", result.rapport_dir.display());
        println!("  Config:   {}", result.config_file.display());
        println!("  Graphs:   {}", result.graphs_file.display());
        println!("  Channels: {}", result.channels_file.display());
        println!("  Members:  {}", result.members_file.display());
        println!("  Base URL: {}", result.base_url);
    }

    Ok(())
}

/// Execute the info command
pub async fn execute_info(app: &App, _args: &InfoArgs, output_mode: OutputMode) -> Result<()> {
    let summary = app.summary().await?;
    output::print_info(&summary, output_mode)?;
    Ok(())
}

/// Execute the set-channel command
pub async fn execute_set_channel(app: &App, ctx: &OperationContext, output_mode: OutputMode) -> Result<()> {
    require_admin(ctx)?;
    app.service().set_channel(ctx).await?;

    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({
            "status": "designated",
            "community": ctx.community,
            "channel": ctx.channel,
        }))?,
        OutputMode::Text => output::print_message(&format!(
            "Channel {} is now the tracking channel for {}",
            ctx.channel, ctx.community
        ))?,
    }
    Ok(())
}

/// Execute the connect command
pub async fn execute_connect(
    app: &App,
    ctx: &OperationContext,
    args: &ConnectArgs,
    output_mode: OutputMode,
) -> Result<()> {
    let users: Vec<UserId> = args.users.iter().map(UserId::new).collect();
    let report = app.service().connect(ctx, &users).await?;
    output::print_connect(&report, output_mode)?;
    Ok(())
}

/// Execute the delete command
pub async fn execute_delete(
    app: &App,
    ctx: &OperationContext,
    args: &DeleteArgs,
    output_mode: OutputMode,
) -> Result<()> {
    let users = [UserId::new(&args.first), UserId::new(&args.second)];
    let report = app.service().delete(ctx, &users).await?;
    output::print_delete(&report, output_mode)?;
    Ok(())
}

/// Execute the graph command
pub async fn execute_graph(
    app: &App,
    ctx: &OperationContext,
    args: &GraphArgs,
    output_mode: OutputMode,
) -> Result<()> {
    match app.service().view_graph(ctx).await? {
        ViewOutcome::Image(image) => {
            let path = args
                .out
                .clone()
                .unwrap_or_else(|| PathBuf::from(&image.file_name));
            tokio::fs::write(&path, &image.bytes).await?;
            output::print_view(Some((&path, image.media_type)), output_mode)?;
        }
        ViewOutcome::NoData => output::print_view(None, output_mode)?,
    }
    Ok(())
}

/// Execute the link command
pub async fn execute_link(app: &App, ctx: &OperationContext, output_mode: OutputMode) -> Result<()> {
    let link = app.service().share_link(ctx).await?;
    output::print_link(&link, output_mode)?;
    Ok(())
}

/// Execute the clear-graph command
pub async fn execute_clear_graph(
    app: &App,
    ctx: &OperationContext,
    args: &ClearGraphArgs,
    output_mode: OutputMode,
) -> Result<()> {
    require_admin(ctx)?;
    let service = app.service();
    let pending = service.begin_clear(ctx).await?;
    let cancel = interrupt_token();

    let outcome = if args.yes {
        let (tx, mut rx) = mpsc::channel(1);
        tx.send(Reply::new(ctx.requester.id.clone(), ctx.channel.clone(), AFFIRMATIVE))
            .await?;
        service.finish_clear(pending, &mut rx, &cancel).await?
    } else {
        let prompt = format!(
            "Clear the graph for {}? Type '{AFFIRMATIVE}' to confirm (times out in {} seconds)",
            pending.scope(),
            pending.timeout().as_secs()
        );
        // Keep stdout parseable in JSON mode.
        match output_mode {
            OutputMode::Json => eprintln!("{prompt}"),
            OutputMode::Text => output::print_message(&prompt)?,
        }
        let mut replies = StdinReplies::new(ctx.requester.id.clone(), ctx.channel.clone());
        service.finish_clear(pending, &mut replies, &cancel).await?
    };

    output::print_clear(outcome, output_mode)?;
    Ok(())
}

/// Execute the say command
pub async fn execute_say(app: &App, ctx: &OperationContext, args: &SayArgs, output_mode: OutputMode) -> Result<()> {
    let text = args.message().map_err(anyhow::Error::msg)?;
    let dispatcher = app.dispatcher();
    let mut replies = StdinReplies::new(ctx.requester.id.clone(), ctx.channel.clone());
    let mut outbox = StdoutOutbox { mode: output_mode };
    let cancel = interrupt_token();

    let handled = dispatcher
        .dispatch(ctx, &text, &mut replies, &mut outbox, &cancel)
        .await?;
    if !handled {
        tracing::debug!(text = %text, "Message is not a command");
        if output_mode == OutputMode::Json {
            output::print_json(&serde_json::json!({ "status": "ignored" }))?;
        }
    }
    Ok(())
}
