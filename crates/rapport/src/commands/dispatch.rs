//! Routing chat commands to the service and phrasing the answers.

use super::parse::{Command, mention, parse_command};
use crate::confirm::ReplySource;
use crate::domain::ChannelId;
use crate::error::{Error, Result};
use crate::render::RenderedImage;
use crate::service::{
    ClearOutcome, ConnectOutcome, DeleteOutcome, GraphService, LinkOutcome, OperationContext,
    ViewOutcome,
};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Reply text for unexpected failures.
pub const GENERIC_FAILURE: &str = "An error occurred while processing the command.";

/// Something the dispatcher posts back to the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// A text message
    Text(String),

    /// An attached artifact
    Image(RenderedImage),
}

impl Response {
    /// The text, if this is a text response
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Response::Text(text) => Some(text),
            Response::Image(_) => None,
        }
    }
}

/// Where responses are posted. Each response must be visible before the
/// dispatcher goes on, since a prompt is followed by a wait for replies.
#[async_trait]
pub trait Outbox: Send {
    /// Post one response.
    async fn post(&mut self, response: Response) -> Result<()>;
}

#[async_trait]
impl Outbox for Vec<Response> {
    async fn post(&mut self, response: Response) -> Result<()> {
        self.push(response);
        Ok(())
    }
}

/// Turns chat messages into service operations.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    service: GraphService,
    prefix: String,
}

impl Dispatcher {
    /// Create a dispatcher recognising commands that start with `prefix`.
    pub fn new(service: GraphService, prefix: impl Into<String>) -> Self {
        Self {
            service,
            prefix: prefix.into(),
        }
    }

    /// The wrapped service
    pub fn service(&self) -> &GraphService {
        &self.service
    }

    /// Handle one message.
    ///
    /// Returns `Ok(false)` if `text` is not a command. Operation failures are
    /// turned into responses; only a failing outbox is returned as an error.
    pub async fn dispatch<R, O>(
        &self,
        ctx: &OperationContext,
        text: &str,
        replies: &mut R,
        outbox: &mut O,
        cancel: &CancellationToken,
    ) -> Result<bool>
    where
        R: ReplySource + ?Sized,
        O: Outbox + ?Sized,
    {
        let Some(command) = parse_command(text, &self.prefix) else {
            return Ok(false);
        };
        tracing::debug!(command = command.name(), requester = %ctx.requester.id, "Dispatching command");

        if command.requires_admin() && !ctx.requester.is_admin {
            tracing::info!(command = command.name(), requester = %ctx.requester.id, "Permission denied");
            outbox
                .post(Response::Text(self.error_text(&command, &Error::PermissionDenied("Administrator"))))
                .await?;
            return Ok(true);
        }

        if let Err(e) = self.run(&command, ctx, replies, outbox, cancel).await {
            if !e.is_user_facing() {
                tracing::error!(command = command.name(), error = %e, "Command failed");
            }
            outbox.post(Response::Text(self.error_text(&command, &e))).await?;
        }
        Ok(true)
    }

    async fn run<R, O>(
        &self,
        command: &Command,
        ctx: &OperationContext,
        replies: &mut R,
        outbox: &mut O,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        R: ReplySource + ?Sized,
        O: Outbox + ?Sized,
    {
        match command {
            Command::Hello => outbox.post(text("Hello!")).await,

            Command::SetChannel => {
                self.service.set_channel(ctx).await?;
                outbox
                    .post(text(format!(
                        "This channel ({}) has been set as the designated channel for tracking pings and graph data.",
                        channel_mention(&ctx.channel)
                    )))
                    .await
            }

            Command::Graph => match self.service.view_graph(ctx).await? {
                ViewOutcome::Image(image) => outbox.post(Response::Image(image)).await,
                ViewOutcome::NoData => outbox.post(text("No graph data available for this server yet!")).await,
            },

            Command::Connect(users) => {
                let report = self.service.connect(ctx, users).await?;
                let message = match report.outcome {
                    ConnectOutcome::AlreadyConnected => "These users are already connected.",
                    ConnectOutcome::Added(_) => "New connections added between the mentioned users.",
                };
                outbox.post(text(message)).await?;
                outbox.post(link_text(&report.link, "Here is your interactive graph")).await
            }

            Command::Delete(users) => {
                let report = self.service.delete(ctx, users).await?;
                let message = match &report.outcome {
                    DeleteOutcome::Removed(edge) => format!(
                        "Connection between {} and {} has been deleted.",
                        mention(edge.low()),
                        mention(edge.high())
                    ),
                    DeleteOutcome::NotFound(_) => {
                        "No connection between the mentioned users was found.".to_string()
                    }
                };
                outbox.post(text(message)).await?;
                outbox
                    .post(link_text(&report.link, "Here is your updated interactive graph"))
                    .await
            }

            Command::ClearGraph => {
                let pending = self.service.begin_clear(ctx).await?;
                outbox
                    .post(text(format!(
                        "Are you sure you want to clear the graph data? Type `yes` to confirm. (This will timeout in {} seconds)",
                        pending.timeout().as_secs()
                    )))
                    .await?;
                let message = match self.service.finish_clear(pending, replies, cancel).await? {
                    ClearOutcome::Cleared => "Graph data cleared.",
                    ClearOutcome::NothingToClear => "No graph data to clear.",
                };
                outbox.post(text(message)).await
            }

            Command::Link => {
                let message = match self.service.share_link(ctx).await? {
                    LinkOutcome::Published(url) => format!("Here is your interactive graph: {url}"),
                    LinkOutcome::NoData => "No graph data available for this server yet!".to_string(),
                    LinkOutcome::Failed(_) => "Failed to upload the graph.".to_string(),
                };
                outbox.post(text(message)).await
            }
        }
    }

    fn error_text(&self, command: &Command, error: &Error) -> String {
        match error {
            Error::NotConfigured if matches!(command, Command::ClearGraph) => {
                "The tracking channel has not been set up yet.".to_string()
            }
            Error::NotConfigured => format!(
                "The tracking channel has not been set up yet. Please run `{}setchannel` in the channel you wish to use.",
                self.prefix
            ),
            Error::WrongChannel { .. } => {
                "This command can only be used in the designated tracking channel.".to_string()
            }
            Error::InvalidRequest(_) => match command {
                Command::Delete(_) => {
                    "Error: You must mention exactly two users to delete a connection.".to_string()
                }
                _ => "Error: You must mention at least two users to create connections.".to_string(),
            },
            Error::PermissionDenied(permission) => format!(
                "You do not have permission to use this command. ({permission} permission required)"
            ),
            Error::UploadFailed(_) => "Failed to upload the graph.".to_string(),
            Error::ConfirmationTimeout => "Confirmation timed out. Graph data was not cleared.".to_string(),
            Error::ConfirmationDeclined => "Graph data clearing cancelled.".to_string(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

fn text(message: impl Into<String>) -> Response {
    Response::Text(message.into())
}

fn link_text(link: &LinkOutcome, lead: &str) -> Response {
    match link {
        LinkOutcome::Published(url) => text(format!("{lead}: {url}")),
        LinkOutcome::NoData => text("No graph data available for this server!"),
        LinkOutcome::Failed(_) => text("Failed to upload the graph."),
    }
}

fn channel_mention(channel: &ChannelId) -> String {
    format!("<#{channel}>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::Reply;
    use crate::membership::StaticDirectory;
    use crate::publish::DirectoryPublisher;
    use crate::scope::InMemoryChannelRegistry;
    use crate::service::ServiceSettings;
    use crate::storage::{MockStore, in_memory::new_in_memory_store};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    fn dispatcher(temp_dir: &TempDir) -> Dispatcher {
        let service = GraphService::new(
            new_in_memory_store(),
            Arc::new(InMemoryChannelRegistry::new()),
            Arc::new(StaticDirectory::new()),
            Arc::new(DirectoryPublisher::new(temp_dir.path().join("public"), "http://graphs.test")),
        )
        .with_settings(ServiceSettings {
            artifacts_dir: temp_dir.path().join("artifacts"),
            confirm_timeout: Duration::from_secs(30),
        });
        Dispatcher::new(service, "-")
    }

    fn admin() -> OperationContext {
        OperationContext::new("g", "main", "admin").as_admin()
    }

    async fn say(dispatcher: &Dispatcher, ctx: &OperationContext, message: &str) -> Vec<String> {
        let (_tx, mut rx) = mpsc::channel::<Reply>(1);
        let mut outbox = Vec::new();
        dispatcher
            .dispatch(ctx, message, &mut rx, &mut outbox, &CancellationToken::new())
            .await
            .unwrap();
        outbox
            .iter()
            .map(|r| r.as_text().unwrap_or("<image>").to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_non_command_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let dispatcher = dispatcher(&temp_dir);
        let (_tx, mut rx) = mpsc::channel::<Reply>(1);
        let mut outbox = Vec::new();

        let handled = dispatcher
            .dispatch(&admin(), "just chatting", &mut rx, &mut outbox, &CancellationToken::new())
            .await
            .unwrap();
        assert!(!handled);
        assert!(outbox.is_empty());
    }

    #[tokio::test]
    async fn test_admin_gating() {
        let temp_dir = TempDir::new().unwrap();
        let dispatcher = dispatcher(&temp_dir);
        let member = OperationContext::new("g", "main", "someone");

        for command in ["-setchannel", "-cleargraph"] {
            let out = say(&dispatcher, &member, command).await;
            assert_eq!(
                out,
                vec!["You do not have permission to use this command. (Administrator permission required)"]
            );
        }
    }

    #[tokio::test]
    async fn test_unconfigured_community() {
        let temp_dir = TempDir::new().unwrap();
        let dispatcher = dispatcher(&temp_dir);

        let out = say(&dispatcher, &admin(), "-graph").await;
        assert_eq!(
            out,
            vec!["The tracking channel has not been set up yet. Please run `-setchannel` in the channel you wish to use."]
        );
    }

    #[tokio::test]
    async fn test_connect_flow() {
        let temp_dir = TempDir::new().unwrap();
        let dispatcher = dispatcher(&temp_dir);
        say(&dispatcher, &admin(), "-setchannel").await;

        let out = say(&dispatcher, &admin(), "-connect <@1> <@2>").await;
        assert_eq!(out[0], "New connections added between the mentioned users.");
        assert!(out[1].starts_with("Here is your interactive graph: http://graphs.test/graph_g_"));

        let out = say(&dispatcher, &admin(), "-connect <@2> <@1>").await;
        assert_eq!(out[0], "These users are already connected.");

        let out = say(&dispatcher, &admin(), "-connect <@1>").await;
        assert_eq!(out, vec!["Error: You must mention at least two users to create connections."]);
    }

    #[tokio::test]
    async fn test_delete_flow() {
        let temp_dir = TempDir::new().unwrap();
        let dispatcher = dispatcher(&temp_dir);
        say(&dispatcher, &admin(), "-setchannel").await;
        say(&dispatcher, &admin(), "-connect <@1> <@2>").await;

        let out = say(&dispatcher, &admin(), "-delete <@2> <@1>").await;
        assert_eq!(out[0], "Connection between <@1> and <@2> has been deleted.");
        assert!(out[1].starts_with("Here is your updated interactive graph: "));

        let out = say(&dispatcher, &admin(), "-delete <@1> <@2>").await;
        assert_eq!(out[0], "No connection between the mentioned users was found.");

        let out = say(&dispatcher, &admin(), "-delete <@1> <@2> <@3>").await;
        assert_eq!(out, vec!["Error: You must mention exactly two users to delete a connection."]);
    }

    #[tokio::test]
    async fn test_wrong_channel() {
        let temp_dir = TempDir::new().unwrap();
        let dispatcher = dispatcher(&temp_dir);
        say(&dispatcher, &admin(), "-setchannel").await;

        let elsewhere = OperationContext::new("g", "offtopic", "u");
        let out = say(&dispatcher, &elsewhere, "-link").await;
        assert_eq!(out, vec!["This command can only be used in the designated tracking channel."]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleargraph_prompt_then_timeout() {
        let temp_dir = TempDir::new().unwrap();
        let dispatcher = dispatcher(&temp_dir);
        say(&dispatcher, &admin(), "-setchannel").await;
        say(&dispatcher, &admin(), "-connect <@1> <@2>").await;

        let out = say(&dispatcher, &admin(), "-cleargraph").await;
        assert_eq!(
            out,
            vec![
                "Are you sure you want to clear the graph data? Type `yes` to confirm. (This will timeout in 30 seconds)",
                "Confirmation timed out. Graph data was not cleared.",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleargraph_confirmed() {
        let temp_dir = TempDir::new().unwrap();
        let dispatcher = dispatcher(&temp_dir);
        say(&dispatcher, &admin(), "-setchannel").await;
        say(&dispatcher, &admin(), "-connect <@1> <@2>").await;

        let (tx, mut rx) = mpsc::channel(4);
        tx.send(Reply::new("admin", "main", " yes ")).await.unwrap();
        let mut outbox = Vec::new();
        dispatcher
            .dispatch(&admin(), "-cleargraph", &mut rx, &mut outbox, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outbox.last().and_then(Response::as_text), Some("Graph data cleared."));
        let out = say(&dispatcher, &admin(), "-graph").await;
        assert_eq!(out, vec!["No graph data available for this server yet!"]);
    }

    #[tokio::test]
    async fn test_graph_posts_image() {
        let temp_dir = TempDir::new().unwrap();
        let dispatcher = dispatcher(&temp_dir);
        say(&dispatcher, &admin(), "-setchannel").await;
        say(&dispatcher, &admin(), "-connect <@1> <@2>").await;

        let out = say(&dispatcher, &admin(), "-graph").await;
        assert_eq!(out, vec!["<image>"]);
    }

    #[tokio::test]
    async fn test_store_failure_is_generic() {
        let temp_dir = TempDir::new().unwrap();
        let registry = Arc::new(InMemoryChannelRegistry::new());
        let service = GraphService::new(
            Arc::new(MockStore::new()),
            registry,
            Arc::new(StaticDirectory::new()),
            Arc::new(DirectoryPublisher::new(temp_dir.path(), "http://graphs.test")),
        );
        let dispatcher = Dispatcher::new(service, "-");
        say(&dispatcher, &admin(), "-setchannel").await;

        let out = say(&dispatcher, &admin(), "-connect <@1> <@2>").await;
        assert_eq!(out, vec![GENERIC_FAILURE]);
    }
}
