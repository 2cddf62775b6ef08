//! The graph mutation and query protocol.
//!
//! [`GraphService`] runs every operation against injected collaborators:
//!
//! - a [`GraphStore`] for persistence
//! - a [`ScopeResolver`] for the designated channel check
//! - a [`MembershipResolver`] for display names and departed users
//! - a [`StaticRenderer`] and an [`InteractiveRenderer`] for output
//! - an [`ObjectPublisher`] for shareable links
//!
//! Each operation re-reads the stored graph, so no state is cached between
//! operations and the service can be cloned freely into concurrent tasks.
//! Mutations go through [`GraphStore::merge_add`] and
//! [`GraphStore::remove_edge`], which the store applies atomically.
//!
//! Rendering and publishing happen after a mutation has been committed. A
//! failure there is reported through [`LinkOutcome::Failed`] and never undoes
//! the mutation.

use crate::confirm::{self, ConfirmationOutcome, DEFAULT_CONFIRM_TIMEOUT, ReplySource};
use crate::domain::{ChannelId, CommunityId, Edge, Scope, UserId};
use crate::error::{Error, Result};
use crate::graph::SocialGraph;
use crate::membership::MembershipResolver;
use crate::planner::{self, distinct_participants};
use crate::publish::ObjectPublisher;
use crate::render::{
    DotRenderer, HtmlRenderer, InteractiveRenderer, RenderAdapter, RenderOutcome, RenderedImage,
    StaticRenderer,
};
use crate::scope::{ChannelRegistry, ScopeResolver};
use crate::storage::GraphStore;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// The user an operation runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    /// Who issued the operation
    pub id: UserId,

    /// Whether they hold the community's administrator permission
    pub is_admin: bool,
}

/// Where and by whom an operation was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationContext {
    /// Community the operation targets
    pub community: CommunityId,

    /// Channel the operation was issued in
    pub channel: ChannelId,

    /// Issuer
    pub requester: Requester,
}

impl OperationContext {
    /// Create a context for a non-admin requester
    pub fn new(community: impl Into<CommunityId>, channel: impl Into<ChannelId>, requester: impl Into<UserId>) -> Self {
        Self {
            community: community.into(),
            channel: channel.into(),
            requester: Requester {
                id: requester.into(),
                is_admin: false,
            },
        }
    }

    /// Mark the requester as an administrator
    #[must_use]
    pub fn as_admin(mut self) -> Self {
        self.requester.is_admin = true;
        self
    }
}

/// Result of the interactive-link step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The page was published at this URL
    Published(String),

    /// Nothing to show after membership filtering
    NoData,

    /// Rendering or publishing failed; the reason is for logs and replies
    Failed(String),
}

/// Result of a connect request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Every pair was already connected; the store was not written
    AlreadyConnected,

    /// These edges were added
    Added(Vec<Edge>),
}

/// Connect outcome plus the link step that followed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectReport {
    /// What happened to the graph
    pub outcome: ConnectOutcome,

    /// Pairs that were already connected
    pub already_connected: Vec<Edge>,

    /// Interactive link for the updated graph
    pub link: LinkOutcome,
}

/// Result of a delete request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The edge was removed
    Removed(Edge),

    /// There was no such edge
    NotFound(Edge),
}

/// Delete outcome plus the link step that followed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    /// What happened to the graph
    pub outcome: DeleteOutcome,

    /// Interactive link for the updated graph
    pub link: LinkOutcome,
}

/// Result of a confirmed clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    /// Stored data was deleted
    Cleared,

    /// There was nothing stored for the scope
    NothingToClear,
}

/// Result of a static view request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewOutcome {
    /// The rendered artifact
    Image(RenderedImage),

    /// Nothing to show after membership filtering
    NoData,
}

/// A clear request whose scope has been resolved and which now awaits
/// confirmation.
#[derive(Debug, Clone)]
pub struct PendingClear {
    scope: Scope,
    requester: UserId,
    channel: ChannelId,
    timeout: Duration,
}

impl PendingClear {
    /// Scope that will be cleared
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// How long the confirmation stays open
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Service tunables.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Where interactive documents are written before publishing
    pub artifacts_dir: PathBuf,

    /// Confirmation window for clears
    pub confirm_timeout: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            artifacts_dir: std::env::temp_dir().join("rapport"),
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
        }
    }
}

/// Runs graph operations over shared collaborators.
#[derive(Clone)]
pub struct GraphService {
    store: Arc<dyn GraphStore>,
    scopes: ScopeResolver,
    members: Arc<dyn MembershipResolver>,
    static_renderer: Arc<dyn StaticRenderer>,
    interactive_renderer: Arc<dyn InteractiveRenderer>,
    publisher: Arc<dyn ObjectPublisher>,
    settings: ServiceSettings,
}

impl std::fmt::Debug for GraphService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphService")
            .field("store", &"<dyn GraphStore>")
            .field("scopes", &self.scopes)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl GraphService {
    /// Create a service with the DOT and HTML renderers and default settings.
    pub fn new(
        store: Arc<dyn GraphStore>,
        registry: Arc<dyn ChannelRegistry>,
        members: Arc<dyn MembershipResolver>,
        publisher: Arc<dyn ObjectPublisher>,
    ) -> Self {
        Self {
            store,
            scopes: ScopeResolver::new(registry),
            members,
            static_renderer: Arc::new(DotRenderer),
            interactive_renderer: Arc::new(HtmlRenderer::new()),
            publisher,
            settings: ServiceSettings::default(),
        }
    }

    /// Replace the static renderer
    #[must_use]
    pub fn with_static_renderer(mut self, renderer: Arc<dyn StaticRenderer>) -> Self {
        self.static_renderer = renderer;
        self
    }

    /// Replace the interactive renderer
    #[must_use]
    pub fn with_interactive_renderer(mut self, renderer: Arc<dyn InteractiveRenderer>) -> Self {
        self.interactive_renderer = renderer;
        self
    }

    /// Replace the settings
    #[must_use]
    pub fn with_settings(mut self, settings: ServiceSettings) -> Self {
        self.settings = settings;
        self
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Current settings
    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Resolve the scope an operation issued in `ctx` applies to.
    pub async fn resolve_scope(&self, ctx: &OperationContext) -> Result<Scope> {
        self.scopes.resolve(&ctx.community, &ctx.channel).await
    }

    /// Designate the context's channel for its community.
    pub async fn set_channel(&self, ctx: &OperationContext) -> Result<()> {
        self.scopes.designate(&ctx.community, &ctx.channel).await
    }

    /// Connect every pair of `participants`, then publish a fresh link.
    ///
    /// # Errors
    ///
    /// - `Error::NotConfigured` / `Error::WrongChannel` from scope resolution
    /// - `Error::InvalidRequest` for fewer than two distinct participants
    /// - store errors from loading or merging
    pub async fn connect(&self, ctx: &OperationContext, participants: &[UserId]) -> Result<ConnectReport> {
        let scope = self.resolve_scope(ctx).await?;
        let existing = self.store.load(&scope).await?.unwrap_or_default().edges;
        let plan = planner::plan_connections(participants, &existing)?;

        let outcome = if plan.is_noop() {
            tracing::info!(scope = %scope, "Participants already connected");
            ConnectOutcome::AlreadyConnected
        } else {
            let added: Vec<Edge> = plan.new_edges.iter().cloned().collect();
            self.store
                .merge_add(
                    &scope,
                    plan.new_nodes.into_iter().collect(),
                    added.clone(),
                )
                .await?;
            tracing::info!(scope = %scope, added = added.len(), "Connections added");
            ConnectOutcome::Added(added)
        };

        let link = self.link_after_mutation(&scope).await;
        Ok(ConnectReport {
            outcome,
            already_connected: plan.already_connected,
            link,
        })
    }

    /// Remove the connection between exactly two participants, then publish
    /// a fresh link.
    ///
    /// # Errors
    ///
    /// - `Error::NotConfigured` / `Error::WrongChannel` from scope resolution
    /// - `Error::InvalidRequest` unless there are exactly two distinct participants
    /// - store errors from the removal
    pub async fn delete(&self, ctx: &OperationContext, participants: &[UserId]) -> Result<DeleteReport> {
        let scope = self.resolve_scope(ctx).await?;

        let pair = distinct_participants(participants);
        let edge = match pair.as_slice() {
            [a, b] => Edge::new(a.clone(), b.clone()),
            _ => None,
        }
        .ok_or_else(|| {
            Error::InvalidRequest("exactly 2 distinct users are needed to delete a connection".to_string())
        })?;

        let outcome = if self.store.remove_edge(&scope, &edge).await? {
            tracing::info!(scope = %scope, edge = %edge, "Connection removed");
            DeleteOutcome::Removed(edge)
        } else {
            tracing::info!(scope = %scope, edge = %edge, "No connection to remove");
            DeleteOutcome::NotFound(edge)
        };

        let link = self.link_after_mutation(&scope).await;
        Ok(DeleteReport { outcome, link })
    }

    /// First half of a clear: resolve the scope so the caller can prompt.
    pub async fn begin_clear(&self, ctx: &OperationContext) -> Result<PendingClear> {
        let scope = self.resolve_scope(ctx).await?;
        Ok(PendingClear {
            scope,
            requester: ctx.requester.id.clone(),
            channel: ctx.channel.clone(),
            timeout: self.settings.confirm_timeout,
        })
    }

    /// Second half of a clear: wait for the requester's answer and clear on
    /// confirmation only.
    ///
    /// # Errors
    ///
    /// - `Error::ConfirmationTimeout` on timeout, cancellation or a closed stream
    /// - `Error::ConfirmationDeclined` for any other answer
    pub async fn finish_clear<R>(
        &self,
        pending: PendingClear,
        replies: &mut R,
        cancel: &CancellationToken,
    ) -> Result<ClearOutcome>
    where
        R: ReplySource + ?Sized,
    {
        let outcome = confirm::await_confirmation(
            replies,
            &pending.requester,
            &pending.channel,
            pending.timeout,
            cancel,
        )
        .await;

        match outcome {
            ConfirmationOutcome::Confirmed => {}
            ConfirmationOutcome::Declined => return Err(Error::ConfirmationDeclined),
            ConfirmationOutcome::TimedOut | ConfirmationOutcome::Aborted => {
                return Err(Error::ConfirmationTimeout);
            }
        }

        if self.store.clear(&pending.scope).await? {
            tracing::info!(scope = %pending.scope, "Graph cleared");
            Ok(ClearOutcome::Cleared)
        } else {
            Ok(ClearOutcome::NothingToClear)
        }
    }

    /// Resolve, confirm and clear in one call.
    pub async fn clear_graph<R>(
        &self,
        ctx: &OperationContext,
        replies: &mut R,
        cancel: &CancellationToken,
    ) -> Result<ClearOutcome>
    where
        R: ReplySource + ?Sized,
    {
        let pending = self.begin_clear(ctx).await?;
        self.finish_clear(pending, replies, cancel).await
    }

    /// Render the member-filtered graph with the static renderer.
    pub async fn view_graph(&self, ctx: &OperationContext) -> Result<ViewOutcome> {
        let scope = self.resolve_scope(ctx).await?;
        let RenderOutcome::View(view) = self.member_view(&scope).await? else {
            return Ok(ViewOutcome::NoData);
        };

        let name = self
            .members
            .community_name(&scope.community_id)
            .await?
            .unwrap_or_else(|| scope.community_id.to_string());
        let image = self
            .static_renderer
            .render(&view, &format!("Graph for {name}"))
            .await?;
        Ok(ViewOutcome::Image(image))
    }

    /// Render the member-filtered graph interactively and publish it.
    ///
    /// # Errors
    ///
    /// Returns `Error::UploadFailed` if publishing fails, next to the scope
    /// and store errors every operation can return.
    pub async fn share_link(&self, ctx: &OperationContext) -> Result<LinkOutcome> {
        let scope = self.resolve_scope(ctx).await?;
        Ok(match self.publish_link(&scope).await? {
            Some(url) => LinkOutcome::Published(url),
            None => LinkOutcome::NoData,
        })
    }

    async fn link_after_mutation(&self, scope: &Scope) -> LinkOutcome {
        match self.publish_link(scope).await {
            Ok(Some(url)) => LinkOutcome::Published(url),
            Ok(None) => LinkOutcome::NoData,
            Err(e) => {
                tracing::warn!(scope = %scope, error = %e, "Could not publish graph link");
                LinkOutcome::Failed(e.to_string())
            }
        }
    }

    async fn publish_link(&self, scope: &Scope) -> Result<Option<String>> {
        let RenderOutcome::View(view) = self.member_view(scope).await? else {
            return Ok(None);
        };

        let document = self
            .interactive_renderer
            .render(&view, &self.settings.artifacts_dir)
            .await?;
        let name = published_name(scope);
        let published = self.publisher.publish(&document, &name).await;

        if let Err(e) = tokio::fs::remove_file(&document).await {
            tracing::warn!(path = %document.display(), error = %e, "Could not remove rendered document");
        }
        published.map(Some)
    }

    async fn member_view(&self, scope: &Scope) -> Result<RenderOutcome> {
        let stored = self.store.load(scope).await?.unwrap_or_default();
        let graph = SocialGraph::from_stored(&stored);

        let mut labels: HashMap<UserId, String> = HashMap::with_capacity(graph.node_count());
        for user in graph.nodes() {
            if let Some(member) = self.members.resolve_member(&scope.community_id, &user).await? {
                labels.insert(user, member.display_name);
            }
        }

        let members_only = graph.filter_by_membership(|user| labels.contains_key(user));
        Ok(RenderAdapter::build(&members_only, |user| labels.get(user).cloned()))
    }
}

static PUBLISH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// `graph_<community>_<unix seconds>_<micros>_<seq>.html`, unique within a process.
fn published_name(scope: &Scope) -> String {
    let now = chrono::Utc::now();
    let seq = PUBLISH_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!(
        "graph_{}_{}_{:06}_{seq}.html",
        scope.community_id,
        now.timestamp(),
        now.timestamp_subsec_micros()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::Reply;
    use crate::membership::StaticDirectory;
    use crate::publish::DirectoryPublisher;
    use crate::scope::InMemoryChannelRegistry;
    use crate::storage::in_memory::new_in_memory_store;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    struct Fixture {
        service: GraphService,
        _temp_dir: TempDir,
    }

    async fn fixture(directory: StaticDirectory) -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let registry = Arc::new(InMemoryChannelRegistry::new());
        let service = GraphService::new(
            new_in_memory_store(),
            registry,
            Arc::new(directory),
            Arc::new(DirectoryPublisher::new(temp_dir.path().join("public"), "http://graphs.test")),
        )
        .with_settings(ServiceSettings {
            artifacts_dir: temp_dir.path().join("artifacts"),
            confirm_timeout: Duration::from_secs(30),
        });
        service.set_channel(&ctx()).await.unwrap();
        Fixture {
            service,
            _temp_dir: temp_dir,
        }
    }

    fn ctx() -> OperationContext {
        OperationContext::new("g", "main", "admin").as_admin()
    }

    fn users(ids: &[&str]) -> Vec<UserId> {
        ids.iter().map(|s| UserId::new(*s)).collect()
    }

    fn edge(a: &str, b: &str) -> Edge {
        Edge::new(UserId::new(a), UserId::new(b)).unwrap()
    }

    #[tokio::test]
    async fn test_connect_reports_added_and_publishes() {
        let fx = fixture(StaticDirectory::new()).await;

        let report = fx.service.connect(&ctx(), &users(&["1", "2", "3"])).await.unwrap();

        let ConnectOutcome::Added(added) = report.outcome else {
            panic!("expected Added");
        };
        assert_eq!(added.len(), 3);
        assert!(matches!(report.link, LinkOutcome::Published(ref url) if url.starts_with("http://graphs.test/graph_g_")));
    }

    #[test]
    fn test_published_names_are_distinct() {
        let scope = Scope::new("g", "main");
        let first = published_name(&scope);
        let second = published_name(&scope);

        assert_ne!(first, second);
        assert!(first.starts_with("graph_g_") && first.ends_with(".html"));
    }

    #[tokio::test]
    async fn test_connect_in_wrong_channel() {
        let fx = fixture(StaticDirectory::new()).await;
        let elsewhere = OperationContext::new("g", "random", "u");

        let result = fx.service.connect(&elsewhere, &users(&["1", "2"])).await;
        assert!(matches!(result, Err(Error::WrongChannel { .. })));
    }

    #[tokio::test]
    async fn test_delete_requires_exactly_two() {
        let fx = fixture(StaticDirectory::new()).await;

        for ids in [&["1"][..], &["1", "2", "3"], &["1", "1"]] {
            let result = fx.service.delete(&ctx(), &users(ids)).await;
            assert!(matches!(result, Err(Error::InvalidRequest(_))), "{ids:?}");
        }
    }

    #[tokio::test]
    async fn test_delete_present_then_absent() {
        let fx = fixture(StaticDirectory::new()).await;
        fx.service.connect(&ctx(), &users(&["1", "2"])).await.unwrap();

        let first = fx.service.delete(&ctx(), &users(&["2", "1"])).await.unwrap();
        assert_eq!(first.outcome, DeleteOutcome::Removed(edge("1", "2")));

        let second = fx.service.delete(&ctx(), &users(&["1", "2"])).await.unwrap();
        assert_eq!(second.outcome, DeleteOutcome::NotFound(edge("1", "2")));
    }

    #[tokio::test]
    async fn test_view_graph_uses_community_name_and_filters_members() {
        let mut directory = StaticDirectory::new();
        directory
            .set_community_name("g", "Book Club")
            .insert_member("g", "1", "Alice")
            .insert_member("g", "2", "Bob");
        let fx = fixture(directory).await;
        fx.service.connect(&ctx(), &users(&["1", "2", "3"])).await.unwrap();

        let ViewOutcome::Image(image) = fx.service.view_graph(&ctx()).await.unwrap() else {
            panic!("expected an image");
        };
        let dot = String::from_utf8(image.bytes).unwrap();
        assert!(dot.contains("Graph for Book Club"));
        assert!(dot.contains("Alice"));
        assert!(!dot.contains("\"3\""));
    }

    #[tokio::test]
    async fn test_view_graph_no_data() {
        let fx = fixture(StaticDirectory::new()).await;
        assert_eq!(fx.service.view_graph(&ctx()).await.unwrap(), ViewOutcome::NoData);
        assert_eq!(fx.service.share_link(&ctx()).await.unwrap(), LinkOutcome::NoData);
    }

    #[tokio::test]
    async fn test_share_link_removes_local_document() {
        let fx = fixture(StaticDirectory::new()).await;
        fx.service.connect(&ctx(), &users(&["1", "2"])).await.unwrap();

        fx.service.share_link(&ctx()).await.unwrap();

        let artifacts = &fx.service.settings().artifacts_dir;
        let leftover = std::fs::read_dir(artifacts).unwrap().count();
        assert_eq!(leftover, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_requires_requester_confirmation() {
        let fx = fixture(StaticDirectory::new()).await;
        fx.service.connect(&ctx(), &users(&["1", "2"])).await.unwrap();

        let (tx, mut rx) = mpsc::channel(4);
        tx.send(Reply::new("admin", "main", "no")).await.unwrap();
        let result = fx.service.clear_graph(&ctx(), &mut rx, &CancellationToken::new()).await;
        assert!(matches!(result, Err(Error::ConfirmationDeclined)));

        tx.send(Reply::new("admin", "main", "yes")).await.unwrap();
        let outcome = fx.service.clear_graph(&ctx(), &mut rx, &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, ClearOutcome::Cleared);

        tx.send(Reply::new("admin", "main", "YES")).await.unwrap();
        let outcome = fx.service.clear_graph(&ctx(), &mut rx, &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, ClearOutcome::NothingToClear);
    }
}
