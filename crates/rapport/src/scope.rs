//! Which graph applies to a (community, channel) context.
//!
//! Each community designates one channel for graph operations. The designation
//! lives in a [`ChannelRegistry`]; [`ScopeResolver`] turns a context into a
//! [`Scope`] or explains why it can't.

use crate::domain::{ChannelId, CommunityId, Scope};
use crate::error::{Error, Result};
use crate::storage::lock::FileLock;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Stores each community's designated channel.
#[async_trait]
pub trait ChannelRegistry: Send + Sync {
    /// The designated channel of `community`, if one has been set.
    async fn designated_channel(&self, community: &CommunityId) -> Result<Option<ChannelId>>;

    /// Designate `channel` for `community`, replacing any earlier choice.
    async fn set_designated_channel(&self, community: &CommunityId, channel: &ChannelId) -> Result<()>;
}

/// Registry held in memory only.
#[derive(Debug, Clone, Default)]
pub struct InMemoryChannelRegistry {
    channels: Arc<RwLock<BTreeMap<CommunityId, ChannelId>>>,
}

impl InMemoryChannelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChannelRegistry for InMemoryChannelRegistry {
    async fn designated_channel(&self, community: &CommunityId) -> Result<Option<ChannelId>> {
        Ok(self.channels.read().await.get(community).cloned())
    }

    async fn set_designated_channel(&self, community: &CommunityId, channel: &ChannelId) -> Result<()> {
        self.channels
            .write()
            .await
            .insert(community.clone(), channel.clone());
        Ok(())
    }
}

/// Registry persisted as a YAML map of community to channel.
///
/// Nothing is cached: every call reads the file under a [`FileLock`], so
/// several handles on one file agree. A change re-reads the map under the
/// exclusive lock and rewrites it through a temporary file and a rename.
#[derive(Debug)]
pub struct FileChannelRegistry {
    path: PathBuf,
}

type ChannelMap = BTreeMap<CommunityId, ChannelId>;

impl FileChannelRegistry {
    /// Open the registry at `path`. A missing file is an empty registry.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file exists but is not a valid map.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let registry = Self { path: path.into() };
        registry.read_channels().await?;
        Ok(registry)
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_channels(&self) -> Result<ChannelMap> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(BTreeMap::new());
        }
        let _lock = FileLock::shared(&self.path).await?;
        self.load_unlocked().await
    }

    async fn load_unlocked(&self) -> Result<ChannelMap> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_yaml::from_str(&content).map_err(|e| Error::Config(format!("{}: {e}", self.path.display())))
    }

    async fn persist(&self, channels: &ChannelMap) -> Result<()> {
        let content = serde_yaml::to_string(channels).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        let temp_path = self.path.with_extension("yaml.tmp");
        tokio::fs::write(&temp_path, content).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl ChannelRegistry for FileChannelRegistry {
    async fn designated_channel(&self, community: &CommunityId) -> Result<Option<ChannelId>> {
        Ok(self.read_channels().await?.remove(community))
    }

    async fn set_designated_channel(&self, community: &CommunityId, channel: &ChannelId) -> Result<()> {
        let _lock = FileLock::exclusive(&self.path).await?;
        let mut channels = self.load_unlocked().await?;

        if channels.get(community) == Some(channel) {
            return Ok(());
        }
        channels.insert(community.clone(), channel.clone());
        self.persist(&channels).await
    }
}

/// Resolves contexts to scopes through a [`ChannelRegistry`].
#[derive(Clone)]
pub struct ScopeResolver {
    registry: Arc<dyn ChannelRegistry>,
}

impl ScopeResolver {
    /// Create a resolver over `registry`
    pub fn new(registry: Arc<dyn ChannelRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve the scope for an operation issued in `channel` of `community`.
    ///
    /// # Errors
    ///
    /// - `Error::NotConfigured` if the community has no designated channel
    /// - `Error::WrongChannel` if `channel` is not the designated one
    pub async fn resolve(&self, community: &CommunityId, channel: &ChannelId) -> Result<Scope> {
        let designated = self
            .registry
            .designated_channel(community)
            .await?
            .ok_or(Error::NotConfigured)?;

        if &designated != channel {
            return Err(Error::WrongChannel {
                expected: designated,
            });
        }
        Ok(Scope {
            community_id: community.clone(),
            channel_id: designated,
        })
    }

    /// Make `channel` the designated channel of `community`.
    pub async fn designate(&self, community: &CommunityId, channel: &ChannelId) -> Result<()> {
        self.registry.set_designated_channel(community, channel).await?;
        tracing::info!(community = %community, channel = %channel, "Designated channel set");
        Ok(())
    }
}

impl std::fmt::Debug for ScopeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeResolver")
            .field("registry", &"<dyn ChannelRegistry>")
            .finish()
    }
}
