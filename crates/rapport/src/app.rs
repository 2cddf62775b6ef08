//! Application context for CLI command execution.
//!
//! This module provides the `App` struct that discovers a workspace, loads its
//! configuration and wires the concrete collaborators behind a
//! [`GraphService`].
//!
//! # Example
//!
//! ```no_run
//! use rapport::app::App;
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::from_directory(Path::new(".")).await?;
//!     let summary = app.summary().await?;
//!     println!("{} graph(s)", summary.scopes.len());
//!     Ok(())
//! }
//! ```

use crate::commands::Dispatcher;
use crate::commands::init::find_rapport_root;
use crate::config::{CONFIG_FILE_NAME, RAPPORT_DIR_NAME, RapportConfig, resolve_path};
use crate::error::{Error, Result};
use crate::membership::StaticDirectory;
use crate::output::{ScopeSummary, WorkspaceSummary};
use crate::publish::DirectoryPublisher;
use crate::scope::FileChannelRegistry;
use crate::service::{GraphService, ServiceSettings};
use crate::storage::create_store;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Application context for CLI operations.
#[derive(Debug)]
pub struct App {
    /// Directory containing `.rapport/`
    root: PathBuf,

    /// Loaded configuration
    config: RapportConfig,

    /// Service wired to the workspace's collaborators
    service: GraphService,
}

impl App {
    /// Create an App instance from the given working directory.
    ///
    /// Searches up the directory tree to find a `.rapport/` directory, loads
    /// configuration, and opens the store, channel registry and member roster.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No workspace is found in the directory tree
    /// - Configuration cannot be loaded
    /// - Storage or the channel registry cannot be opened
    pub async fn from_directory(working_dir: &Path) -> Result<Self> {
        let root = find_rapport_root(working_dir).ok_or(Error::NotInitialized)?;
        let config_path = root.join(RAPPORT_DIR_NAME).join(CONFIG_FILE_NAME);
        let config = RapportConfig::load(&config_path).await?;
        tracing::debug!(root = %root.display(), backend = %config.storage.backend, "Loaded config");

        let backend = config.storage.to_backend(&root)?;
        let store = create_store(backend).await?;
        let registry = FileChannelRegistry::open(resolve_path(&root, &config.channels_file)).await?;
        let members = StaticDirectory::load(&resolve_path(&root, &config.members_file)).await?;
        let publisher = DirectoryPublisher::new(
            resolve_path(&root, &config.publish.directory),
            config.publish.base_url.clone(),
        );

        let service = GraphService::new(store, Arc::new(registry), Arc::new(members), Arc::new(publisher))
            .with_settings(ServiceSettings {
                artifacts_dir: resolve_path(&root, &config.artifacts_dir),
                confirm_timeout: config.confirm_timeout(),
            });

        Ok(Self {
            root,
            config,
            service,
        })
    }

    /// The graph service
    pub fn service(&self) -> &GraphService {
        &self.service
    }

    /// A dispatcher for chat-style commands using the configured prefix
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.service.clone(), self.config.command_prefix.clone())
    }

    /// The loaded configuration
    pub fn config(&self) -> &RapportConfig {
        &self.config
    }

    /// Directory containing `.rapport/`
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the `.rapport/` directory
    pub fn rapport_dir(&self) -> PathBuf {
        self.root.join(RAPPORT_DIR_NAME)
    }

    /// Collect the overview printed by `rapport info`.
    pub async fn summary(&self) -> Result<WorkspaceSummary> {
        let store = self.service.store();
        let mut scopes = Vec::new();
        for scope in store.scopes().await? {
            let graph = store.load(&scope).await?.unwrap_or_default();
            scopes.push(ScopeSummary {
                nodes: graph.nodes.len(),
                edges: graph.edges.len(),
                scope,
            });
        }

        Ok(WorkspaceSummary {
            root: self.root.clone(),
            backend: self.config.storage.backend.clone(),
            data_file: self
                .config
                .storage
                .to_backend(&self.root)?
                .data_path()
                .map(Path::to_path_buf),
            base_url: self.config.publish.base_url.clone(),
            scopes,
        })
    }
}
