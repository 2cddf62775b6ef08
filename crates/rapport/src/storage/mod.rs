//! Storage abstraction layer for rapport.
//!
//! This module provides the core storage trait and factory for creating
//! storage backends. It supports two implementations:
//!
//! - **In-memory**: Fast, ephemeral storage backed by a `HashMap` of scopes
//! - **JSONL**: Persistent file-based storage using JSON Lines format, one
//!   graph document per line
//!
//! # Architecture
//!
//! The storage layer uses an async trait so that truly async backends (a
//! document database, a key-value service) can implement it next to the local
//! ones. The trait is object-safe, allowing for dynamic dispatch via
//! `Arc<dyn GraphStore>`. All methods take `&self`: backends use interior
//! mutability so one store instance can be shared by every concurrently
//! running operation.
//!
//! # Concurrency
//!
//! [`GraphStore::merge_add`] is the only write used by concurrent connect
//! requests, and it is a set union applied under the backend's own lock. Two
//! interleaved calls for the same scope always end with the union of both
//! inputs; callers never read-modify-write a graph themselves.
//!
//! The JSONL backend extends that lock across handles: every call locks the
//! data file and works on what is on disk at that moment, so separate
//! processes sharing a workspace see and keep each other's writes.
//!
//! # Test Utilities
//!
//! This module provides a [`MockStore`] whose every operation fails with
//! [`StorageError::Unavailable`]. Enable the `test-util` feature to use it from
//! downstream crates:
//!
//! ```toml
//! [dev-dependencies]
//! rapport = { version = "...", features = ["test-util"] }
//! ```
//!
//! # Example
//!
//! ```no_run
//! use rapport::domain::{Edge, Scope, UserId};
//! use rapport::storage::{create_store, StorageBackend};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let store = create_store(StorageBackend::InMemory).await?;
//!     let scope = Scope::new("guild-1", "channel-9");
//!
//!     let edge = Edge::new(UserId::new("100"), UserId::new("200")).unwrap();
//!     store.merge_add(&scope, vec![], vec![edge]).await?;
//!
//!     let graph = store.load(&scope).await?.unwrap_or_default();
//!     println!("{} nodes, {} edges", graph.nodes.len(), graph.edges.len());
//!     Ok(())
//! }
//! ```

use crate::domain::{Edge, Scope, StoredGraph, UserId};
use crate::error::Result;
use async_trait::async_trait;
use in_memory::InMemoryStoreInner;
use lock::FileLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

// Storage backend implementations
pub mod in_memory;
pub(crate) mod lock;

/// Core storage trait for per-scope graphs.
///
/// # Method Categories
///
/// - **Reads**: `load`, `scopes`
/// - **Writes**: `save`, `merge_add`, `remove_edge`, `clear`
///
/// # Error Handling
///
/// All methods return `Result<T>`; backend failures surface as
/// `Error::Storage` or `Error::Io`. Absence of data is never an error:
/// `load` returns `None`, `remove_edge` and `clear` return `false`.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Load the graph stored for `scope`.
    ///
    /// Returns `None` if nothing has been stored for the scope yet.
    async fn load(&self, scope: &Scope) -> Result<Option<StoredGraph>>;

    /// Replace the graph stored for `scope`.
    ///
    /// The node-set invariant is repaired on the way in: edge endpoints missing
    /// from `graph.nodes` are added.
    async fn save(&self, scope: &Scope, graph: StoredGraph) -> Result<()>;

    /// Atomically union `nodes` and `edges` into the graph stored for `scope`.
    ///
    /// Creates the graph if it doesn't exist. Idempotent: applying the same
    /// input twice leaves the same stored graph as applying it once.
    async fn merge_add(&self, scope: &Scope, nodes: Vec<UserId>, edges: Vec<Edge>) -> Result<()>;

    /// Remove one edge from the graph stored for `scope`.
    ///
    /// Nodes are never removed. Returns `true` if the edge was present.
    async fn remove_edge(&self, scope: &Scope, edge: &Edge) -> Result<bool>;

    /// Delete the graph stored for `scope`.
    ///
    /// Returns `true` if data existed.
    async fn clear(&self, scope: &Scope) -> Result<bool>;

    /// List every scope that currently has a stored graph, sorted.
    async fn scopes(&self) -> Result<Vec<Scope>>;
}

/// Storage backend configuration.
///
/// Determines which storage implementation to use.
#[derive(Debug, Clone)]
pub enum StorageBackend {
    /// In-memory storage (ephemeral)
    InMemory,

    /// JSONL file storage (persistent)
    Jsonl(PathBuf),
}

impl StorageBackend {
    /// Returns the data file path for file-based backends.
    pub fn data_path(&self) -> Option<&Path> {
        match self {
            StorageBackend::Jsonl(path) => Some(path),
            StorageBackend::InMemory => None,
        }
    }
}

/// Graphs persisted in a JSONL file shared with other handles.
///
/// Nothing is cached between calls. Reads take a shared [`FileLock`] and parse
/// the file; writes take the exclusive lock, re-read, apply the change and
/// rewrite the file only if the scope's graph actually changed. Two handles on
/// one file, in one process or several, therefore never lose each other's
/// writes.
pub(crate) struct JsonlBackedStore {
    path: PathBuf,
    // Queues this handle's own calls so they don't each park a blocking thread
    gate: Mutex<()>,
}

impl JsonlBackedStore {
    async fn open(path: PathBuf) -> Result<Self> {
        let store = Self {
            path,
            gate: Mutex::new(()),
        };

        let damaged = store.read(|_, warnings| warnings.len()).await?.unwrap_or(0);
        if damaged > 0 {
            // Storage is still usable; damaged lines are dropped on the next write
            tracing::warn!(count = damaged, path = %store.path.display(), "JSONL file has damaged lines");
        }
        Ok(store)
    }

    async fn read_state(&self) -> Result<(InMemoryStoreInner, Vec<in_memory::LoadWarning>)> {
        if tokio::fs::try_exists(&self.path).await? {
            let (state, warnings) = in_memory::load_from_jsonl(&self.path).await?;
            for warning in &warnings {
                tracing::debug!(warning = ?warning, path = %self.path.display(), "JSONL load warning");
            }
            Ok((state, warnings))
        } else {
            Ok((InMemoryStoreInner::new(), Vec::new()))
        }
    }

    /// Run `inspect` against the current file contents.
    ///
    /// Returns `None` without locking if the file doesn't exist yet.
    async fn read<T>(
        &self,
        inspect: impl FnOnce(&InMemoryStoreInner, &[in_memory::LoadWarning]) -> T,
    ) -> Result<Option<T>> {
        let _gate = self.gate.lock().await;
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(None);
        }

        let _lock = FileLock::shared(&self.path).await?;
        let (state, warnings) = self.read_state().await?;
        Ok(Some(inspect(&state, &warnings)))
    }

    /// Apply `mutate` to the latest file contents and persist if `scope` changed.
    async fn mutate<T>(
        &self,
        scope: &Scope,
        mutate: impl FnOnce(&mut InMemoryStoreInner) -> T,
    ) -> Result<T> {
        let _gate = self.gate.lock().await;
        let _lock = FileLock::exclusive(&self.path).await?;

        let (mut state, _) = self.read_state().await?;
        let previous = state.load(scope);
        let outcome = mutate(&mut state);

        if state.load(scope) == previous {
            tracing::debug!(scope = %scope, "Graph unchanged, skipping write");
            return Ok(outcome);
        }

        if let Err(e) = in_memory::save_to_jsonl(&state, &self.path).await {
            tracing::error!(scope = %scope, error = %e, "Failed to persist graph");
            return Err(e);
        }
        Ok(outcome)
    }
}

#[async_trait]
impl GraphStore for JsonlBackedStore {
    async fn load(&self, scope: &Scope) -> Result<Option<StoredGraph>> {
        Ok(self.read(|state, _| state.load(scope)).await?.flatten())
    }

    async fn save(&self, scope: &Scope, graph: StoredGraph) -> Result<()> {
        self.mutate(scope, |state| state.save(scope, graph)).await
    }

    async fn merge_add(&self, scope: &Scope, nodes: Vec<UserId>, edges: Vec<Edge>) -> Result<()> {
        self.mutate(scope, |state| state.merge_add(scope, nodes, edges))
            .await
    }

    async fn remove_edge(&self, scope: &Scope, edge: &Edge) -> Result<bool> {
        self.mutate(scope, |state| state.remove_edge(scope, edge))
            .await
    }

    async fn clear(&self, scope: &Scope) -> Result<bool> {
        self.mutate(scope, |state| state.clear(scope)).await
    }

    async fn scopes(&self) -> Result<Vec<Scope>> {
        Ok(self
            .read(|state, _| state.scopes())
            .await?
            .unwrap_or_default())
    }
}

/// Create a store for the given backend.
///
/// This factory function returns a shared trait object that can be cloned
/// into every concurrently running operation.
///
/// # Errors
///
/// - `Error::Io` if the JSONL file exists but cannot be read
/// - `Error::Storage` if the JSONL file is not valid UTF-8 text
pub async fn create_store(backend: StorageBackend) -> Result<Arc<dyn GraphStore>> {
    match backend {
        StorageBackend::InMemory => Ok(in_memory::new_in_memory_store()),
        StorageBackend::Jsonl(path) => Ok(Arc::new(JsonlBackedStore::open(path).await?)),
    }
}

// ========== Test Utilities ==========

/// Mock implementation of [`GraphStore`] that is always unreachable.
///
/// Every method fails with [`StorageError::Unavailable`]. Use it to exercise
/// the generic failure path of code that depends on a store; use
/// [`in_memory::new_in_memory_store`] when you need real data.
///
/// [`StorageError::Unavailable`]: crate::error::StorageError::Unavailable
#[cfg(any(test, feature = "test-util"))]
#[derive(Clone, Copy, Default)]
#[non_exhaustive]
pub struct MockStore;

#[cfg(any(test, feature = "test-util"))]
impl MockStore {
    /// Create a new MockStore instance.
    pub fn new() -> Self {
        Self
    }

    fn unavailable<T>() -> Result<T> {
        Err(crate::error::StorageError::Unavailable("mock store is offline".to_string()).into())
    }
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait]
impl GraphStore for MockStore {
    async fn load(&self, _scope: &Scope) -> Result<Option<StoredGraph>> {
        Self::unavailable()
    }

    async fn save(&self, _scope: &Scope, _graph: StoredGraph) -> Result<()> {
        Self::unavailable()
    }

    async fn merge_add(&self, _scope: &Scope, _nodes: Vec<UserId>, _edges: Vec<Edge>) -> Result<()> {
        Self::unavailable()
    }

    async fn remove_edge(&self, _scope: &Scope, _edge: &Edge) -> Result<bool> {
        Self::unavailable()
    }

    async fn clear(&self, _scope: &Scope) -> Result<bool> {
        Self::unavailable()
    }

    async fn scopes(&self) -> Result<Vec<Scope>> {
        Self::unavailable()
    }
}
