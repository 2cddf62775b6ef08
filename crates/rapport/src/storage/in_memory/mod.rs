//! In-memory storage backend.
//!
//! This module provides a fast, **ephemeral** storage implementation where all
//! graphs are held in RAM and **lost when the process exits**. It is suitable
//! for:
//!
//! - Testing and development
//! - Short-lived CLI sessions
//! - The working state of each JSONL-backed store call
//!
//! # Persistence
//!
//! [`load_from_jsonl`] and [`save_to_jsonl`] move the whole state to and from a
//! JSONL file, one graph document per line. The JSONL-backed store in the
//! parent module loads the file under its lock on every call and calls
//! `save_to_jsonl` after every mutation that changed a graph.
//!
//! # Architecture
//!
//! The state is a `HashMap<Scope, StoredGraph>`. Graph structure (adjacency,
//! membership filtering) is not kept here: stores hold flat node and edge sets
//! and every operation rebuilds a [`SocialGraph`](crate::graph::SocialGraph)
//! from them.
//!
//! # Thread Safety
//!
//! The state is wrapped in `Arc<Mutex<InMemoryStoreInner>>`. Every trait method
//! acquires the mutex once and performs its whole read or write under it, which
//! is what makes `merge_add` an atomic set union.

mod inner;
mod jsonl;
mod trait_impl;

use crate::storage::GraphStore;
pub(crate) use inner::InMemoryStoreInner;
use std::sync::Arc;
use tokio::sync::Mutex;

// Re-export public API
pub use jsonl::LoadWarning;
pub(crate) use jsonl::{load_from_jsonl, save_to_jsonl};

/// Thread-safe in-memory storage.
///
/// Implements [`GraphStore`] via the trait implementation in `trait_impl.rs`.
pub(crate) type InMemoryStore = Arc<Mutex<InMemoryStoreInner>>;

/// Create a new in-memory store instance.
///
/// # Example
///
/// ```
/// use rapport::storage::in_memory::new_in_memory_store;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let store = new_in_memory_store();
///     // Share the store between operations...
/// }
/// ```
pub fn new_in_memory_store() -> Arc<dyn GraphStore> {
    Arc::new(Arc::new(Mutex::new(InMemoryStoreInner::new())))
}
