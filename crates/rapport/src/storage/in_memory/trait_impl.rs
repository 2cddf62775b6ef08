//! GraphStore trait implementation for in-memory storage.

use super::InMemoryStore;
use crate::domain::{Edge, Scope, StoredGraph, UserId};
use crate::error::Result;
use crate::storage::GraphStore;
use async_trait::async_trait;

#[async_trait]
impl GraphStore for InMemoryStore {
    async fn load(&self, scope: &Scope) -> Result<Option<StoredGraph>> {
        Ok(self.lock().await.load(scope))
    }

    async fn save(&self, scope: &Scope, graph: StoredGraph) -> Result<()> {
        self.lock().await.save(scope, graph);
        Ok(())
    }

    async fn merge_add(&self, scope: &Scope, nodes: Vec<UserId>, edges: Vec<Edge>) -> Result<()> {
        tracing::debug!(scope = %scope, nodes = nodes.len(), edges = edges.len(), "merge_add");
        self.lock().await.merge_add(scope, nodes, edges);
        Ok(())
    }

    async fn remove_edge(&self, scope: &Scope, edge: &Edge) -> Result<bool> {
        Ok(self.lock().await.remove_edge(scope, edge))
    }

    async fn clear(&self, scope: &Scope) -> Result<bool> {
        Ok(self.lock().await.clear(scope))
    }

    async fn scopes(&self) -> Result<Vec<Scope>> {
        Ok(self.lock().await.scopes())
    }
}
