//! JSONL persistence for in-memory storage.
//!
//! This module provides functions to load and save the in-memory state to
//! JSONL (JSON Lines) files. Each line is one [`GraphDocument`].

use super::inner::InMemoryStoreInner;
use crate::domain::{Edge, GraphDocument, Scope, UserId};
use crate::error::{Error, Result, StorageError};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

/// Warnings that can occur during JSONL file loading.
///
/// These are non-fatal issues that don't prevent loading but indicate data
/// quality problems in the file. Problematic data is skipped or merged and the
/// load carries on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// Line that couldn't be parsed as a graph document
    ///
    /// **Effect**: Line is skipped entirely.
    /// **Common causes**: File corruption, manual editing errors, incomplete writes.
    MalformedJson {
        /// 1-based line number in the file
        line_number: usize,
        /// Parser error message
        error: String,
    },

    /// Edge whose two endpoints are the same user
    ///
    /// **Effect**: The edge is dropped; the node is kept.
    SelfLoop {
        /// Scope of the document the edge came from
        scope: Scope,
        /// The user on both ends
        user: UserId,
    },

    /// More than one document for the same scope
    ///
    /// **Effect**: Documents are merged by set union.
    DuplicateScope {
        /// The repeated scope
        scope: Scope,
        /// 1-based line number of the repeated document
        line_number: usize,
    },
}

/// Load state from a JSONL file.
///
/// # Error Handling
///
/// - **Malformed JSON**: Skips the line and adds a warning
/// - **Self-loop edges**: Drops the edge and adds a warning
/// - **Duplicate scopes**: Merges the documents and adds a warning
/// - **Edge endpoints missing from `nodes`**: Silently added to the node set
///
/// Blank lines are ignored.
///
/// # Returns
///
/// A tuple of `(state, warnings)`.
pub(crate) async fn load_from_jsonl(path: &Path) -> Result<(InMemoryStoreInner, Vec<LoadWarning>)> {
    let file = File::open(path).await.map_err(Error::Io)?;
    let mut lines = BufReader::new(file).lines();

    let mut inner = InMemoryStoreInner::new();
    let mut warnings = Vec::new();
    let mut line_number = 0;

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| StorageError::InvalidFormat(e.to_string()))?
    {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        let doc: GraphDocument = match serde_json::from_str(&line) {
            Ok(doc) => doc,
            Err(e) => {
                warnings.push(LoadWarning::MalformedJson {
                    line_number,
                    error: e.to_string(),
                });
                continue;
            }
        };

        let scope = doc.scope();
        if inner.graphs.contains_key(&scope) {
            warnings.push(LoadWarning::DuplicateScope {
                scope: scope.clone(),
                line_number,
            });
        }

        let mut edges = Vec::with_capacity(doc.edges.len());
        for (a, b) in doc.edges {
            match Edge::new(a.clone(), b) {
                Some(edge) => edges.push(edge),
                None => warnings.push(LoadWarning::SelfLoop {
                    scope: scope.clone(),
                    user: a,
                }),
            }
        }

        inner.merge_add(&scope, doc.nodes, edges);
    }

    tracing::debug!(
        path = %path.display(),
        scopes = inner.graphs.len(),
        warnings = warnings.len(),
        "Loaded graphs from JSONL"
    );

    Ok((inner, warnings))
}

/// Save state to a JSONL file with atomic writes.
///
/// Writes one document per scope, sorted by scope, with sorted nodes and
/// edges, so repeated saves of the same state produce identical bytes.
///
/// # Atomicity
///
/// Uses a write-then-rename pattern which is atomic on POSIX systems. If the
/// process crashes or is interrupted, the original file remains unchanged.
pub(crate) async fn save_to_jsonl(state: &InMemoryStoreInner, path: &Path) -> Result<()> {
    let temp_path = path.with_extension("tmp");

    let file = File::create(&temp_path).await.map_err(Error::Io)?;
    let mut writer = BufWriter::new(file);

    for (scope, graph) in state.sorted_graphs() {
        let doc = GraphDocument::from_graph(scope, graph);
        let json = serde_json::to_string(&doc).map_err(StorageError::Serialization)?;
        writer.write_all(json.as_bytes()).await.map_err(Error::Io)?;
        writer.write_all(b"\n").await.map_err(Error::Io)?;
    }

    writer.flush().await.map_err(Error::Io)?;

    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(Error::Io)?;

    Ok(())
}
