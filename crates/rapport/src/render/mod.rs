//! Renderer-agnostic views of a graph.
//!
//! [`RenderAdapter`] turns a (membership-filtered) [`SocialGraph`] into a
//! [`RenderView`]: a flat list of labelled nodes and endpoint pairs. Renderers
//! only ever see the view; they never touch the store or the graph model.
//!
//! Two renderer seams exist:
//!
//! - [`StaticRenderer`] produces an image-like artifact in memory
//!   ([`DotRenderer`] writes Graphviz DOT)
//! - [`InteractiveRenderer`] writes a document to disk for publishing
//!   ([`HtmlRenderer`] writes a standalone vis-network page)
//!
//! Layout is the renderer's business; the adapter performs no drawing.

mod dot;
mod html;

pub use dot::DotRenderer;
pub use html::HtmlRenderer;

use crate::domain::UserId;
use crate::error::Result;
use crate::graph::SocialGraph;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A node as handed to a renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewNode {
    /// Raw user identifier
    pub id: UserId,

    /// Display name, or the raw identifier when it can't be resolved
    pub label: String,
}

/// An edge as handed to a renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewEdge {
    /// Smaller endpoint of the canonical edge
    pub from: UserId,

    /// Larger endpoint of the canonical edge
    pub to: UserId,
}

/// Everything a renderer needs, sorted by id for deterministic output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderView {
    /// Labelled nodes
    pub nodes: Vec<ViewNode>,

    /// Edges between nodes in `nodes`
    pub edges: Vec<ViewEdge>,
}

/// Result of building a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// There is something to draw
    View(RenderView),

    /// The graph is empty (or everything was filtered out)
    NoData,
}

/// Builds [`RenderView`]s from graphs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderAdapter;

impl RenderAdapter {
    /// Build the view for `graph`, labelling each node with `label`.
    ///
    /// Returns [`RenderOutcome::NoData`] for an empty graph so callers can say
    /// so instead of rendering blank output.
    pub fn build<F>(graph: &SocialGraph, label: F) -> RenderOutcome
    where
        F: Fn(&UserId) -> Option<String>,
    {
        if graph.is_empty() {
            return RenderOutcome::NoData;
        }

        let nodes = graph
            .nodes()
            .into_iter()
            .map(|id| {
                let label = label(&id).unwrap_or_else(|| id.to_string());
                ViewNode { id, label }
            })
            .collect();

        let edges = graph
            .edges()
            .into_iter()
            .map(|edge| {
                let (from, to): (UserId, UserId) = edge.into();
                ViewEdge { from, to }
            })
            .collect();

        RenderOutcome::View(RenderView { nodes, edges })
    }
}

/// An image-like artifact held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    /// Suggested file name for attaching the artifact
    pub file_name: String,

    /// MIME type of `bytes`
    pub media_type: &'static str,

    /// Artifact contents
    pub bytes: Vec<u8>,
}

/// Renders a view into a static artifact.
#[async_trait]
pub trait StaticRenderer: Send + Sync {
    /// Render `view` with `title` as the caption.
    async fn render(&self, view: &RenderView, title: &str) -> Result<RenderedImage>;
}

/// Renders a view into an interactive document on disk.
#[async_trait]
pub trait InteractiveRenderer: Send + Sync {
    /// Write a document for `view` into `dir` and return its path.
    ///
    /// The caller owns the file and removes it once it has been published.
    async fn render(&self, view: &RenderView, dir: &Path) -> Result<PathBuf>;
}
