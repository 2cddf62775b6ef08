//! Graphviz DOT output for the static view.

use super::{RenderView, RenderedImage, StaticRenderer};
use crate::error::Result;
use async_trait::async_trait;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::HashMap;

/// Renders a view as a Graphviz `graph` with display names as node labels.
///
/// Layout is left to whichever Graphviz engine consumes the file.
#[derive(Debug, Clone, Copy, Default)]
pub struct DotRenderer;

impl DotRenderer {
    /// Produce the DOT source for `view`.
    pub fn to_dot(view: &RenderView, title: &str) -> String {
        // Edge weights must be Display for Dot even though EdgeNoLabel hides them.
        let mut graph: UnGraph<&str, &str> = UnGraph::new_undirected();
        let mut index: HashMap<&str, NodeIndex> = HashMap::with_capacity(view.nodes.len());
        for node in &view.nodes {
            index.insert(node.id.as_str(), graph.add_node(node.label.as_str()));
        }
        for edge in &view.edges {
            if let (Some(&a), Some(&b)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str())) {
                graph.add_edge(a, b, "");
            }
        }

        let body = format!("{}", Dot::with_config(&graph, &[Config::EdgeNoLabel]));
        let caption = format!(
            "    label = \"{}\"\n    labelloc = t\n    node [ style = filled, fillcolor = skyblue ]\n",
            escape(title)
        );

        // Dot emits "graph {\n" first; the graph attributes go right after it.
        match body.split_once('\n') {
            Some((head, rest)) => format!("{head}\n{caption}{rest}"),
            None => body,
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

#[async_trait]
impl StaticRenderer for DotRenderer {
    async fn render(&self, view: &RenderView, title: &str) -> Result<RenderedImage> {
        let source = Self::to_dot(view, title);
        tracing::debug!(nodes = view.nodes.len(), edges = view.edges.len(), "Rendered DOT graph");
        Ok(RenderedImage {
            file_name: "graph.dot".to_string(),
            media_type: "text/vnd.graphviz",
            bytes: source.into_bytes(),
        })
    }
}
