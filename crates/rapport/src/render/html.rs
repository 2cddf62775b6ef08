//! Standalone interactive HTML page backed by vis-network.

use super::{InteractiveRenderer, RenderView};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

const VIS_NETWORK_SCRIPT: &str =
    "https://unpkg.com/vis-network@9.1.9/standalone/umd/vis-network.min.js";

static DOCUMENT_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Writes a self-contained page that lays out the graph in the browser.
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    script_src: String,
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self {
            script_src: VIS_NETWORK_SCRIPT.to_string(),
        }
    }
}

impl HtmlRenderer {
    /// Create a renderer loading vis-network from the default CDN.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load vis-network from `src` instead, e.g. a self-hosted copy.
    pub fn with_script_src(src: impl Into<String>) -> Self {
        Self {
            script_src: src.into(),
        }
    }

    /// Physics and styling options handed to `vis.Network`.
    pub fn options() -> Value {
        json!({
            "nodes": {
                "scaling": { "min": 20, "max": 50 },
                "font": { "size": 20, "face": "arial", "color": "black" }
            },
            "edges": {
                "width": 3,
                "color": { "inherit": true },
                "smooth": { "enabled": true, "type": "dynamic" }
            },
            "physics": {
                "solver": "barnesHut",
                "barnesHut": {
                    "gravitationalConstant": -80000,
                    "centralGravity": 0.3,
                    "springLength": 250,
                    "springConstant": 0.001,
                    "damping": 0.09,
                    "avoidOverlap": 0
                }
            }
        })
    }

    /// Produce the page for `view`.
    pub fn to_html(&self, view: &RenderView) -> Result<String> {
        let nodes: Vec<Value> = view
            .nodes
            .iter()
            .map(|n| json!({ "id": n.id, "label": n.label, "title": n.id }))
            .collect();
        let edges: Vec<Value> = view
            .edges
            .iter()
            .map(|e| json!({ "from": e.from, "to": e.to }))
            .collect();

        let nodes = script_safe(&serde_json::to_string(&nodes)?);
        let edges = script_safe(&serde_json::to_string(&edges)?);
        let options = serde_json::to_string(&Self::options())?;

        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>rapport graph</title>
<script src="{script}"></script>
<style>
  html, body {{ margin: 0; padding: 0; background: #FFFFFF; }}
  #graph {{ width: 100%; height: 100vh; }}
</style>
</head>
<body>
<div id="graph"></div>
<script>
  var nodes = new vis.DataSet({nodes});
  var edges = new vis.DataSet({edges});
  var container = document.getElementById("graph");
  var options = {options};
  var network = new vis.Network(container, {{ nodes: nodes, edges: edges }}, options);
</script>
</body>
</html>
"#,
            script = self.script_src,
        ))
    }
}

// Display names are user-controlled and end up inside a <script> block.
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}

fn document_name() -> String {
    let stamp = chrono::Utc::now().timestamp_micros();
    let seq = DOCUMENT_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("graph-{}-{stamp}-{seq}.html", std::process::id())
}

#[async_trait]
impl InteractiveRenderer for HtmlRenderer {
    async fn render(&self, view: &RenderView, dir: &Path) -> Result<PathBuf> {
        let html = self.to_html(view)?;
        tokio::fs::create_dir_all(dir).await?;

        let path = dir.join(document_name());
        tokio::fs::write(&path, html).await?;
        tracing::debug!(path = %path.display(), nodes = view.nodes.len(), "Wrote interactive graph");
        Ok(path)
    }
}
