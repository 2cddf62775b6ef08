//! Output formatting for CLI commands.
//!
//! Every command prints either human-readable text or a JSON document. The
//! `write_*` functions take any writer so they can be tested; the `print_*`
//! wrappers send them to stdout.
//!
//! Submodules:
//! - [`color`]: Color and styling helpers

pub mod color;

use crate::commands::Response;
use crate::domain::{Edge, Scope};
use crate::service::{ClearOutcome, ConnectOutcome, ConnectReport, DeleteOutcome, DeleteReport, LinkOutcome};
use serde::Serialize;
use serde_json::{Value, json};
use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub use color::{error, info, success, warning};

use color::{bold, colorize_edge, dimmed};

/// Configuration for output formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Create a new OutputConfig with explicit values.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Create an OutputConfig by reading from environment variables.
    ///
    /// Reads:
    /// - `NO_COLOR`: Standard env var to disable colors (any value disables colors)
    /// - `RAPPORT_COLOR`: Set to "0" or "false" to disable colors (default: true)
    pub fn from_env() -> Self {
        // Respect NO_COLOR standard (https://no-color.org/)
        let use_colors = env::var("NO_COLOR").is_err()
            && env::var("RAPPORT_COLOR")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true);
        Self { use_colors }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { use_colors: true }
    }
}

/// Output format mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format
    Text,
    /// JSON format for programmatic use
    Json,
}

/// Per-scope counts shown by `rapport info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeSummary {
    /// The scope
    #[serde(flatten)]
    pub scope: Scope,
    /// Stored users
    pub nodes: usize,
    /// Stored connections
    pub edges: usize,
}

/// Workspace overview shown by `rapport info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceSummary {
    /// Directory containing `.rapport/`
    pub root: PathBuf,
    /// Storage backend name from the config
    pub backend: String,
    /// Data file, for file-backed storage
    pub data_file: Option<PathBuf>,
    /// Public base URL
    pub base_url: String,
    /// Every stored graph
    pub scopes: Vec<ScopeSummary>,
}

// ============================================================================
// Public Dispatch Functions
// ============================================================================

/// Print a simple message
pub fn print_message(msg: &str) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{msg}")
}

/// Print a JSON-formatted result for any serializable value
pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_json(&mut handle, value)
}

/// Print a connect report
pub fn print_connect(report: &ConnectReport, mode: OutputMode) -> io::Result<()> {
    with_stdout(|w, config| write_connect(w, report, mode, config))
}

/// Print a delete report
pub fn print_delete(report: &DeleteReport, mode: OutputMode) -> io::Result<()> {
    with_stdout(|w, config| write_delete(w, report, mode, config))
}

/// Print a clear outcome
pub fn print_clear(outcome: ClearOutcome, mode: OutputMode) -> io::Result<()> {
    with_stdout(|w, config| write_clear(w, outcome, mode, config))
}

/// Print a link outcome
pub fn print_link(link: &LinkOutcome, mode: OutputMode) -> io::Result<()> {
    with_stdout(|w, config| write_link(w, link, mode, config))
}

/// Print where a static render was written, or that there was nothing to render
pub fn print_view(written: Option<(&Path, &str)>, mode: OutputMode) -> io::Result<()> {
    with_stdout(|w, config| write_view(w, written, mode, config))
}

/// Print the workspace summary
pub fn print_info(summary: &WorkspaceSummary, mode: OutputMode) -> io::Result<()> {
    with_stdout(|w, config| write_info(w, summary, mode, config))
}

/// Print a dispatcher response
pub fn print_response(response: &Response, mode: OutputMode) -> io::Result<()> {
    with_stdout(|w, _| write_response(w, response, mode))
}

fn with_stdout<F>(f: F) -> io::Result<()>
where
    F: FnOnce(&mut io::StdoutLock<'static>, &OutputConfig) -> io::Result<()>,
{
    let mut handle = io::stdout().lock();
    let config = OutputConfig::from_env();
    f(&mut handle, &config)?;
    handle.flush()
}

// ============================================================================
// Formatting
// ============================================================================

fn write_json<W: Write, T: Serialize>(w: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(w, "{json}")
}

fn link_json(link: &LinkOutcome) -> Value {
    match link {
        LinkOutcome::Published(url) => json!({ "status": "published", "url": url }),
        LinkOutcome::NoData => json!({ "status": "no_data" }),
        LinkOutcome::Failed(reason) => json!({ "status": "failed", "reason": reason }),
    }
}

fn edge_text(edge: &Edge, config: &OutputConfig) -> String {
    colorize_edge(edge.low().as_str(), edge.high().as_str(), config)
}

pub(crate) fn write_link<W: Write>(
    w: &mut W,
    link: &LinkOutcome,
    mode: OutputMode,
    config: &OutputConfig,
) -> io::Result<()> {
    match mode {
        OutputMode::Json => write_json(w, &link_json(link)),
        OutputMode::Text => write_link_line(w, link, config),
    }
}

fn write_link_line<W: Write>(w: &mut W, link: &LinkOutcome, config: &OutputConfig) -> io::Result<()> {
    match link {
        LinkOutcome::Published(url) => writeln!(w, "{} {}", dimmed("Link:", config), info(url, config)),
        LinkOutcome::NoData => writeln!(w, "{}", warning("No graph data to publish.", config)),
        LinkOutcome::Failed(reason) => {
            writeln!(w, "{} {reason}", error("Failed to publish graph:", config))
        }
    }
}

pub(crate) fn write_connect<W: Write>(
    w: &mut W,
    report: &ConnectReport,
    mode: OutputMode,
    config: &OutputConfig,
) -> io::Result<()> {
    if mode == OutputMode::Json {
        let (status, added): (&str, &[Edge]) = match &report.outcome {
            ConnectOutcome::AlreadyConnected => ("already_connected", &[][..]),
            ConnectOutcome::Added(edges) => ("added", edges.as_slice()),
        };
        return write_json(
            w,
            &json!({
                "status": status,
                "added": added,
                "already_connected": report.already_connected,
                "link": link_json(&report.link),
            }),
        );
    }

    match &report.outcome {
        ConnectOutcome::AlreadyConnected => {
            writeln!(w, "{}", warning("These users are already connected.", config))?;
        }
        ConnectOutcome::Added(edges) => {
            writeln!(w, "{}", success(&format!("Added {} connection(s):", edges.len()), config))?;
            for edge in edges {
                writeln!(w, "  {}", edge_text(edge, config))?;
            }
            if !report.already_connected.is_empty() {
                writeln!(w, "{}", dimmed("Already connected:", config))?;
                for edge in &report.already_connected {
                    writeln!(w, "  {}", edge_text(edge, config))?;
                }
            }
        }
    }
    write_link_line(w, &report.link, config)
}

pub(crate) fn write_delete<W: Write>(
    w: &mut W,
    report: &DeleteReport,
    mode: OutputMode,
    config: &OutputConfig,
) -> io::Result<()> {
    let (status, edge) = match &report.outcome {
        DeleteOutcome::Removed(edge) => ("removed", edge),
        DeleteOutcome::NotFound(edge) => ("not_found", edge),
    };

    match mode {
        OutputMode::Json => write_json(
            w,
            &json!({ "status": status, "edge": edge, "link": link_json(&report.link) }),
        ),
        OutputMode::Text => {
            match &report.outcome {
                DeleteOutcome::Removed(_) => {
                    writeln!(w, "{} {}", success("Removed", config), edge_text(edge, config))?;
                }
                DeleteOutcome::NotFound(_) => {
                    writeln!(w, "{} {}", warning("No connection", config), edge_text(edge, config))?;
                }
            }
            write_link_line(w, &report.link, config)
        }
    }
}

pub(crate) fn write_clear<W: Write>(
    w: &mut W,
    outcome: ClearOutcome,
    mode: OutputMode,
    config: &OutputConfig,
) -> io::Result<()> {
    match (mode, outcome) {
        (OutputMode::Json, ClearOutcome::Cleared) => write_json(w, &json!({ "status": "cleared" })),
        (OutputMode::Json, ClearOutcome::NothingToClear) => {
            write_json(w, &json!({ "status": "nothing_to_clear" }))
        }
        (OutputMode::Text, ClearOutcome::Cleared) => writeln!(w, "{}", success("Graph data cleared.", config)),
        (OutputMode::Text, ClearOutcome::NothingToClear) => {
            writeln!(w, "{}", warning("No graph data to clear.", config))
        }
    }
}

pub(crate) fn write_view<W: Write>(
    w: &mut W,
    written: Option<(&Path, &str)>,
    mode: OutputMode,
    config: &OutputConfig,
) -> io::Result<()> {
    match (mode, written) {
        (OutputMode::Json, Some((path, media_type))) => write_json(
            w,
            &json!({ "status": "written", "path": path, "media_type": media_type }),
        ),
        (OutputMode::Json, None) => write_json(w, &json!({ "status": "no_data" })),
        (OutputMode::Text, Some((path, _))) => writeln!(
            w,
            "{} {}",
            success("Graph written to", config),
            info(&path.display().to_string(), config)
        ),
        (OutputMode::Text, None) => writeln!(w, "{}", warning("No graph data available yet.", config)),
    }
}

pub(crate) fn write_info<W: Write>(
    w: &mut W,
    summary: &WorkspaceSummary,
    mode: OutputMode,
    config: &OutputConfig,
) -> io::Result<()> {
    if mode == OutputMode::Json {
        return write_json(w, summary);
    }

    writeln!(w, "{} {}", dimmed("Workspace:", config), summary.root.display())?;
    writeln!(w, "{} {}", dimmed("Backend:  ", config), summary.backend)?;
    if let Some(path) = &summary.data_file {
        writeln!(w, "{} {}", dimmed("Data file:", config), path.display())?;
    }
    writeln!(w, "{} {}", dimmed("Base URL: ", config), summary.base_url)?;
    writeln!(w)?;

    if summary.scopes.is_empty() {
        return writeln!(w, "No graphs stored yet.");
    }
    writeln!(w, "{}", bold("Graphs:", config))?;
    for s in &summary.scopes {
        writeln!(
            w,
            "  {}  {} users, {} connections",
            info(&s.scope.to_string(), config),
            s.nodes,
            s.edges
        )?;
    }
    Ok(())
}

pub(crate) fn write_response<W: Write>(w: &mut W, response: &Response, mode: OutputMode) -> io::Result<()> {
    match (mode, response) {
        (OutputMode::Json, Response::Text(text)) => write_json(w, &json!({ "text": text })),
        (OutputMode::Json, Response::Image(image)) => write_json(
            w,
            &json!({
                "attachment": image.file_name,
                "media_type": image.media_type,
                "content": String::from_utf8_lossy(&image.bytes),
            }),
        ),
        (OutputMode::Text, Response::Text(text)) => writeln!(w, "{text}"),
        (OutputMode::Text, Response::Image(image)) => {
            writeln!(w, "[attachment: {}]", image.file_name)?;
            w.write_all(&image.bytes)?;
            writeln!(w)
        }
    }
}
