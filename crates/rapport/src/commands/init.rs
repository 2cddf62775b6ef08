//! Implementation of the `init` command.
//!
//! This module handles initialization of a new rapport workspace, creating
//! the `.rapport/` directory with configuration, an empty graph file, an empty
//! channel registry and a commented member roster.

use crate::config::{
    CHANNELS_FILE_NAME, CONFIG_FILE_NAME, DEFAULT_BASE_URL, GRAPHS_FILE_NAME, MEMBERS_FILE_NAME,
    RAPPORT_DIR_NAME, RapportConfig,
};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Name of the gitignore file within .rapport
pub const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Maximum directory depth to traverse when searching for the workspace root
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

const MEMBERS_TEMPLATE: &str = "\
# Member roster per community. Communities not listed here are open:
# every user is shown, labelled with their raw id.
#
# communities:
#   \"1001\":
#     name: Book Club
#     members:
#       \"1\": Alice
#       \"2\": Bob
communities: {}
";

/// Result of the init command
#[derive(Debug)]
pub struct InitResult {
    /// Path to the created .rapport directory
    pub rapport_dir: PathBuf,
    /// Path to the created config file
    pub config_file: PathBuf,
    /// Path to the created graph data file
    pub graphs_file: PathBuf,
    /// Path to the created channel registry
    pub channels_file: PathBuf,
    /// Path to the created member roster
    pub members_file: PathBuf,
    /// Base URL written to the config
    pub base_url: String,
}

/// Validate a publish base URL.
///
/// Note: Expects pre-trimmed input.
pub fn validate_base_url(url: &str) -> Result<()> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| Error::Config("Base URL must start with http:// or https://".to_string()))?;

    if rest.is_empty() || rest.chars().any(char::is_whitespace) {
        return Err(Error::Config(
            "Base URL must name a host and contain no whitespace".to_string(),
        ));
    }
    Ok(())
}

/// Initialize a new rapport workspace in the given directory.
///
/// # Errors
///
/// Returns an error if:
/// - The `.rapport/` directory already exists
/// - The base URL is invalid
/// - File system operations fail
pub async fn init(base_dir: &Path, base_url: Option<&str>) -> Result<InitResult> {
    let base_url = base_url.unwrap_or(DEFAULT_BASE_URL).trim();
    validate_base_url(base_url)?;

    let rapport_dir = base_dir.join(RAPPORT_DIR_NAME);
    if rapport_dir.exists() {
        return Err(Error::Config(format!(
            "Rapport is already initialized in this directory. Found existing '{RAPPORT_DIR_NAME}'"
        )));
    }

    fs::create_dir_all(&rapport_dir).await?;

    let mut config = RapportConfig::default();
    config.publish.base_url = base_url.trim_end_matches('/').to_string();
    let config_file = rapport_dir.join(CONFIG_FILE_NAME);
    config.save(&config_file).await?;

    let graphs_file = rapport_dir.join(GRAPHS_FILE_NAME);
    fs::write(&graphs_file, "").await?;

    let channels_file = rapport_dir.join(CHANNELS_FILE_NAME);
    fs::write(&channels_file, "").await?;

    let members_file = rapport_dir.join(MEMBERS_FILE_NAME);
    fs::write(&members_file, MEMBERS_TEMPLATE).await?;

    fs::write(
        rapport_dir.join(GITIGNORE_FILE_NAME),
        "# Rendered documents awaiting publication\nartifacts/\n# Data file locks\n*.lock\n",
    )
    .await?;

    tracing::info!(path = %rapport_dir.display(), "Initialized rapport workspace");

    Ok(InitResult {
        rapport_dir,
        config_file,
        graphs_file,
        channels_file,
        members_file,
        base_url: config.publish.base_url,
    })
}

/// Check if a directory has been initialized with rapport.
pub fn is_initialized(base_dir: &Path) -> bool {
    base_dir.join(RAPPORT_DIR_NAME).exists()
}

/// Find the workspace root by searching up the directory tree.
///
/// Returns the directory containing `.rapport/`, or `None` if none is found
/// within [`MAX_TRAVERSAL_DEPTH`] levels.
pub fn find_rapport_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    let mut depth = 0;

    loop {
        if current.join(RAPPORT_DIR_NAME).exists() {
            return Some(current);
        }

        depth += 1;
        if depth > MAX_TRAVERSAL_DEPTH || !current.pop() {
            return None;
        }
    }
}
