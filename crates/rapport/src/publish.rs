//! Publishing rendered artifacts to a public location.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Uploads a local file and returns the URL it can be fetched from.
#[async_trait]
pub trait ObjectPublisher: Send + Sync {
    /// Publish the file at `path` under `suggested_name`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UploadFailed` if the object could not be stored.
    async fn publish(&self, path: &Path, suggested_name: &str) -> Result<String>;
}

/// Publishes by copying into a directory served at `base_url`.
#[derive(Debug, Clone)]
pub struct DirectoryPublisher {
    directory: PathBuf,
    base_url: String,
}

impl DirectoryPublisher {
    /// Create a publisher for `directory`, reachable under `base_url`.
    pub fn new(directory: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            directory: directory.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The public directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

const MAX_NAME_ATTEMPTS: usize = 100;

impl DirectoryPublisher {
    /// Create `suggested_name` in the directory, or `<stem>-<n>.<ext>` if it is taken.
    ///
    /// Creation is exclusive, so a published object is never overwritten.
    async fn claim(&self, suggested_name: &str) -> Result<(tokio::fs::File, String)> {
        let (stem, extension) = match suggested_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{ext}")),
            _ => (suggested_name, String::new()),
        };

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                suggested_name.to_string()
            } else {
                format!("{stem}-{attempt}{extension}")
            };
            let created = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.directory.join(&name))
                .await;
            match created {
                Ok(file) => return Ok((file, name)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(Error::UploadFailed(format!("{}: {e}", self.directory.display()))),
            }
        }
        Err(Error::UploadFailed(format!("no free object name for '{suggested_name}'")))
    }
}

#[async_trait]
impl ObjectPublisher for DirectoryPublisher {
    async fn publish(&self, path: &Path, suggested_name: &str) -> Result<String> {
        if !is_plain_name(suggested_name) {
            return Err(Error::UploadFailed(format!(
                "invalid object name '{suggested_name}'"
            )));
        }

        let mut source = tokio::fs::File::open(path)
            .await
            .map_err(|e| Error::UploadFailed(format!("{}: {e}", path.display())))?;

        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| Error::UploadFailed(format!("{}: {e}", self.directory.display())))?;

        let (mut object, name) = self.claim(suggested_name).await?;
        let target = self.directory.join(&name);
        let copied = async {
            tokio::io::copy(&mut source, &mut object).await?;
            object.flush().await
        }
        .await;
        if let Err(e) = copied {
            if let Err(cleanup) = tokio::fs::remove_file(&target).await {
                tracing::warn!(target = %target.display(), error = %cleanup, "Could not remove partial object");
            }
            return Err(Error::UploadFailed(format!("{}: {e}", target.display())));
        }

        tracing::info!(object = %name, target = %target.display(), "Published artifact");
        Ok(format!("{}/{name}", self.base_url))
    }
}
