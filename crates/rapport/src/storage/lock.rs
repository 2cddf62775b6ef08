//! Advisory locks on data files.
//!
//! Every handle on a data file, in this process or another, takes the lock
//! before reading and holds it across read-modify-write. The lock lives on a
//! sidecar `<file>.lock` because writers replace the data file by rename.

use crate::error::Result;
use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy)]
enum Mode {
    Shared,
    Exclusive,
}

/// A held lock; released when dropped.
#[derive(Debug)]
pub(crate) struct FileLock {
    _file: File,
}

impl FileLock {
    /// Wait for a shared lock on `target`.
    pub(crate) async fn shared(target: &Path) -> Result<Self> {
        Self::acquire(target, Mode::Shared).await
    }

    /// Wait for an exclusive lock on `target`.
    pub(crate) async fn exclusive(target: &Path) -> Result<Self> {
        Self::acquire(target, Mode::Exclusive).await
    }

    async fn acquire(target: &Path, mode: Mode) -> Result<Self> {
        let path = lock_path(target);
        let file = tokio::task::spawn_blocking(move || -> io::Result<File> {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&path)?;
            match mode {
                Mode::Shared => file.lock_shared()?,
                Mode::Exclusive => file.lock()?,
            }
            Ok(file)
        })
        .await
        .map_err(io::Error::other)??;

        tracing::trace!(target = %target.display(), ?mode, "Acquired file lock");
        Ok(Self { _file: file })
    }
}

/// The sidecar lock file guarding `target`.
pub(crate) fn lock_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".lock");
    target.with_file_name(name)
}
