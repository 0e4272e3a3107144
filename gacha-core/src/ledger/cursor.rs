//! Persisted sync cursor for the `BetResolved` log poller.
//!
//! Holds the block the poller resumes from after a restart. The saved block
//! is the start of the most recently scanned range, so a restart rescans
//! that range once; reconciliation into the event store is idempotent.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CursorError {
    #[error("cursor io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cursor file {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CursorFile {
    next_block: u64,
}

/// File-backed block cursor.
#[derive(Debug, Clone)]
pub struct BlockCursor {
    path: PathBuf,
}

impl BlockCursor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The saved block, or `None` if nothing was saved yet.
    pub async fn load(&self) -> Result<Option<u64>, CursorError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(self.io_error(source)),
        };
        let file: CursorFile =
            serde_json::from_slice(&raw).map_err(|source| CursorError::Malformed {
                path: self.path.clone(),
                source,
            })?;
        Ok(Some(file.next_block))
    }

    /// Save `next_block`, replacing the file atomically.
    pub async fn save(&self, next_block: u64) -> Result<(), CursorError> {
        let encoded = serde_json::to_vec(&CursorFile { next_block }).map_err(|source| {
            CursorError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        tokio::fs::write(&tmp, &encoded)
            .await
            .map_err(|source| self.io_error(source))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> CursorError {
        CursorError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
