//! File-backed event store.
//!
//! The store is a single pretty-printed JSON object mapping correlation id to
//! [`ResolutionRecord`]. It is the only source of truth for resolved bets.
//!
//! Every operation re-reads the file, so out-of-band edits are picked up.
//! Writes are whole-file read-modify-write cycles performed under an
//! exclusive lock and committed by renaming a temporary sibling file over
//! the live file, so readers never observe a half-written encoding.

use crate::entities::{BetStatus, CorrelationId, ResolutionRecord};
use kanau::processor::Processor;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

type RecordMap = BTreeMap<CorrelationId, ResolutionRecord>;

/// Errors that can occur while accessing the store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store file {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode store: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Result of [`EventStore::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Inserted,
    /// A record already existed for the id and was left untouched.
    AlreadyExisted,
}

/// Durable mapping from correlation id to resolution record.
pub struct EventStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl EventStore {
    /// Open the store at `path`, creating an empty one if it does not exist.
    ///
    /// Existing content is parsed once up front; malformed content is an
    /// error rather than being treated as empty.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let store = Self {
            path,
            lock: RwLock::new(()),
        };

        match tokio::fs::try_exists(&store.path).await {
            Ok(true) => {
                let records = store.read_records().await?;
                info!(path = %store.path.display(), records = records.len(), "Event store loaded");
            }
            Ok(false) => {
                if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|source| store.io_error(source))?;
                }
                store.write_records(&RecordMap::new()).await?;
                info!(path = %store.path.display(), "Created empty event store");
            }
            Err(source) => return Err(store.io_error(source)),
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the record for `id`.
    #[tracing::instrument(skip_all, err, fields(correlation_id = %id))]
    pub async fn get(&self, id: &CorrelationId) -> Result<Option<ResolutionRecord>, StoreError> {
        let _guard = self.lock.read().await;
        let mut records = self.read_records().await?;
        Ok(records.remove(id))
    }

    /// Insert `record` under `id` unless a record already exists.
    ///
    /// The first successful `put` for an id wins; later calls report
    /// [`PutOutcome::AlreadyExisted`] and never overwrite.
    #[tracing::instrument(skip_all, err, fields(correlation_id = %id))]
    pub async fn put(
        &self,
        id: CorrelationId,
        record: ResolutionRecord,
    ) -> Result<PutOutcome, StoreError> {
        let _guard = self.lock.write().await;
        let mut records = self.read_records().await?;
        if records.contains_key(&id) {
            debug!("Record already present, skipping write");
            return Ok(PutOutcome::AlreadyExisted);
        }
        records.insert(id, record);
        self.write_records(&records).await?;
        Ok(PutOutcome::Inserted)
    }

    /// Number of resolved bets currently persisted.
    pub async fn len(&self) -> Result<usize, StoreError> {
        let _guard = self.lock.read().await;
        Ok(self.read_records().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len().await? == 0)
    }

    async fn read_records(&self) -> Result<RecordMap, StoreError> {
        let raw = tokio::fs::read(&self.path)
            .await
            .map_err(|source| self.io_error(source))?;
        serde_json::from_slice(&raw).map_err(|source| StoreError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    async fn write_records(&self, records: &RecordMap) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec_pretty(records).map_err(StoreError::Encode)?;

        // Write atomically: write to temp file, then rename
        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, encoded)
            .await
            .map_err(|source| self.io_error(source))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|source| self.io_error(source))?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Look up the status of a bet.
#[derive(Debug, Clone)]
pub struct GetBetStatus {
    pub correlation_id: CorrelationId,
}

impl Processor<GetBetStatus> for EventStore {
    type Output = BetStatus;
    type Error = StoreError;

    async fn process(&self, query: GetBetStatus) -> Result<BetStatus, StoreError> {
        let status = match self.get(&query.correlation_id).await? {
            Some(record) => BetStatus::Resolved(record),
            None => BetStatus::Pending(query.correlation_id),
        };
        Ok(status)
    }
}

/// Persist a resolution record if none exists yet.
#[derive(Debug, Clone)]
pub struct PutResolution {
    pub record: ResolutionRecord,
}

impl Processor<PutResolution> for EventStore {
    type Output = PutOutcome;
    type Error = StoreError;

    async fn process(&self, command: PutResolution) -> Result<PutOutcome, StoreError> {
        self.put(command.record.correlation_id.clone(), command.record)
            .await
    }
}
