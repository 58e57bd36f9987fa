//! Installer persistence
//!
//! Anonymous installers are keyed by their content hash and written once.
//! Team installers are keyed by slug and may be rewritten, but only by the
//! team that first claimed the slug. Updates to one slug are serialized by a
//! per-row lock; waiting on it is bounded.

use crate::error::{PersistenceError, Result};
use crate::ids::is_sha;
use crate::spec::InstallerSpec;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kurl_versions::LATEST;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// How long a team upsert waits for a row held by a concurrent writer
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// What a save did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Inserted,
    /// The stored document already had the same content
    Unchanged,
    Updated,
}

/// A stored installer document
#[derive(Debug, Clone)]
pub struct StoredInstaller {
    pub id: String,
    pub team_id: Option<String>,
    /// Canonical YAML
    pub yaml: String,
    /// Incremented on every update
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

impl StoredInstaller {
    fn new(spec: &InstallerSpec) -> Self {
        Self {
            id: spec.id.clone(),
            team_id: spec.team_id.clone(),
            yaml: spec.to_yaml(),
            revision: 0,
            updated_at: Utc::now(),
        }
    }

    /// Parse the stored document back into a spec carrying this row's identity
    pub fn spec(&self) -> std::result::Result<InstallerSpec, PersistenceError> {
        let mut spec = InstallerSpec::parse(&self.yaml, self.team_id.as_deref()).map_err(|source| {
            PersistenceError::Corrupt {
                id: self.id.clone(),
                source,
            }
        })?;
        spec.id = self.id.clone();
        Ok(spec)
    }
}

/// Storage for installer documents
#[async_trait]
pub trait InstallerStore: Send + Sync {
    /// Look up an installer by id. `latest` always resolves to
    /// [`InstallerSpec::latest`].
    async fn get(&self, id: &str) -> Result<Option<InstallerSpec>>;

    /// Insert an anonymous installer unless its id is already stored
    async fn save_anonymous(&self, spec: &InstallerSpec) -> Result<UpsertOutcome>;

    /// Insert or update a team installer. Fails with
    /// [`PersistenceError::Forbidden`] when another team owns the slug.
    async fn save_team(&self, spec: &InstallerSpec) -> Result<UpsertOutcome>;
}

type Row = Arc<Mutex<StoredInstaller>>;

/// In-process [`InstallerStore`] with row locks
#[derive(Debug)]
pub struct MemoryInstallerStore {
    rows: Mutex<HashMap<String, Row>>,
    lock_timeout: Duration,
}

impl Default for MemoryInstallerStore {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}

impl MemoryInstallerStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            lock_timeout,
        }
    }

    /// Raw stored record, for inspection
    pub async fn record(&self, id: &str) -> Option<StoredInstaller> {
        let row = self.rows.lock().await.get(id).cloned()?;
        let record = row.lock().await.clone();
        Some(record)
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

#[async_trait]
impl InstallerStore for MemoryInstallerStore {
    async fn get(&self, id: &str) -> Result<Option<InstallerSpec>> {
        if id == LATEST {
            return Ok(Some(InstallerSpec::latest()));
        }
        let Some(row) = self.rows.lock().await.get(id).cloned() else {
            return Ok(None);
        };
        let record = row.lock().await;
        Ok(Some(record.spec()?))
    }

    async fn save_anonymous(&self, spec: &InstallerSpec) -> Result<UpsertOutcome> {
        if spec.id.is_empty() {
            return Err(PersistenceError::invalid_record("Installer ID is required").into());
        }
        if spec.team_id.is_some() {
            return Err(PersistenceError::invalid_record("Anonymous installers must not have team ID").into());
        }
        if !is_sha(&spec.id) {
            return Err(PersistenceError::invalid_record("Anonymous installers must have generated ID").into());
        }

        let mut rows = self.rows.lock().await;
        if rows.contains_key(&spec.id) {
            debug!("Installer {} already stored", spec.id);
            return Ok(UpsertOutcome::Unchanged);
        }
        rows.insert(spec.id.clone(), Arc::new(Mutex::new(StoredInstaller::new(spec))));
        info!("Stored installer {}", spec.id);
        Ok(UpsertOutcome::Inserted)
    }

    async fn save_team(&self, spec: &InstallerSpec) -> Result<UpsertOutcome> {
        if spec.id.is_empty() {
            return Err(PersistenceError::invalid_record("Installer ID is required").into());
        }
        if spec.team_id.is_none() {
            return Err(PersistenceError::invalid_record("Team installers must have team ID").into());
        }
        if is_sha(&spec.id) {
            return Err(PersistenceError::invalid_record("Team installers must not have generated ID").into());
        }

        let row = {
            let mut rows = self.rows.lock().await;
            match rows.get(&spec.id) {
                Some(row) => Arc::clone(row),
                None => {
                    rows.insert(spec.id.clone(), Arc::new(Mutex::new(StoredInstaller::new(spec))));
                    info!("Stored installer {} for team", spec.id);
                    return Ok(UpsertOutcome::Inserted);
                }
            }
        };

        let mut record = tokio::time::timeout(self.lock_timeout, row.lock_owned())
            .await
            .map_err(|_| PersistenceError::Timeout {
                id: spec.id.clone(),
                waited: self.lock_timeout,
            })?;

        if record.team_id != spec.team_id {
            return Err(PersistenceError::Forbidden { id: spec.id.clone() }.into());
        }
        if record.spec()?.spec_is_equal(spec) {
            debug!("Installer {} is unchanged", spec.id);
            return Ok(UpsertOutcome::Unchanged);
        }

        record.yaml = spec.to_yaml();
        record.revision += 1;
        record.updated_at = Utc::now();
        info!("Updated installer {} to revision {}", spec.id, record.revision);
        Ok(UpsertOutcome::Updated)
    }
}
