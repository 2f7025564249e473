//! Persistence for weather report resources.

use std::{
    collections::BTreeMap,
    fmt::Debug,
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::{fs, sync::RwLock, time::Instant};
use tracing::{debug, warn};

use crate::resource::{ObjectKey, ReportResource, ReportSpec};

const REPORT_EXTENSION: &str = "toml";

/// How long a writer waits for another writer's lock on the same report.
const LOCK_TIMEOUT: Duration = Duration::from_secs(5);
const LOCK_POLL: Duration = Duration::from_millis(20);
/// A lock file older than this was left behind by a crashed writer.
const STALE_LOCK: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Report '{0}' not found")]
    NotFound(ObjectKey),

    #[error("Invalid report key '{0}'")]
    InvalidKey(ObjectKey),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse report file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Report is locked by another writer: {}", path.display())]
    Locked { path: PathBuf },

    #[error("Failed to serialize report '{key}': {source}")]
    Serialize {
        key: ObjectKey,
        #[source]
        source: toml::ser::Error,
    },
}

/// Storage of report resources, as seen by the reconciler and the controller.
#[async_trait]
pub trait ReportStore: Send + Sync + Debug {
    async fn get(&self, key: &ObjectKey) -> Result<ReportResource, StoreError>;

    /// Write `report.status` over the stored report. The stored spec is kept.
    async fn update_status(&self, report: &ReportResource) -> Result<(), StoreError>;

    async fn list(&self) -> Result<Vec<ObjectKey>, StoreError>;

    /// Create a report or replace its spec, keeping any existing status.
    async fn apply(&self, key: ObjectKey, spec: ReportSpec) -> Result<ReportResource, StoreError>;

    async fn delete(&self, key: &ObjectKey) -> Result<(), StoreError>;
}

/// Reports held in memory, ordered by key.
#[derive(Debug, Default)]
pub struct MemoryStore {
    reports: RwLock<BTreeMap<ObjectKey, ReportResource>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn get(&self, key: &ObjectKey) -> Result<ReportResource, StoreError> {
        self.reports
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    async fn update_status(&self, report: &ReportResource) -> Result<(), StoreError> {
        let mut reports = self.reports.write().await;
        let stored = reports
            .get_mut(&report.metadata)
            .ok_or_else(|| StoreError::NotFound(report.metadata.clone()))?;
        stored.status = report.status.clone();
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ObjectKey>, StoreError> {
        Ok(self.reports.read().await.keys().cloned().collect())
    }

    async fn apply(&self, key: ObjectKey, spec: ReportSpec) -> Result<ReportResource, StoreError> {
        if !key.is_valid() {
            return Err(StoreError::InvalidKey(key));
        }

        let mut reports = self.reports.write().await;
        let report = reports
            .entry(key.clone())
            .and_modify(|r| r.spec = spec.clone())
            .or_insert_with(|| ReportResource::new(key, spec));
        Ok(report.clone())
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), StoreError> {
        self.reports
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }
}

/// One TOML document per report at `<root>/<namespace>/<name>.toml`.
///
/// Writers take `<name>.toml.lock` for the whole read-modify-write, so an
/// `apply` from one process and a status update from another never drop
/// each other's changes. Readers take no lock; renames keep them consistent.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &ObjectKey) -> Result<PathBuf, StoreError> {
        if !key.is_valid() {
            return Err(StoreError::InvalidKey(key.clone()));
        }
        Ok(self
            .root
            .join(&key.namespace)
            .join(format!("{}.{REPORT_EXTENSION}", key.name)))
    }

    async fn read(&self, key: &ObjectKey) -> Result<ReportResource, StoreError> {
        let path = self.path_for(key)?;

        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(key.clone()));
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let mut report: ReportResource =
            toml::from_str(&contents).map_err(|source| StoreError::Parse {
                path: path.clone(),
                source,
            })?;
        // The file location is authoritative for identity.
        report.metadata = key.clone();
        Ok(report)
    }

    async fn write(&self, report: &ReportResource) -> Result<(), StoreError> {
        let path = self.path_for(&report.metadata)?;

        let contents = toml::to_string_pretty(report).map_err(|source| StoreError::Serialize {
            key: report.metadata.clone(),
            source,
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        // Write then rename so readers never see a half-written report.
        let tmp = path.with_extension(format!("{REPORT_EXTENSION}.{}.tmp", std::process::id()));
        fs::write(&tmp, contents)
            .await
            .map_err(|source| StoreError::Io {
                path: tmp.clone(),
                source,
            })?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;

        debug!(key = %report.metadata, path = %path.display(), "Wrote report");
        Ok(())
    }

    fn lock_path(&self, key: &ObjectKey) -> Result<PathBuf, StoreError> {
        Ok(self
            .path_for(key)?
            .with_extension(format!("{REPORT_EXTENSION}.lock")))
    }

    /// Take the writer lock for `key`, waiting up to `LOCK_TIMEOUT`.
    async fn lock(&self, key: &ObjectKey) -> Result<WriteLock, StoreError> {
        let path = self.lock_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let deadline = Instant::now() + LOCK_TIMEOUT;
        loop {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(_) => return Ok(WriteLock { path }),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    if lock_is_stale(&path).await {
                        warn!(path = %path.display(), "Removing stale report lock");
                        // Losing this race to another writer is fine.
                        let _ = fs::remove_file(&path).await;
                        continue;
                    }
                    if Instant::now() >= deadline {
                        return Err(StoreError::Locked { path });
                    }
                    tokio::time::sleep(LOCK_POLL).await;
                }
                Err(source) => return Err(StoreError::Io { path, source }),
            }
        }
    }
}

/// Held for the duration of one write; removes the lock file on drop.
#[derive(Debug)]
struct WriteLock {
    path: PathBuf,
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %err, "Failed to release report lock");
        }
    }
}

async fn lock_is_stale(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .and_then(|meta| meta.modified())
        .map(|modified| modified.elapsed().unwrap_or_default() > STALE_LOCK)
        .unwrap_or(false)
}

#[async_trait]
impl ReportStore for FileStore {
    async fn get(&self, key: &ObjectKey) -> Result<ReportResource, StoreError> {
        self.read(key).await
    }

    async fn update_status(&self, report: &ReportResource) -> Result<(), StoreError> {
        let _lock = self.lock(&report.metadata).await?;
        let mut stored = self.read(&report.metadata).await?;
        stored.status = report.status.clone();
        self.write(&stored).await
    }

    async fn list(&self) -> Result<Vec<ObjectKey>, StoreError> {
        let mut keys = Vec::new();

        let mut namespaces = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(keys),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.root.clone(),
                    source,
                });
            }
        };

        while let Some(ns_entry) = next_entry(&mut namespaces, &self.root).await? {
            let ns_path = ns_entry.path();
            let is_dir = ns_entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            if !is_dir {
                continue;
            }
            let Some(namespace) = ns_path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            let mut files = fs::read_dir(&ns_path)
                .await
                .map_err(|source| StoreError::Io {
                    path: ns_path.clone(),
                    source,
                })?;

            while let Some(file) = next_entry(&mut files, &ns_path).await? {
                let path = file.path();
                if path.extension().and_then(|e| e.to_str()) != Some(REPORT_EXTENSION) {
                    continue;
                }
                let Some(name) = path.file_stem().and_then(|n| n.to_str()) else {
                    continue;
                };

                let key = ObjectKey::new(namespace, name);
                if key.is_valid() {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn apply(&self, key: ObjectKey, spec: ReportSpec) -> Result<ReportResource, StoreError> {
        let _lock = self.lock(&key).await?;
        let report = match self.read(&key).await {
            Ok(mut existing) => {
                existing.spec = spec;
                existing
            }
            Err(StoreError::NotFound(_)) => ReportResource::new(key, spec),
            Err(err) => return Err(err),
        };

        self.write(&report).await?;
        Ok(report)
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let _lock = self.lock(key).await?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.clone()))
            }
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

async fn next_entry(
    dir: &mut fs::ReadDir,
    path: &Path,
) -> Result<Option<fs::DirEntry>, StoreError> {
    dir.next_entry().await.map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ReportState, Units};

    fn spec(location: &str) -> ReportSpec {
        ReportSpec {
            location: location.into(),
            units: Units::Standard,
        }
    }

    #[tokio::test]
    async fn memory_store_apply_keeps_status() {
        let store = MemoryStore::new();
        let key = ObjectKey::new("default", "berlin");

        let mut report = store.apply(key.clone(), spec("Berlin")).await.unwrap();
        report.status.state = ReportState::Success;
        store.update_status(&report).await.unwrap();

        let updated = store.apply(key.clone(), spec("Berlin, DE")).await.unwrap();
        assert_eq!(updated.spec.location, "Berlin, DE");
        assert_eq!(updated.status.state, ReportState::Success);
    }

    #[tokio::test]
    async fn memory_store_update_status_ignores_spec_changes() {
        let store = MemoryStore::new();
        let key = ObjectKey::new("default", "berlin");
        let mut report = store.apply(key.clone(), spec("Berlin")).await.unwrap();

        report.spec.location = "Paris".into();
        report.status.temperature = "20".into();
        store.update_status(&report).await.unwrap();

        let stored = store.get(&key).await.unwrap();
        assert_eq!(stored.spec.location, "Berlin");
        assert_eq!(stored.status.temperature, "20");
    }

    #[tokio::test]
    async fn memory_store_missing_report() {
        let store = MemoryStore::new();
        let key = ObjectKey::new("default", "nowhere");

        assert!(matches!(store.get(&key).await, Err(StoreError::NotFound(_))));
        assert!(matches!(store.delete(&key).await, Err(StoreError::NotFound(_))));

        let report = ReportResource::new(key, spec("Nowhere"));
        assert!(matches!(
            store.update_status(&report).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn file_store_writer_waits_for_lock() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let key = ObjectKey::new("default", "berlin");
        let mut stale = store.apply(key.clone(), spec("Berlin")).await.unwrap();

        let lock = store.lock(&key).await.unwrap();
        let pending = tokio::spawn({
            let store = store.clone();
            let key = key.clone();
            async move { store.apply(key, spec("Paris")).await }
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!pending.is_finished());

        drop(lock);
        pending.await.unwrap().unwrap();

        // A status written from an older copy keeps the newer spec.
        stale.status.state = ReportState::Success;
        store.update_status(&stale).await.unwrap();

        let stored = store.get(&key).await.unwrap();
        assert_eq!(stored.spec.location, "Paris");
        assert_eq!(stored.status.state, ReportState::Success);
        assert!(!store.lock_path(&key).unwrap().exists());
        assert_eq!(store.list().await.unwrap(), vec![key]);
    }

    #[tokio::test]
    async fn file_store_removes_stale_lock() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let key = ObjectKey::new("default", "berlin");

        let lock_path = store.lock_path(&key).unwrap();
        std::fs::create_dir_all(lock_path.parent().unwrap()).unwrap();
        let file = std::fs::File::create(&lock_path).unwrap();
        file.set_modified(std::time::SystemTime::now() - Duration::from_secs(60))
            .unwrap();
        drop(file);

        store.apply(key.clone(), spec("Berlin")).await.unwrap();
        assert!(!lock_path.exists());
    }

    #[tokio::test]
    async fn memory_store_rejects_invalid_keys() {
        let store = MemoryStore::new();
        let err = store
            .apply(ObjectKey::new("default", "Not Valid"), spec("Berlin"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }
}
