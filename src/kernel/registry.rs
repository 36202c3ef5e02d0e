use super::classifier::{classify, Rejection};
use super::key::{FixedRole, SemanticKey};
use super::store::{AssetStore, StoredAsset};
use super::telemetry::event::TelemetryEvent;
use super::telemetry::recorder::TelemetryRecorder;
use crate::error::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Playable handle for one registered cue. Only the registry creates these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioAsset {
    pub key: SemanticKey,
    pub file_name: String,
    pub path: PathBuf,
    blob: String,
}

/// One file handed over by the operator's folder selection.
#[derive(Debug, Clone)]
pub struct ImportFile {
    pub file_name: String,
    pub data: Vec<u8>,
}

impl ImportFile {
    pub fn new(file_name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSkipReason {
    Rejected(Rejection),
    /// The bytes could not be written to the blob directory.
    Storage(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub file_name: String,
    pub reason: ImportSkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Files bound to a key by this batch, overwrites included.
    pub registered: usize,
    pub skipped: usize,
    /// Subset of `registered` that replaced an existing binding.
    pub overwritten: usize,
    /// Subset of `registered` bound under an ad hoc key.
    pub ad_hoc: usize,
    pub skipped_files: Vec<SkippedFile>,
    /// Set when the merged map could not be written; the in-memory map still holds it.
    pub persist_error: Option<String>,
}

pub type AssetMap = HashMap<SemanticKey, Arc<AudioAsset>>;

/// Shared key → asset map with file-backed persistence.
///
/// Imports build the merged map aside and swap it in under a single write lock,
/// so concurrent `get` calls observe either the old or the new map. Index reads
/// and writes happen under that same lock.
///
/// A replaced blob is deleted only once an index without it has been written;
/// until then the last persisted index may still point at it.
pub struct AudioRegistry {
    store: AssetStore,
    assets: RwLock<AssetMap>,
    pending_release: Mutex<Vec<String>>,
    telemetry: Arc<TelemetryRecorder>,
}

impl AudioRegistry {
    /// Creates the registry and populates it from storage.
    pub fn init(store: AssetStore, telemetry: Arc<TelemetryRecorder>) -> Self {
        let registry = Self {
            store,
            assets: RwLock::new(HashMap::new()),
            pending_release: Mutex::new(Vec::new()),
            telemetry,
        };
        let loaded = registry.load();
        info!("Audio registry ready: {} cue(s) loaded", loaded.len());
        registry
    }

    /// Re-reads persisted state and installs it. Missing or corrupt state
    /// yields an empty map.
    pub fn load(&self) -> AssetMap {
        let mut assets = self.write();
        let stored = match self.store.load() {
            Ok(map) => map,
            Err(e) => {
                warn!("Persisted audio map unusable, starting empty: {}", e);
                self.telemetry.record(TelemetryEvent::PersistenceUnavailable {
                    operation: "load",
                });
                HashMap::new()
            }
        };

        let mut map = AssetMap::with_capacity(stored.len());
        for (key, entry) in stored {
            let path = self.store.blob_path(&entry.blob);
            if !path.is_file() {
                warn!("Cue {} refers to missing blob {}, dropping", key, path.display());
                continue;
            }
            map.insert(key.clone(), Arc::new(self.asset(key, entry)));
        }

        // Blobs the reloaded index still uses are no longer up for release.
        self.pending()
            .retain(|blob| !map.values().any(|asset| &asset.blob == blob));

        *assets = map.clone();
        map
    }

    pub fn get(&self, key: &SemanticKey) -> Option<Arc<AudioAsset>> {
        self.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Keys currently bound, sorted.
    pub fn keys(&self) -> Vec<SemanticKey> {
        let mut keys: Vec<_> = self.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Binding state of each fixed role, in table order.
    pub fn list_mappings(&self) -> Vec<(FixedRole, bool)> {
        let assets = self.read();
        FixedRole::ALL
            .into_iter()
            .map(|role| (role, assets.contains_key(&SemanticKey::Fixed(role))))
            .collect()
    }

    /// Number of storage cells that have a bound cue.
    pub fn cell_coverage(&self) -> usize {
        self.read()
            .keys()
            .filter(|k| matches!(k, SemanticKey::Cell(_)))
            .count()
    }

    /// Classifies and registers a batch, then persists the merged map.
    pub fn import_batch<I>(&self, files: I) -> ImportReport
    where
        I: IntoIterator<Item = ImportFile>,
    {
        let mut report = ImportReport::default();
        let mut staged: Vec<(SemanticKey, StoredAsset)> = Vec::new();

        for file in files {
            let key = match classify(&file.file_name) {
                Ok(key) => key,
                Err(rejection) => {
                    debug!("Skipping {}: {}", file.file_name, rejection);
                    report.skip(file.file_name, ImportSkipReason::Rejected(rejection));
                    continue;
                }
            };

            match self.store.put_blob(&file.file_name, &file.data) {
                Ok(blob) => staged.push((
                    key,
                    StoredAsset {
                        file_name: file.file_name,
                        blob,
                    },
                )),
                Err(e) => {
                    warn!("Could not store {}: {}", file.file_name, e);
                    report.skip(file.file_name, ImportSkipReason::Storage(e.to_string()));
                }
            }
        }

        let mut replaced = Vec::new();
        let mut released = Vec::new();
        {
            let mut assets = self.write();
            let mut merged = assets.clone();

            for (key, entry) in staged {
                debug!("Binding {} -> {}", key, entry.file_name);
                report.registered += 1;
                if key.is_ad_hoc() {
                    report.ad_hoc += 1;
                }
                let asset = Arc::new(self.asset(key.clone(), entry));
                if let Some(previous) = merged.insert(key, asset) {
                    report.overwritten += 1;
                    replaced.push(previous.blob.clone());
                }
            }

            if report.registered > 0 {
                match self.store.save(&Self::stored(&merged)) {
                    Ok(()) => {
                        released = self.take_pending();
                        released.extend(replaced);
                    }
                    Err(e) => {
                        warn!("Audio map not persisted, keeping it in memory: {}", e);
                        self.telemetry.record(TelemetryEvent::PersistenceUnavailable {
                            operation: "persist",
                        });
                        report.persist_error = Some(e.to_string());
                        self.defer_release(replaced);
                    }
                }
            }

            *assets = merged;
        }

        for blob in released {
            self.store.release_blob(&blob);
        }

        info!(
            "Import finished: registered={} overwritten={} skipped={} ad_hoc={}",
            report.registered, report.overwritten, report.skipped, report.ad_hoc
        );
        self.telemetry.record(TelemetryEvent::ImportCompleted {
            registered: report.registered,
            skipped: report.skipped,
            overwritten: report.overwritten,
        });
        report
    }

    /// Writes the current map to storage, then deletes blobs that earlier
    /// failed saves left referenced by the old index.
    pub fn persist(&self) -> Result<()> {
        let released = {
            let assets = self.write();
            if let Err(e) = self.store.save(&Self::stored(&assets)) {
                self.telemetry.record(TelemetryEvent::PersistenceUnavailable {
                    operation: "persist",
                });
                return Err(e);
            }
            self.take_pending()
        };

        for blob in released {
            self.store.release_blob(&blob);
        }
        Ok(())
    }

    /// Final persist at process exit.
    pub fn teardown(&self) {
        match self.persist() {
            Ok(()) => info!("Audio registry persisted ({} cue(s))", self.len()),
            Err(e) => warn!("Audio registry not persisted on shutdown: {}", e),
        }
    }

    fn take_pending(&self) -> Vec<String> {
        std::mem::take(&mut *self.pending())
    }

    fn defer_release(&self, blobs: Vec<String>) {
        if !blobs.is_empty() {
            debug!("Deferring release of {} replaced blob(s)", blobs.len());
            self.pending().extend(blobs);
        }
    }

    fn pending(&self) -> MutexGuard<'_, Vec<String>> {
        self.pending_release.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn asset(&self, key: SemanticKey, entry: StoredAsset) -> AudioAsset {
        AudioAsset {
            key,
            path: self.store.blob_path(&entry.blob),
            file_name: entry.file_name,
            blob: entry.blob,
        }
    }

    fn stored(assets: &AssetMap) -> HashMap<SemanticKey, StoredAsset> {
        assets
            .iter()
            .map(|(k, a)| {
                (
                    k.clone(),
                    StoredAsset {
                        file_name: a.file_name.clone(),
                        blob: a.blob.clone(),
                    },
                )
            })
            .collect()
    }

    // Merges are swapped in whole, so a poisoned map is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, AssetMap> {
        self.assets.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, AssetMap> {
        self.assets.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl ImportReport {
    fn skip(&mut self, file_name: String, reason: ImportSkipReason) {
        self.skipped += 1;
        self.skipped_files.push(SkippedFile { file_name, reason });
    }
}
