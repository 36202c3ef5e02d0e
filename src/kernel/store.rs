use super::key::SemanticKey;
use crate::error::{KioskError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Namespace under which the key map is stored inside the index document.
pub const STORAGE_NAMESPACE: &str = "pickup-kiosk.audio-map";

const INDEX_FILE: &str = "audio-map.json";
const BLOB_DIR: &str = "cues";

/// Durable reference to one imported asset: enough to re-open it after restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAsset {
    /// Name the operator imported the file under.
    pub file_name: String,
    /// Blob file name inside the store's blob directory.
    pub blob: String,
}

/// The JSON document written to disk. Other namespaces found in the file are
/// kept as-is so a shared settings file is not clobbered.
#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexDocument {
    #[serde(flatten)]
    namespaces: BTreeMap<String, serde_json::Value>,
}

/// Directory-backed store for the key map and the imported audio blobs.
#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    pub fn blob_dir(&self) -> PathBuf {
        self.root.join(BLOB_DIR)
    }

    pub fn blob_path(&self, blob: &str) -> PathBuf {
        self.blob_dir().join(blob)
    }

    /// Reads the persisted key map. A missing index is an empty map, not an error.
    pub fn load(&self) -> Result<HashMap<SemanticKey, StoredAsset>> {
        let path = self.index_path();
        if !path.exists() {
            debug!("No audio map at {}, starting empty", path.display());
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(&path)?;
        let doc: IndexDocument = serde_json::from_str(&content)?;
        let Some(section) = doc.namespaces.get(STORAGE_NAMESPACE) else {
            return Ok(HashMap::new());
        };

        let raw: BTreeMap<String, StoredAsset> = serde_json::from_value(section.clone())?;
        let mut map = HashMap::with_capacity(raw.len());
        for (key, asset) in raw {
            match key.parse::<SemanticKey>() {
                Ok(key) => {
                    map.insert(key, asset);
                }
                Err(e) => warn!("Dropping persisted entry {:?}: {}", key, e),
            }
        }
        Ok(map)
    }

    /// Writes the key map under its namespace, replacing the index atomically.
    pub fn save(&self, map: &HashMap<SemanticKey, StoredAsset>) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let path = self.index_path();

        // Preserve foreign namespaces; an unreadable index is simply replaced.
        let mut doc = fs::read_to_string(&path)
            .ok()
            .and_then(|c| serde_json::from_str::<IndexDocument>(&c).ok())
            .unwrap_or_default();

        let ordered: BTreeMap<String, &StoredAsset> =
            map.iter().map(|(k, v)| (k.to_string(), v)).collect();
        doc.namespaces
            .insert(STORAGE_NAMESPACE.to_string(), serde_json::to_value(ordered)?);

        let json = serde_json::to_string_pretty(&doc)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Copies imported bytes into a fresh blob and returns its name.
    pub fn put_blob(&self, file_name: &str, data: &[u8]) -> Result<String> {
        let dir = self.blob_dir();
        fs::create_dir_all(&dir)?;

        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| KioskError::Storage(format!("{} has no extension", file_name)))?;
        let blob = format!("{}.{}", Uuid::new_v4(), ext);
        fs::write(dir.join(&blob), data)?;
        Ok(blob)
    }

    /// Deletes a blob that no key refers to any more. Failure only leaks disk space.
    pub fn release_blob(&self, blob: &str) {
        let path = self.blob_path(blob);
        if let Err(e) = fs::remove_file(&path) {
            warn!("Could not release {}: {}", path.display(), e);
        }
    }
}
