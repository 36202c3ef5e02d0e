use crate::audio::{AudioSink, SinkError};
use crate::kernel::key::SemanticKey;
use crate::kernel::registry::AudioAsset;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedCue {
    pub key: SemanticKey,
    pub file_name: String,
    pub at: Instant,
}

/// Sink that plays nothing and remembers what it was asked to start.
///
/// Used for `--dry-run` and by the tests. Keys marked with `fail_on` report a
/// decode failure instead.
#[derive(Debug, Default)]
pub struct RecordingSink {
    started: Mutex<Vec<StartedCue>>,
    failing: Mutex<HashSet<SemanticKey>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, key: SemanticKey) {
        lock(&self.failing).insert(key);
    }

    pub fn started(&self) -> Vec<StartedCue> {
        lock(&self.started).clone()
    }

    pub fn started_keys(&self) -> Vec<SemanticKey> {
        lock(&self.started).iter().map(|c| c.key.clone()).collect()
    }
}

impl AudioSink for RecordingSink {
    fn start(&self, asset: &AudioAsset) -> Result<(), SinkError> {
        if lock(&self.failing).contains(&asset.key) {
            return Err(SinkError::Decode(format!("{} is not playable", asset.file_name)));
        }
        info!("[CUE] {} ({})", asset.key, asset.file_name);
        lock(&self.started).push(StartedCue {
            key: asset.key.clone(),
            file_name: asset.file_name.clone(),
            at: Instant::now(),
        });
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
