//! Kiosk configuration.
//!
//! Resolution order:
//! 1. Explicit path (`--config` or `PICKUP_KIOSK_CONFIG`, handled by the CLI)
//! 2. `<config_dir>/pickup-kiosk/config.toml`
//! 3. Built-in defaults

use crate::error::{KioskError, Result};
use crate::kernel::sequence::{CueSequence, CueStep, SequenceBook};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const APP_DIR: &str = "pickup-kiosk";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    /// Where the audio map and imported cue files live.
    pub data_dir: PathBuf,
    /// Output device name; host default when unset or not found.
    pub output_device: Option<String>,
    /// Master cue volume, 0.0 - 1.0.
    pub volume: f32,
    /// Operator-authored sequences, run by name.
    #[serde(rename = "sequence")]
    pub sequences: Vec<SequenceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SequenceConfig {
    pub name: String,
    pub steps: Vec<StepConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StepConfig {
    /// A cue key, or `cell_<currentCell>`.
    pub key: String,
    #[serde(default)]
    pub delay_ms: u64,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output_device: None,
            volume: 1.0,
            sequences: Vec::new(),
        }
    }
}

impl KioskConfig {
    /// Loads from `explicit` when given (it must exist), else from the user
    /// config directory, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| KioskError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: KioskConfig = toml::from_str(content)?;
        config.volume = config.volume.clamp(0.0, 1.0);
        Ok(config)
    }

    /// Built-in sequences plus the authored ones.
    pub fn sequence_book(&self) -> Result<SequenceBook> {
        let mut book = SequenceBook::builtin();
        for authored in &self.sequences {
            let steps = authored
                .steps
                .iter()
                .map(|s| Ok(CueStep::new(s.key.parse()?, s.delay_ms)))
                .collect::<Result<Vec<_>>>()?;
            book.author(CueSequence {
                name: authored.name.clone(),
                steps,
            })?;
        }
        Ok(book)
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE))
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("./pickup-kiosk-data"))
}
