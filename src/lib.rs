pub mod audio;
pub mod config;
pub mod error;
pub mod import;
pub mod kernel;
pub mod outputs;
pub mod workflow;

pub use error::{KioskError, Result};
pub use kernel::registry::AudioRegistry;
pub use kernel::sequencer::CueSequencer;
