//! Audio-cue core: classification, registry, playback and sequencing.

pub mod classifier;
pub mod event;
pub mod key;
pub mod player;
pub mod registry;
pub mod sequence;
pub mod sequencer;
pub mod store;
pub mod telemetry;
