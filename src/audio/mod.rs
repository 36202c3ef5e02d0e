//! Audio output path: decode, resample, and the device sink.

pub mod decode;
pub mod output;
pub mod resample;

use crate::kernel::registry::AudioAsset;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("device error: {0}")]
    Device(String),
}

/// Something that can start playing a registered asset.
///
/// `start` returns once playback has begun; it does not wait for the cue to
/// finish. Overlapping calls must be allowed to sound together.
pub trait AudioSink: Send + Sync {
    fn start(&self, asset: &AudioAsset) -> Result<(), SinkError>;
}
