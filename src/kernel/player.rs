use super::event::{PlayResult, SkipReason};
use super::key::SemanticKey;
use super::registry::AudioRegistry;
use super::telemetry::event::TelemetryEvent;
use super::telemetry::recorder::TelemetryRecorder;
use crate::audio::AudioSink;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Resolves keys through the registry and starts them on the sink.
///
/// Calls are independent: nothing is queued or deduplicated, ordering is the
/// sequencer's job.
#[derive(Clone)]
pub struct CuePlayer {
    registry: Arc<AudioRegistry>,
    sink: Arc<dyn AudioSink>,
    telemetry: Arc<TelemetryRecorder>,
}

impl CuePlayer {
    pub fn new(
        registry: Arc<AudioRegistry>,
        sink: Arc<dyn AudioSink>,
        telemetry: Arc<TelemetryRecorder>,
    ) -> Self {
        Self {
            registry,
            sink,
            telemetry,
        }
    }

    pub fn registry(&self) -> &Arc<AudioRegistry> {
        &self.registry
    }

    pub fn play(&self, key: &SemanticKey) -> PlayResult {
        let result = match self.registry.get(key) {
            None => {
                debug!("No cue bound for {}", key);
                PlayResult::Skipped(SkipReason::NoAssetBound)
            }
            Some(asset) => match self.sink.start(&asset) {
                Ok(()) => {
                    info!("Playing {} ({})", key, asset.file_name);
                    PlayResult::Started
                }
                Err(e) => {
                    warn!("Cue {} failed to play: {}", key, e);
                    PlayResult::Failed(e.to_string())
                }
            },
        };

        self.note(key.to_string(), &result);
        result
    }

    /// `play` on the blocking pool. Sink start can decode and resample a whole
    /// file, which must not hold up the runtime's timers.
    pub async fn play_blocking(&self, key: SemanticKey) -> PlayResult {
        let player = self.clone();
        let name = key.to_string();
        match tokio::task::spawn_blocking(move || player.play(&key)).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Cue {} playback task failed: {}", name, e);
                let result = PlayResult::Failed(e.to_string());
                self.note(name, &result);
                result
            }
        }
    }

    /// Records one play attempt in telemetry.
    pub(crate) fn note(&self, key: String, result: &PlayResult) {
        self.telemetry.record(TelemetryEvent::CueAttempt {
            key,
            outcome: result.into(),
        });
    }
}
