use super::event::{PlayResult, RunId, SequenceReport, SequenceState, SkipReason, StepOutcome};
use super::key::SemanticKey;
use super::player::CuePlayer;
use super::sequence::{Bindings, CueSequence, SequenceBook, Trigger};
use super::telemetry::event::TelemetryEvent;
use super::telemetry::recorder::TelemetryRecorder;
use crate::error::{KioskError, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{info, warn};

/// Handle to one running sequence. Dropping it does not stop the sequence.
pub struct RunHandle {
    pub run_id: RunId,
    state: watch::Receiver<SequenceState>,
    join: JoinHandle<SequenceReport>,
}

impl RunHandle {
    pub fn state(&self) -> SequenceState {
        *self.state.borrow()
    }

    /// Waits for every step to fire. `None` only if the runtime shut down first.
    pub async fn finished(self) -> Option<SequenceReport> {
        self.join.await.ok()
    }
}

/// Fires the steps of a cue sequence at their offsets from the start.
///
/// Each step is its own timer task on the ambient Tokio runtime, and the sink
/// is started from the blocking pool so a slow decode never delays another
/// step's timer. A step that is skipped or fails never holds back the others,
/// and nothing cancels a sequence once started: two overlapping triggers both
/// sound.
pub struct CueSequencer {
    player: CuePlayer,
    book: SequenceBook,
    telemetry: Arc<TelemetryRecorder>,
}

impl CueSequencer {
    pub fn new(player: CuePlayer, book: SequenceBook, telemetry: Arc<TelemetryRecorder>) -> Self {
        Self {
            player,
            book,
            telemetry,
        }
    }

    pub fn player(&self) -> &CuePlayer {
        &self.player
    }

    pub fn book(&self) -> &SequenceBook {
        &self.book
    }

    pub fn trigger(&self, trigger: Trigger, bindings: &Bindings) -> RunHandle {
        self.run(&trigger.sequence(), bindings)
    }

    /// Runs a built-in or authored sequence by name.
    pub fn run_named(&self, name: &str, bindings: &Bindings) -> Result<RunHandle> {
        let sequence = self
            .book
            .get(name)
            .ok_or_else(|| KioskError::UnknownTrigger(name.to_string()))?;
        Ok(self.run(sequence, bindings))
    }

    /// Schedules every step and returns immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn run(&self, sequence: &CueSequence, bindings: &Bindings) -> RunHandle {
        let run_id = RunId::new();
        let start = Instant::now();
        let (state_tx, state_rx) = watch::channel(SequenceState::Pending);

        let steps: Vec<JoinHandle<StepOutcome>> = sequence
            .steps
            .iter()
            .map(|step| {
                let key = step.target.resolve(bindings);
                let target = step.target.to_string();
                let deadline = start + step.delay;
                let player = self.player.clone();
                let trigger = sequence.name.clone();

                tokio::spawn(async move {
                    sleep_until(deadline).await;
                    let fired_at = start.elapsed();
                    let result = match &key {
                        Some(key) => player.play_blocking(key.clone()).await,
                        None => {
                            warn!("{}: no usable binding for {}, skipping step", trigger, target);
                            let result = PlayResult::Skipped(SkipReason::UnresolvedPlaceholder);
                            player.note(target, &result);
                            result
                        }
                    };
                    StepOutcome {
                        key,
                        fired_at,
                        result,
                    }
                })
            })
            .collect();

        let trigger = sequence.name.clone();
        let telemetry = Arc::clone(&self.telemetry);
        let join = tokio::spawn(async move {
            lifecycle(&telemetry, run_id, &trigger, SequenceState::Running);
            state_tx.send_replace(SequenceState::Running);

            let mut outcomes = Vec::with_capacity(steps.len());
            for step in steps {
                match step.await {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(e) => warn!("{} [{}]: step task lost: {}", trigger, run_id, e),
                }
            }

            let started = outcomes.iter().filter(|o| o.result.is_started()).count();
            info!(
                "{} [{}] completed: {}/{} cue(s) played",
                trigger,
                run_id,
                started,
                outcomes.len()
            );
            lifecycle(&telemetry, run_id, &trigger, SequenceState::Completed);
            state_tx.send_replace(SequenceState::Completed);

            SequenceReport {
                run_id,
                trigger,
                steps: outcomes,
            }
        });

        RunHandle {
            run_id,
            state: state_rx,
            join,
        }
    }

    /// Plays one key immediately, outside any sequence.
    pub fn preview(&self, key: &SemanticKey) -> PlayResult {
        self.player.play(key)
    }
}

fn lifecycle(telemetry: &TelemetryRecorder, run_id: RunId, trigger: &str, state: SequenceState) {
    telemetry.record(TelemetryEvent::SequenceLifecycle {
        run_id,
        trigger: trigger.to_string(),
        state,
    });
}
