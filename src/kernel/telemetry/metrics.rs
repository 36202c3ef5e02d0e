use super::event::{CueOutcomeKind, TelemetryEvent};
use crate::kernel::event::SequenceState;
use std::collections::VecDeque;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub cue_stats: CueStats,
    pub sequence_stats: SequenceStats,
    pub import_stats: ImportStats,
    pub persistence_failures: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CueStats {
    pub attempts: u64,
    pub started: u64,
    pub missing: u64,
    pub unresolved: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceStats {
    pub started: u64,
    pub completed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub batches: u64,
    pub registered: u64,
    pub overwritten: u64,
    pub skipped: u64,
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();

    for event in events {
        match event {
            TelemetryEvent::ImportCompleted { registered, skipped, overwritten } => {
                snap.import_stats.batches += 1;
                snap.import_stats.registered += *registered as u64;
                snap.import_stats.skipped += *skipped as u64;
                snap.import_stats.overwritten += *overwritten as u64;
            }
            TelemetryEvent::CueAttempt { outcome, .. } => {
                snap.cue_stats.attempts += 1;
                match outcome {
                    CueOutcomeKind::Started => snap.cue_stats.started += 1,
                    CueOutcomeKind::NoAssetBound => snap.cue_stats.missing += 1,
                    CueOutcomeKind::UnresolvedPlaceholder => snap.cue_stats.unresolved += 1,
                    CueOutcomeKind::Failed => snap.cue_stats.failed += 1,
                }
            }
            TelemetryEvent::SequenceLifecycle { state, .. } => match state {
                SequenceState::Running => snap.sequence_stats.started += 1,
                SequenceState::Completed => snap.sequence_stats.completed += 1,
                SequenceState::Pending => {}
            },
            TelemetryEvent::PersistenceUnavailable { .. } => snap.persistence_failures += 1,
        }
    }

    snap
}
