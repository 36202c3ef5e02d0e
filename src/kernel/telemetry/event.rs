use crate::kernel::event::{PlayResult, RunId, SequenceState, SkipReason};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryEvent {
    ImportCompleted {
        registered: usize,
        skipped: usize,
        overwritten: usize,
    },

    CueAttempt {
        key: String,
        outcome: CueOutcomeKind,
    },

    SequenceLifecycle {
        run_id: RunId,
        trigger: String,
        state: SequenceState,
    },

    PersistenceUnavailable {
        operation: &'static str,
    },
}

/// PlayResult with the failure text stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueOutcomeKind {
    Started,
    NoAssetBound,
    UnresolvedPlaceholder,
    Failed,
}

impl From<&PlayResult> for CueOutcomeKind {
    fn from(result: &PlayResult) -> Self {
        match result {
            PlayResult::Started => CueOutcomeKind::Started,
            PlayResult::Skipped(SkipReason::NoAssetBound) => CueOutcomeKind::NoAssetBound,
            PlayResult::Skipped(SkipReason::UnresolvedPlaceholder) => {
                CueOutcomeKind::UnresolvedPlaceholder
            }
            PlayResult::Failed(_) => CueOutcomeKind::Failed,
        }
    }
}
