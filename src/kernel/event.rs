use super::key::SemanticKey;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Outcome of a single cue play attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayResult {
    Started,
    /// Nothing to play. Normal when an operator has not configured the cue.
    Skipped(SkipReason),
    /// Decode or device error. Reported, never fatal to the caller.
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoAssetBound,
    /// A `cell_<currentCell>` step ran without a usable cell binding.
    UnresolvedPlaceholder,
}

impl PlayResult {
    pub fn is_started(&self) -> bool {
        matches!(self, PlayResult::Started)
    }
}

impl fmt::Display for PlayResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayResult::Started => f.write_str("started"),
            PlayResult::Skipped(SkipReason::NoAssetBound) => f.write_str("skipped (no asset bound)"),
            PlayResult::Skipped(SkipReason::UnresolvedPlaceholder) => {
                f.write_str("skipped (unresolved placeholder)")
            }
            PlayResult::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Lifecycle of one sequence invocation. There is no failed state: steps are
/// best-effort and the sequence always completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceState {
    Pending,
    Running,
    Completed,
}

/// Identifies one invocation of a sequence in logs and telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        RunId(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// What happened at one step of a finished sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// Resolved key, `None` when the placeholder could not be resolved.
    pub key: Option<SemanticKey>,
    /// Time from sequence start to the play attempt.
    pub fired_at: Duration,
    pub result: PlayResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceReport {
    pub run_id: RunId,
    pub trigger: String,
    pub steps: Vec<StepOutcome>,
}
