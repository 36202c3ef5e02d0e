use super::key::{FixedRole, SemanticKey};
use crate::error::KioskError;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Binding name for the cell assigned by the workflow.
pub const CURRENT_CELL: &str = "currentCell";

/// Spelling of the cell placeholder in authored sequences.
pub const CELL_PLACEHOLDER: &str = "cell_<currentCell>";

/// What a step plays: a fixed key, or the cell bound at run time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CueTarget {
    Key(SemanticKey),
    CurrentCell,
}

impl CueTarget {
    /// Resolves against run-time bindings. `None` when the cell is unbound or
    /// out of range.
    pub fn resolve(&self, bindings: &Bindings) -> Option<SemanticKey> {
        match self {
            CueTarget::Key(key) => Some(key.clone()),
            CueTarget::CurrentCell => bindings
                .get(CURRENT_CELL)
                .and_then(|n| SemanticKey::cell(n).ok()),
        }
    }
}

impl FromStr for CueTarget {
    type Err = KioskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == CELL_PLACEHOLDER {
            return Ok(CueTarget::CurrentCell);
        }
        s.parse::<SemanticKey>()
            .map(CueTarget::Key)
            .map_err(|e| KioskError::Config(format!("bad cue key {:?}: {}", s, e)))
    }
}

impl fmt::Display for CueTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CueTarget::Key(key) => key.fmt(f),
            CueTarget::CurrentCell => f.write_str(CELL_PLACEHOLDER),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueStep {
    pub target: CueTarget,
    /// Offset from sequence start, not from the previous step.
    pub delay: Duration,
}

impl CueStep {
    pub fn new(target: CueTarget, delay_ms: u64) -> Self {
        Self {
            target,
            delay: Duration::from_millis(delay_ms),
        }
    }

    fn role(role: FixedRole, delay_ms: u64) -> Self {
        Self::new(CueTarget::Key(role.into()), delay_ms)
    }

    fn cell(delay_ms: u64) -> Self {
        Self::new(CueTarget::CurrentCell, delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueSequence {
    pub name: String,
    pub steps: Vec<CueStep>,
}

/// Workflow events with a built-in sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    OnScan,
    OnPhoneSearch,
    OnIssueComplete,
    OnAccept,
    OnReturn,
}

impl Trigger {
    pub const ALL: [Trigger; 5] = [
        Trigger::OnScan,
        Trigger::OnPhoneSearch,
        Trigger::OnIssueComplete,
        Trigger::OnAccept,
        Trigger::OnReturn,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Trigger::OnScan => "onScan",
            Trigger::OnPhoneSearch => "onPhoneSearch",
            Trigger::OnIssueComplete => "onIssueComplete",
            Trigger::OnAccept => "onAccept",
            Trigger::OnReturn => "onReturn",
        }
    }

    /// Whether the sequence needs a `currentCell` binding.
    pub fn needs_cell(&self) -> bool {
        matches!(self, Trigger::OnScan | Trigger::OnPhoneSearch)
    }

    pub fn sequence(&self) -> CueSequence {
        let steps = match self {
            Trigger::OnScan => vec![
                CueStep::cell(0),
                CueStep::role(FixedRole::Scan, 1500),
                CueStep::role(FixedRole::Check, 4000),
            ],
            Trigger::OnPhoneSearch => vec![
                CueStep::role(FixedRole::Search, 0),
                CueStep::cell(1500),
            ],
            Trigger::OnIssueComplete => vec![CueStep::role(FixedRole::Rate, 0)],
            Trigger::OnAccept => vec![CueStep::role(FixedRole::Accept, 0)],
            Trigger::OnReturn => vec![CueStep::role(FixedRole::Return, 0)],
        };
        CueSequence {
            name: self.name().to_string(),
            steps,
        }
    }
}

impl FromStr for Trigger {
    type Err = KioskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Trigger::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| KioskError::UnknownTrigger(s.to_string()))
    }
}

/// Run-time values substituted into placeholder steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    values: HashMap<String, u64>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cell(cell: u16) -> Self {
        Self::new().bind(CURRENT_CELL, cell as u64)
    }

    pub fn bind(mut self, name: impl Into<String>, value: u64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.values.get(name).copied()
    }
}

/// Named sequences available to `run_named`: the built-ins plus any the
/// operator authored in configuration.
#[derive(Debug, Clone)]
pub struct SequenceBook {
    sequences: BTreeMap<String, CueSequence>,
}

impl SequenceBook {
    pub fn builtin() -> Self {
        let sequences = Trigger::ALL
            .into_iter()
            .map(|t| (t.name().to_string(), t.sequence()))
            .collect();
        Self { sequences }
    }

    /// Adds an authored sequence. Built-in trigger names cannot be replaced.
    pub fn author(&mut self, sequence: CueSequence) -> Result<(), KioskError> {
        if sequence.name.parse::<Trigger>().is_ok() {
            return Err(KioskError::Config(format!(
                "sequence {:?} would shadow a built-in trigger",
                sequence.name
            )));
        }
        self.sequences.insert(sequence.name.clone(), sequence);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&CueSequence> {
        self.sequences.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sequences.keys().map(String::as_str)
    }
}

impl Default for SequenceBook {
    fn default() -> Self {
        Self::builtin()
    }
}
