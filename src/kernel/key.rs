use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lowest storage cell number on the counter.
pub const CELL_MIN: u16 = 1;
/// Highest storage cell number on the counter.
pub const CELL_MAX: u16 = 482;

const CELL_PREFIX: &str = "cell_";

/// The six built-in cue roles every workflow relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixedRole {
    Scan,
    Check,
    Rate,
    Accept,
    Return,
    Search,
}

impl FixedRole {
    pub const ALL: [FixedRole; 6] = [
        FixedRole::Scan,
        FixedRole::Check,
        FixedRole::Rate,
        FixedRole::Accept,
        FixedRole::Return,
        FixedRole::Search,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FixedRole::Scan => "scan",
            FixedRole::Check => "check",
            FixedRole::Rate => "rate",
            FixedRole::Accept => "accept",
            FixedRole::Return => "return",
            FixedRole::Search => "search",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == name)
    }
}

impl fmt::Display for FixedRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("empty cue key")]
    Empty,
    #[error("cell {0} is outside {min}..={max}", min = CELL_MIN, max = CELL_MAX)]
    CellOutOfRange(u64),
}

/// Token naming what a cue means.
///
/// Serialised as its string form (`scan`, `cell_17`, or the ad hoc name), so the
/// persisted map stays readable and stable across versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SemanticKey {
    Fixed(FixedRole),
    Cell(u16),
    /// Operator-supplied name that matched no built-in rule.
    AdHoc(String),
}

impl SemanticKey {
    /// Builds a cell key, rejecting numbers outside the counter's range.
    pub fn cell(n: u64) -> Result<Self, KeyError> {
        if (CELL_MIN as u64..=CELL_MAX as u64).contains(&n) {
            Ok(SemanticKey::Cell(n as u16))
        } else {
            Err(KeyError::CellOutOfRange(n))
        }
    }

    pub fn is_ad_hoc(&self) -> bool {
        matches!(self, SemanticKey::AdHoc(_))
    }

    pub fn fixed_role(&self) -> Option<FixedRole> {
        match self {
            SemanticKey::Fixed(role) => Some(*role),
            _ => None,
        }
    }
}

impl From<FixedRole> for SemanticKey {
    fn from(role: FixedRole) -> Self {
        SemanticKey::Fixed(role)
    }
}

impl fmt::Display for SemanticKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticKey::Fixed(role) => f.write_str(role.as_str()),
            SemanticKey::Cell(n) => write!(f, "{}{}", CELL_PREFIX, n),
            SemanticKey::AdHoc(name) => f.write_str(name),
        }
    }
}

impl FromStr for SemanticKey {
    type Err = KeyError;

    /// Parses the canonical string form. `cell_<digits>` must be in range;
    /// anything else that is not a fixed role is an ad hoc key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(KeyError::Empty);
        }
        if let Some(role) = FixedRole::from_name(s) {
            return Ok(SemanticKey::Fixed(role));
        }
        if let Some(digits) = s.strip_prefix(CELL_PREFIX) {
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                // Anything too long for u64 is certainly out of range.
                let n = digits.parse::<u64>().unwrap_or(u64::MAX);
                return SemanticKey::cell(n);
            }
        }
        Ok(SemanticKey::AdHoc(s.to_string()))
    }
}

impl TryFrom<String> for SemanticKey {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SemanticKey> for String {
    fn from(key: SemanticKey) -> Self {
        key.to_string()
    }
}
