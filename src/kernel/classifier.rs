//! File-name classification for imported cue assets.
//!
//! Pure: the same name always yields the same outcome. Matching is done on a
//! folded form of the name (canonically decomposed, combining marks dropped,
//! lowercased) so `Возврат.MP3` and `возврат.mp3` land on the same role.

use super::key::{FixedRole, SemanticKey};
use std::path::Path;
use thiserror::Error;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Extensions accepted for import, compared case-insensitively.
pub const AUDIO_EXTENSIONS: [&str; 4] = ["mp3", "wav", "ogg", "m4a"];

/// Optional prefixes on a cell-numbered file name.
const CELL_PREFIXES: [&str; 2] = ["cell_", "ячейка_"];

/// One row of the fixed-role table: any pattern found in the name selects the role.
#[derive(Debug, Clone, Copy)]
pub struct RoleRule {
    pub role: FixedRole,
    pub patterns: &'static [&'static str],
}

/// Evaluated top to bottom; first hit wins.
pub const ROLE_RULES: &[RoleRule] = &[
    RoleRule { role: FixedRole::Scan, patterns: &["scan", "сканирование"] },
    RoleRule { role: FixedRole::Check, patterns: &["check", "проверьте"] },
    RoleRule { role: FixedRole::Rate, patterns: &["rate", "оцените"] },
    RoleRule { role: FixedRole::Accept, patterns: &["accept", "принят"] },
    RoleRule { role: FixedRole::Return, patterns: &["return", "возврат"] },
    RoleRule { role: FixedRole::Search, patterns: &["search", "поиск"] },
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("unsupported extension {0:?} (expected mp3, wav, ogg or m4a)")]
    UnsupportedExtension(Option<String>),
    #[error("cell number {0} is out of range")]
    CellOutOfRange(u64),
}

/// Classifies a file name into a cue key.
///
/// Directory components are ignored. Names matching no rule become ad hoc keys
/// spelled exactly as the stripped file name.
pub fn classify(file_name: &str) -> Result<SemanticKey, Rejection> {
    let stem = strip_audio_extension(file_name)?;
    let folded = fold(stem);

    for rule in ROLE_RULES {
        if rule.patterns.iter().any(|p| folded.contains(&fold(p))) {
            return Ok(SemanticKey::Fixed(rule.role));
        }
    }

    if let Some(n) = cell_number(&folded) {
        return SemanticKey::cell(n).map_err(|_| Rejection::CellOutOfRange(n));
    }

    Ok(SemanticKey::AdHoc(stem.to_string()))
}

/// Returns the base name without its audio extension.
pub fn strip_audio_extension(file_name: &str) -> Result<&str, Rejection> {
    let path = Path::new(file_name);
    let ext = path.extension().and_then(|e| e.to_str());
    let stem = path.file_stem().and_then(|s| s.to_str());

    match (ext, stem) {
        (Some(ext), Some(stem)) if AUDIO_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(ext)) => {
            Ok(stem)
        }
        (ext, _) => Err(Rejection::UnsupportedExtension(ext.map(str::to_string))),
    }
}

/// Parses `(cell_|ячейка_)?<digits>` over the whole (folded) name.
fn cell_number(folded: &str) -> Option<u64> {
    let digits = CELL_PREFIXES
        .iter()
        .find_map(|p| folded.strip_prefix(&fold(p)))
        .unwrap_or(folded);

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Overflowing digit strings are out of range, not unclassified.
    Some(digits.parse::<u64>().unwrap_or(u64::MAX))
}

/// Case and diacritic folding used for pattern comparison.
fn fold(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(base_letter)
        .collect()
}

/// Letters whose diacritic does not decompose into a combining mark.
fn base_letter(c: char) -> char {
    match c {
        'ł' => 'l',
        'ø' => 'o',
        'đ' => 'd',
        'ħ' => 'h',
        other => other,
    }
}
