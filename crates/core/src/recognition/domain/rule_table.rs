use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::NO_MATCH_SCORE;

use super::phoneme::PhonemeInventory;
use super::rule::{Rule, SOFT_MATCH_BASE};

/// Lowest priority a rule may carry. Below it the weakest match, a soft
/// match on one phoneme, would tie or undercut the no-match score.
pub const MIN_PRIORITY: i32 = NO_MATCH_SCORE - SOFT_MATCH_BASE;

#[derive(Error, Debug)]
pub enum RuleTableError {
    #[error("failed to read rule table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse rule table: {0}")]
    Json(#[from] serde_json::Error),
    #[error("rule table is empty")]
    Empty,
    #[error("letter {0:?} has more than one rule")]
    DuplicateLetter(String),
    #[error("rule for {0:?} has neither any-groups nor a soft-any set")]
    EmptyRule(String),
    #[error("rule for {0:?} has an empty any-group, which would match every input")]
    EmptyGroup(String),
    #[error("priority {priority} for {letter:?} lets a match score at or below the no-match score")]
    PriorityTooLow { letter: String, priority: i32 },
    #[error("rule for {letter:?} uses unknown phoneme {phoneme:?}")]
    UnknownPhoneme { letter: String, phoneme: String },
}

/// One row of the rule table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LetterRule {
    pub letter: String,
    #[serde(flatten)]
    pub rule: Rule,
}

#[derive(Serialize, Deserialize)]
struct RuleTableFile {
    rules: Vec<LetterRule>,
}

/// Ordered letter → rule table.
///
/// Iteration order is declaration order and is what breaks score ties, so
/// the table is a list rather than a map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleTable {
    entries: Vec<LetterRule>,
}

impl RuleTable {
    pub fn new(entries: Vec<LetterRule>) -> Result<Self, RuleTableError> {
        if entries.is_empty() {
            return Err(RuleTableError::Empty);
        }
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.letter.as_str()) {
                return Err(RuleTableError::DuplicateLetter(entry.letter.clone()));
            }
            let has_soft = entry.rule.soft_any.as_ref().is_some_and(|s| !s.is_empty());
            if entry.rule.any_groups.is_empty() && !has_soft {
                return Err(RuleTableError::EmptyRule(entry.letter.clone()));
            }
            if entry.rule.any_groups.iter().any(|g| g.is_empty()) {
                return Err(RuleTableError::EmptyGroup(entry.letter.clone()));
            }
            if entry.rule.priority < MIN_PRIORITY {
                return Err(RuleTableError::PriorityTooLow {
                    letter: entry.letter.clone(),
                    priority: entry.rule.priority,
                });
            }
        }
        Ok(Self { entries })
    }

    /// Parse `{"rules": [{"letter": "A", "any_groups": [["EY"]], ...}, ...]}`.
    pub fn from_json_str(json: &str) -> Result<Self, RuleTableError> {
        let file: RuleTableFile = serde_json::from_str(json)?;
        Self::new(file.rules)
    }

    pub fn load(path: &Path) -> Result<Self, RuleTableError> {
        let json = std::fs::read_to_string(path).map_err(|source| RuleTableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_json_str(&json)?;
        log::info!("Loaded {} letter rules from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn to_json_string(&self) -> Result<String, RuleTableError> {
        let file = RuleTableFile {
            rules: self.entries.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Check that every phoneme a rule mentions can actually be emitted.
    pub fn validate_against(&self, inventory: &PhonemeInventory) -> Result<(), RuleTableError> {
        for entry in &self.entries {
            if let Some(unknown) = entry.rule.phonemes().find(|p| !inventory.contains(p)) {
                return Err(RuleTableError::UnknownPhoneme {
                    letter: entry.letter.clone(),
                    phoneme: unknown.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LetterRule> {
        self.entries.iter()
    }

    pub fn get(&self, letter: &str) -> Option<&Rule> {
        self.entries
            .iter()
            .find(|e| e.letter == letter)
            .map(|e| &e.rule)
    }

    /// Built-in English alphabet table, A to Z, keyed on ARPAbet letter names.
    pub fn english_alphabet() -> Self {
        let entries = vec![
            letter("A", Rule::new(&[&["EY"]]).with_forbidden(&["B", "CH", "D", "JH", "K", "P", "T"])),
            letter("B", Rule::new(&[&["B", "IY"]]).with_soft_any(&["B"])),
            letter("C", Rule::new(&[&["S", "IY"]]).with_forbidden(&["EH", "K"])),
            letter("D", Rule::new(&[&["D", "IY"]]).with_soft_any(&["D"]).with_forbidden(&["AH", "B", "L"])),
            letter("E", Rule::new(&[&["IY"]]).with_forbidden(&["B", "D", "JH", "P", "S", "T", "V", "Z"])),
            letter("F", Rule::new(&[&["EH", "F"]]).with_soft_any(&["F"])),
            letter("G", Rule::new(&[&["JH", "IY"]]).with_forbidden(&["EY"])),
            letter("H", Rule::new(&[&["EY", "CH"]]).with_soft_any(&["CH"])),
            letter("I", Rule::new(&[&["AY"]]).with_forbidden(&["W"])),
            letter("J", Rule::new(&[&["JH", "EY"]]).with_forbidden(&["IY"])),
            letter("K", Rule::new(&[&["K", "EY"], &["K"]]).with_forbidden(&["S", "UW", "Y"])),
            letter("L", Rule::new(&[&["EH", "L"]]).with_soft_any(&["L"]).with_forbidden(&["B", "D"])),
            letter("M", Rule::new(&[&["EH", "M"]]).with_soft_any(&["M"])),
            letter("N", Rule::new(&[&["EH", "N"]]).with_soft_any(&["N"])),
            letter("O", Rule::new(&[&["OW"]])),
            letter("P", Rule::new(&[&["P", "IY"]]).with_soft_any(&["P"])),
            letter("Q", Rule::new(&[&["K", "Y", "UW"], &["K", "UW"]])),
            letter("R", Rule::new(&[&["AA", "R"]]).with_soft_any(&["R"])),
            letter("S", Rule::new(&[&["EH", "S"]]).with_forbidden(&["K"])),
            letter("T", Rule::new(&[&["T", "IY"]]).with_soft_any(&["T"])),
            letter("U", Rule::new(&[&["Y", "UW"]]).with_forbidden(&["B", "D", "K"])),
            letter("V", Rule::new(&[&["V", "IY"]]).with_soft_any(&["V"])),
            letter(
                "W",
                Rule::new(&[&["D", "AH", "B", "L", "Y", "UW"], &["D", "AH", "B"], &["B", "L", "Y", "UW"]])
                    .with_priority(1),
            ),
            letter("X", Rule::new(&[&["EH", "K", "S"]])),
            letter("Y", Rule::new(&[&["W", "AY"]])),
            letter("Z", Rule::new(&[&["Z", "IY"], &["Z", "EH", "D"]]).with_soft_any(&["Z"])),
        ];
        Self { entries }
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::english_alphabet()
    }
}

fn letter(letter: &str, rule: Rule) -> LetterRule {
    LetterRule {
        letter: letter.to_string(),
        rule,
    }
}
