use std::collections::BTreeSet;

use serde::Serialize;

/// ARPAbet symbols the acoustic model emits, in class-index order.
pub const STANDARD_PHONEMES: [&str; 25] = [
    "AA", "AH", "AY", "B", "CH", "D", "EH", "EY", "F", "IY", "JH", "K", "L", "M", "N", "OW", "P",
    "R", "S", "T", "UW", "V", "W", "Y", "Z",
];

/// Fixed index → symbol table for the model's output classes.
///
/// Class `len()` is the blank, so the model emits `len() + 1` classes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhonemeInventory {
    symbols: Vec<String>,
}

impl PhonemeInventory {
    pub fn new<S: Into<String>>(symbols: impl IntoIterator<Item = S>) -> Self {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }

    pub fn standard() -> Self {
        Self::new(STANDARD_PHONEMES)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Number of model output classes, blank included.
    pub fn num_classes(&self) -> usize {
        self.symbols.len() + 1
    }

    pub fn blank_index(&self) -> usize {
        self.symbols.len()
    }

    pub fn symbol(&self, index: usize) -> Option<&str> {
        self.symbols.get(index).map(String::as_str)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }
}

impl Default for PhonemeInventory {
    fn default() -> Self {
        Self::standard()
    }
}

/// Decoded phonemes of one utterance, blank-free and collapsed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PhonemeSequence(Vec<String>);

impl PhonemeSequence {
    pub fn new(phonemes: Vec<String>) -> Self {
        Self(phonemes)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Distinct symbols, which is all the letter rules look at.
    pub fn symbol_set(&self) -> BTreeSet<&str> {
        self.0.iter().map(String::as_str).collect()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl<S: Into<String>> FromIterator<S> for PhonemeSequence {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_inventory_layout() {
        let inv = PhonemeInventory::standard();
        assert_eq!(inv.len(), 25);
        assert_eq!(inv.num_classes(), 26);
        assert_eq!(inv.blank_index(), 25);
        assert_eq!(inv.symbol(0), Some("AA"));
        assert_eq!(inv.symbol(11), Some("K"));
        assert_eq!(inv.symbol(24), Some("Z"));
        assert_eq!(inv.symbol(25), None);
    }

    #[test]
    fn test_contains() {
        let inv = PhonemeInventory::standard();
        assert!(inv.contains("JH"));
        assert!(!inv.contains("ZH"));
    }

    #[test]
    fn test_symbol_set_deduplicates() {
        let seq: PhonemeSequence = ["K", "EY", "K"].into_iter().collect();
        let set = seq.symbol_set();
        assert_eq!(set.len(), 2);
        assert!(set.contains("K"));
        assert!(set.contains("EY"));
    }

    #[test]
    fn test_sequence_serializes_as_plain_list() {
        let seq: PhonemeSequence = ["B", "IY"].into_iter().collect();
        assert_eq!(serde_json::to_string(&seq).unwrap(), r#"["B","IY"]"#);
    }
}
