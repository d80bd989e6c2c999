use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Base score for a fully present any-group, before adding the group size.
pub const HARD_MATCH_BASE: i32 = 10;

/// Base score for a partial soft-any match, before adding the overlap size.
pub const SOFT_MATCH_BASE: i32 = 5;

/// Phoneme pattern that identifies one letter.
///
/// Any-groups are OR'd; every phoneme of a group must be present. `soft_any`
/// gives partial credit when no group is complete, and any phoneme from
/// `forbidden` vetoes the rule outright.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub any_groups: Vec<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_any: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forbidden: Option<BTreeSet<String>>,
    #[serde(default)]
    pub priority: i32,
}

impl Rule {
    pub fn new(any_groups: &[&[&str]]) -> Self {
        Self {
            any_groups: any_groups.iter().map(|g| to_set(g)).collect(),
            ..Default::default()
        }
    }

    pub fn with_soft_any(mut self, phonemes: &[&str]) -> Self {
        self.soft_any = Some(to_set(phonemes));
        self
    }

    pub fn with_forbidden(mut self, phonemes: &[&str]) -> Self {
        self.forbidden = Some(to_set(phonemes));
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Every phoneme the rule refers to.
    pub fn phonemes(&self) -> impl Iterator<Item = &str> {
        self.any_groups
            .iter()
            .flatten()
            .chain(self.soft_any.iter().flatten())
            .chain(self.forbidden.iter().flatten())
            .map(String::as_str)
    }

    /// Score this rule against a set of phonemes, or `None` if it does not match.
    pub fn score(&self, phonemes: &BTreeSet<&str>) -> Option<i32> {
        if let Some(forbidden) = &self.forbidden {
            if forbidden.iter().any(|p| phonemes.contains(p.as_str())) {
                return None;
            }
        }

        let hard = self
            .any_groups
            .iter()
            .filter(|group| group.iter().all(|p| phonemes.contains(p.as_str())))
            .map(|group| HARD_MATCH_BASE + group.len() as i32)
            .max();

        let base = hard.or_else(|| {
            let soft = self.soft_any.as_ref()?;
            let overlap = soft.iter().filter(|p| phonemes.contains(p.as_str())).count();
            (overlap > 0).then(|| SOFT_MATCH_BASE + overlap as i32)
        })?;

        Some(base + self.priority)
    }
}

fn to_set(phonemes: &[&str]) -> BTreeSet<String> {
    phonemes.iter().map(|p| p.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn set<'a>(phonemes: &[&'a str]) -> BTreeSet<&'a str> {
        phonemes.iter().copied().collect()
    }

    #[test]
    fn test_single_group_match_scores_ten_plus_size() {
        let rule = Rule::new(&[&["K"]]).with_forbidden(&[]);
        assert_eq!(rule.score(&set(&["K"])), Some(11));
    }

    #[test]
    fn test_forbidden_vetoes_even_a_full_group() {
        let rule = Rule::new(&[&["K"]]).with_forbidden(&["S"]);
        assert_eq!(rule.score(&set(&["K", "S"])), None);
    }

    #[test]
    fn test_forbidden_vetoes_soft_match() {
        let rule = Rule::new(&[&["B", "IY"]])
            .with_soft_any(&["B"])
            .with_forbidden(&["EY"]);
        assert_eq!(rule.score(&set(&["B", "EY"])), None);
    }

    #[test]
    fn test_best_satisfied_group_wins() {
        let rule = Rule::new(&[&["K"], &["K", "Y", "UW"], &["K", "AA", "R"]]);
        assert_eq!(rule.score(&set(&["K", "Y", "UW"])), Some(13));
    }

    #[rstest]
    #[case::one_overlap(&["B"], Some(6))]
    #[case::two_overlap(&["B", "P"], Some(7))]
    #[case::no_overlap(&["Z"], None)]
    fn test_soft_match_when_no_group_is_complete(
        #[case] phonemes: &[&str],
        #[case] expected: Option<i32>,
    ) {
        let rule = Rule::new(&[&["B", "IY"]]).with_soft_any(&["B", "P"]);
        assert_eq!(rule.score(&set(phonemes)), expected);
    }

    #[test]
    fn test_soft_match_ignored_once_a_group_matches() {
        let rule = Rule::new(&[&["IY"]]).with_soft_any(&["B", "P", "T", "D"]);
        // Soft overlap of 4 would give 9; the group match gives 11.
        assert_eq!(rule.score(&set(&["IY", "B", "P", "T", "D"])), Some(11));
    }

    #[test]
    fn test_priority_added_to_hard_and_soft_scores() {
        let rule = Rule::new(&[&["EH", "F"]])
            .with_soft_any(&["F"])
            .with_priority(3);
        assert_eq!(rule.score(&set(&["EH", "F"])), Some(15));
        assert_eq!(rule.score(&set(&["F"])), Some(9));
    }

    #[test]
    fn test_negative_priority_still_matches() {
        let rule = Rule::new(&[&["IY"]]).with_priority(-4);
        assert_eq!(rule.score(&set(&["IY"])), Some(7));
    }

    #[test]
    fn test_empty_sequence_never_matches() {
        let rule = Rule::new(&[&["IY"]]).with_soft_any(&["IY"]);
        assert_eq!(rule.score(&BTreeSet::new()), None);
    }

    #[test]
    fn test_empty_soft_set_is_no_credit() {
        let rule = Rule::new(&[&["IY"]]).with_soft_any(&[]);
        assert_eq!(rule.score(&set(&["B"])), None);
    }

    #[test]
    fn test_deserialize_defaults_optional_fields() {
        let rule: Rule = serde_json::from_str(r#"{"any_groups": [["K", "EY"]]}"#).unwrap();
        assert_eq!(rule, Rule::new(&[&["K", "EY"]]));
        assert!(rule.soft_any.is_none());
        assert!(rule.forbidden.is_none());
        assert_eq!(rule.priority, 0);
    }
}
