use super::classification::{ClassificationResult, LetterScore};
use super::phoneme::PhonemeSequence;
use super::rule_table::RuleTable;

/// Maps a phoneme sequence to the best-scoring letter of a rule table.
///
/// Only a strictly higher score replaces the current best, so on a tie the
/// letter declared first in the table wins.
#[derive(Clone, Debug, Default)]
pub struct AlphabetClassifier {
    rules: RuleTable,
}

impl AlphabetClassifier {
    pub fn new(rules: RuleTable) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn classify(&self, phonemes: &PhonemeSequence) -> ClassificationResult {
        let present = phonemes.symbol_set();
        let mut scores = Vec::new();
        let mut best: Option<(usize, i32)> = None;

        for entry in self.rules.iter() {
            let Some(score) = entry.rule.score(&present) else {
                continue;
            };
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((scores.len(), score));
            }
            scores.push(LetterScore {
                letter: entry.letter.clone(),
                score,
            });
        }

        match best {
            Some((idx, score)) => {
                let letter = scores[idx].letter.clone();
                log::debug!("Classified {:?} as {letter} (score {score})", phonemes.as_slice());
                ClassificationResult::new(letter, scores, score, phonemes.clone())
            }
            None => {
                log::debug!("No letter rule matched {:?}", phonemes.as_slice());
                ClassificationResult::no_match(phonemes.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::domain::rule::Rule;
    use crate::recognition::domain::rule_table::LetterRule;
    use rstest::rstest;

    fn seq(phonemes: &[&str]) -> PhonemeSequence {
        phonemes.iter().copied().collect()
    }

    fn table(rules: Vec<(&str, Rule)>) -> RuleTable {
        RuleTable::new(
            rules
                .into_iter()
                .map(|(letter, rule)| LetterRule {
                    letter: letter.to_string(),
                    rule,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_single_rule_match() {
        let classifier =
            AlphabetClassifier::new(table(vec![("K", Rule::new(&[&["K"]]).with_forbidden(&[]))]));
        let result = classifier.classify(&seq(&["K"]));
        assert_eq!(result.letter(), "K");
        assert_eq!(result.chosen_score(), 11);
    }

    #[test]
    fn test_forbidden_phoneme_excludes_letter() {
        let classifier =
            AlphabetClassifier::new(table(vec![("K", Rule::new(&[&["K"]]).with_forbidden(&["S"]))]));
        let result = classifier.classify(&seq(&["K", "S"]));
        assert_eq!(result.letter(), "?");
        assert_eq!(result.score_for("K"), None);
    }

    #[test]
    fn test_tie_goes_to_earlier_rule() {
        // Both score 15: 10 + 3 + 2 and 10 + 5.
        let classifier = AlphabetClassifier::new(table(vec![
            ("M", Rule::new(&[&["EH", "M", "N"]]).with_priority(2)),
            ("N", Rule::new(&[&["EH", "M", "N", "L", "S"]])),
        ]));
        let input = seq(&["EH", "M", "N", "L", "S"]);
        for _ in 0..10 {
            let result = classifier.classify(&input);
            assert_eq!(result.letter(), "M");
            assert_eq!(result.chosen_score(), 15);
            assert_eq!(result.score_for("N"), Some(15));
        }
    }

    #[test]
    fn test_tie_order_follows_table_not_letter() {
        let classifier = AlphabetClassifier::new(table(vec![
            ("N", Rule::new(&[&["EH", "N"]])),
            ("M", Rule::new(&[&["EH", "N"]])),
        ]));
        assert_eq!(classifier.classify(&seq(&["EH", "N"])).letter(), "N");
    }

    #[test]
    fn test_higher_later_score_replaces_best() {
        let classifier = AlphabetClassifier::new(table(vec![
            ("A", Rule::new(&[&["EY"]])),
            ("K", Rule::new(&[&["K", "EY"]])),
        ]));
        let result = classifier.classify(&seq(&["K", "EY"]));
        assert_eq!(result.letter(), "K");
        assert_eq!(result.chosen_score(), 12);
    }

    #[test]
    fn test_score_map_lists_every_match_in_table_order() {
        let classifier = AlphabetClassifier::new(table(vec![
            ("E", Rule::new(&[&["IY"]])),
            ("Z", Rule::new(&[&["Z"]])),
            ("B", Rule::new(&[&["B", "IY"]]).with_soft_any(&["B"])),
        ]));
        let result = classifier.classify(&seq(&["B", "IY"]));
        let letters: Vec<&str> = result.scores().iter().map(|s| s.letter.as_str()).collect();
        assert_eq!(letters, ["E", "B"]);
        assert_eq!(result.score_for("E"), Some(11));
        assert_eq!(result.score_for("B"), Some(12));
        assert_eq!(result.letter(), "B");
    }

    #[test]
    fn test_no_match_is_unknown_with_empty_scores() {
        let classifier = AlphabetClassifier::default();
        let result = classifier.classify(&PhonemeSequence::default());
        assert_eq!(result.letter(), "?");
        assert_eq!(result.chosen_score(), -1);
        assert!(result.scores().is_empty());
        assert_eq!(result.confidence(), 0.0);
    }

    #[test]
    fn test_weakest_allowed_match_still_beats_no_match_score() {
        use crate::recognition::domain::rule_table::MIN_PRIORITY;
        use crate::shared::constants::NO_MATCH_SCORE;

        let classifier = AlphabetClassifier::new(table(vec![(
            "K",
            Rule::new(&[&["K", "EY"]])
                .with_soft_any(&["K"])
                .with_priority(MIN_PRIORITY),
        )]));
        let result = classifier.classify(&seq(&["K"]));
        assert!(result.is_match());
        assert_eq!(result.letter(), "K");
        assert!(result.chosen_score() > NO_MATCH_SCORE);
        assert_eq!(result.confidence(), 0.0);
    }

    #[test]
    fn test_result_keeps_input_sequence() {
        let classifier = AlphabetClassifier::default();
        let input = seq(&["K", "EY", "K"]);
        assert_eq!(classifier.classify(&input).phonemes(), &input);
    }

    #[test]
    fn test_classify_is_pure() {
        let classifier = AlphabetClassifier::default();
        let input = seq(&["D", "AH", "B", "AH", "L", "Y", "UW"]);
        assert_eq!(classifier.classify(&input), classifier.classify(&input));
    }

    #[rstest]
    #[case::a(&["EY"], "A")]
    #[case::b(&["B", "IY"], "B")]
    #[case::c(&["S", "IY"], "C")]
    #[case::e(&["IY"], "E")]
    #[case::f(&["EH", "F"], "F")]
    #[case::g(&["JH", "IY"], "G")]
    #[case::h(&["EY", "CH"], "H")]
    #[case::i(&["AY"], "I")]
    #[case::j(&["JH", "EY"], "J")]
    #[case::k(&["K", "EY"], "K")]
    #[case::o(&["OW"], "O")]
    #[case::q(&["K", "Y", "UW"], "Q")]
    #[case::r(&["AA", "R"], "R")]
    #[case::s(&["EH", "S"], "S")]
    #[case::u(&["Y", "UW"], "U")]
    #[case::w(&["D", "AH", "B", "AH", "L", "Y", "UW"], "W")]
    #[case::x(&["EH", "K", "S"], "X")]
    #[case::y(&["W", "AY"], "Y")]
    #[case::z(&["Z", "IY"], "Z")]
    fn test_english_alphabet_letter_names(#[case] phonemes: &[&str], #[case] expected: &str) {
        let classifier = AlphabetClassifier::default();
        assert_eq!(classifier.classify(&seq(phonemes)).letter(), expected);
    }
}
