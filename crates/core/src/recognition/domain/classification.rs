use crate::shared::constants::{NO_MATCH_SCORE, UNKNOWN_LETTER};

use super::phoneme::PhonemeSequence;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LetterScore {
    pub letter: String,
    pub score: i32,
}

/// Outcome of classifying one phoneme sequence.
///
/// `scores` lists every letter whose rule matched, in rule-table order. When
/// nothing matched, `letter` is `?`, `chosen_score` is -1 and `scores` is empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassificationResult {
    letter: String,
    scores: Vec<LetterScore>,
    chosen_score: i32,
    phonemes: PhonemeSequence,
}

impl ClassificationResult {
    pub(crate) fn new(
        letter: String,
        scores: Vec<LetterScore>,
        chosen_score: i32,
        phonemes: PhonemeSequence,
    ) -> Self {
        Self {
            letter,
            scores,
            chosen_score,
            phonemes,
        }
    }

    pub(crate) fn no_match(phonemes: PhonemeSequence) -> Self {
        Self::new(UNKNOWN_LETTER.to_string(), Vec::new(), NO_MATCH_SCORE, phonemes)
    }

    pub fn letter(&self) -> &str {
        &self.letter
    }

    pub fn scores(&self) -> &[LetterScore] {
        &self.scores
    }

    pub fn score_for(&self, letter: &str) -> Option<i32> {
        self.scores
            .iter()
            .find(|s| s.letter == letter)
            .map(|s| s.score)
    }

    pub fn chosen_score(&self) -> i32 {
        self.chosen_score
    }

    pub fn phonemes(&self) -> &PhonemeSequence {
        &self.phonemes
    }

    pub fn is_match(&self) -> bool {
        !self.scores.is_empty()
    }

    pub fn confidence(&self) -> f32 {
        confidence_from_score(self.chosen_score)
    }
}

/// `chosen_score / 100`, clamped to `[0, 1]`.
///
/// The lower clamp keeps the no-match sentinel from reporting a negative
/// confidence.
pub fn confidence_from_score(score: i32) -> f32 {
    (score as f32 / 100.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case::no_match(-1, 0.0)]
    #[case::zero(0, 0.0)]
    #[case::single_phoneme(11, 0.11)]
    #[case::large(250, 1.0)]
    #[case::exactly_one(100, 1.0)]
    fn test_confidence_is_clamped(#[case] score: i32, #[case] expected: f32) {
        assert_relative_eq!(confidence_from_score(score), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_no_match_result() {
        let result = ClassificationResult::no_match(PhonemeSequence::default());
        assert_eq!(result.letter(), "?");
        assert_eq!(result.chosen_score(), -1);
        assert!(result.scores().is_empty());
        assert!(!result.is_match());
        assert_eq!(result.confidence(), 0.0);
    }
}
