use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::classification::{ClassificationResult, LetterScore};

/// Response for one recognized clip.
///
/// Serializes as
/// `{"success", "letter", "phonemes", "confidence", "debug": {"scores", "chosen_score", "phonemes"}}`.
/// A clip where no rule matched is still a success, with letter `?` and
/// confidence 0.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecognitionResult {
    pub success: bool,
    pub letter: String,
    pub phonemes: Vec<String>,
    pub confidence: f32,
    pub debug: RecognitionDebug,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecognitionDebug {
    #[serde(serialize_with = "scores_as_map")]
    pub scores: Vec<LetterScore>,
    pub chosen_score: i32,
    pub phonemes: Vec<String>,
}

impl From<ClassificationResult> for RecognitionResult {
    fn from(result: ClassificationResult) -> Self {
        let phonemes = result.phonemes().as_slice().to_vec();
        Self {
            success: true,
            letter: result.letter().to_string(),
            phonemes: phonemes.clone(),
            confidence: result.confidence(),
            debug: RecognitionDebug {
                scores: result.scores().to_vec(),
                chosen_score: result.chosen_score(),
                phonemes,
            },
        }
    }
}

impl RecognitionResult {
    pub fn is_match(&self) -> bool {
        !self.debug.scores.is_empty()
    }
}

// Keeps rule-table order in the emitted JSON object.
fn scores_as_map<S: Serializer>(scores: &[LetterScore], serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(scores.len()))?;
    for entry in scores {
        map.serialize_entry(&entry.letter, &entry.score)?;
    }
    map.end()
}
