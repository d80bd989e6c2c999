/// Sample rate the acoustic model was trained on.
pub const MODEL_SAMPLE_RATE: u32 = 16000;

/// Clips shorter than this (100 ms at 16 kHz) are rejected before recognition.
pub const MIN_INPUT_SAMPLES: usize = 1600;

/// Absolute amplitude a sample must exceed to mark the onset.
pub const INTENSITY_THRESHOLD: f32 = 0.10;

/// Seconds of audio kept before the onset.
pub const PRE_ONSET_SECONDS: f64 = 0.2;

/// Seconds of audio kept from the onset onwards.
pub const POST_ONSET_SECONDS: f64 = 1.3;

/// Feature frames per window (24000 samples, hop 160, centered framing).
pub const FEATURE_FRAMES: usize = 151;

/// Feature channels per frame: 80 mel + 80 delta + 80 delta-delta + 1 pitch.
pub const FEATURE_CHANNELS: usize = 241;

pub const ACOUSTIC_MODEL_NAME: &str = "letter_phonemes.onnx";

/// Letter reported when no rule matches.
pub const UNKNOWN_LETTER: &str = "?";

/// Score reported when no rule matches. Lower than any real match.
pub const NO_MATCH_SCORE: i32 = -1;
