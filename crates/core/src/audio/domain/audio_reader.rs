use std::path::Path;

use super::audio_segment::AudioSegment;

/// Domain interface for decoding audio files.
pub trait AudioReader: Send + Sync {
    /// Decode the first audio stream to mono PCM at its native sample rate.
    /// Returns None if the file has no audio stream.
    fn read_audio(&self, path: &Path) -> Result<Option<AudioSegment>, Box<dyn std::error::Error>>;
}
