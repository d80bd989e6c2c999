use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::audio::domain::audio_reader::AudioReader;
use crate::pipeline::pipeline_logger::StdoutPipelineLogger;
use crate::pipeline::recognize_letter_use_case::{RecognitionError, RecognizeLetterUseCase};
use crate::recognition::domain::recognition_result::RecognitionResult;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClipError {
    #[error("failed to decode audio: {0}")]
    Read(String),
    #[error("file has no audio stream")]
    NoAudio,
    #[error(transparent)]
    Recognition(#[from] RecognitionError),
}

impl ClipError {
    /// `true` for server-side failures, i.e. the acoustic model failed.
    pub fn is_inference_failure(&self) -> bool {
        matches!(self, ClipError::Recognition(e) if !e.is_client_error())
    }
}

/// Recognition outcome for one input file.
#[derive(Debug)]
pub struct ClipOutcome {
    pub path: PathBuf,
    pub result: Result<RecognitionResult, ClipError>,
}

/// Abstracts how a batch of audio files is decoded and recognized.
///
/// Outcomes are returned in input order. A failing clip never stops the
/// rest of the batch.
pub trait BatchExecutor: Send {
    fn execute(
        &self,
        paths: &[PathBuf],
        reader: Arc<dyn AudioReader>,
        use_case: Arc<RecognizeLetterUseCase>,
        logger: &mut StdoutPipelineLogger,
    ) -> Vec<ClipOutcome>;
}

/// Decode and recognize one file.
pub fn recognize_file(
    path: &std::path::Path,
    reader: &dyn AudioReader,
    use_case: &RecognizeLetterUseCase,
    logger: &mut StdoutPipelineLogger,
) -> Result<RecognitionResult, ClipError> {
    let clip = reader
        .read_audio(path)
        .map_err(|e| ClipError::Read(e.to_string()))?
        .ok_or(ClipError::NoAudio)?;
    Ok(use_case.execute(clip.samples(), clip.sample_rate(), logger)?)
}
