use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::audio::domain::audio_segment::{AudioSegment, InputError};
use crate::audio::domain::onset_segmenter::OnsetSegmenter;
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::recognition::domain::acoustic_model::InferenceError;
use crate::recognition::domain::alphabet_classifier::AlphabetClassifier;
use crate::recognition::domain::recognition_result::RecognitionResult;
use crate::recognition::domain::sequence_decoder::GreedyDecoder;
use crate::recognition::infrastructure::model_cell::ModelCell;
use crate::shared::constants::{MIN_INPUT_SAMPLES, MODEL_SAMPLE_RATE};

/// Failures of a recognition request. A clip that matches no letter is not
/// one of them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecognitionError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl RecognitionError {
    /// `true` when the caller sent bad audio, `false` when the server failed.
    pub fn is_client_error(&self) -> bool {
        matches!(self, RecognitionError::Input(_))
    }
}

/// Recognizes the single letter spoken in a clip.
///
/// prepare (validate, resample, normalize) → segment → model → decode →
/// classify. Everything but the model call is pure; the model is shared
/// through a [`ModelCell`] and loaded on first use.
pub struct RecognizeLetterUseCase {
    model: Arc<ModelCell>,
    segmenter: OnsetSegmenter,
    decoder: GreedyDecoder,
    classifier: AlphabetClassifier,
}

impl RecognizeLetterUseCase {
    pub fn new(
        model: Arc<ModelCell>,
        segmenter: OnsetSegmenter,
        decoder: GreedyDecoder,
        classifier: AlphabetClassifier,
    ) -> Self {
        Self {
            model,
            segmenter,
            decoder,
            classifier,
        }
    }

    pub fn model(&self) -> &ModelCell {
        &self.model
    }

    /// [`execute`](Self::execute) without stage logging.
    pub fn recognize(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<RecognitionResult, RecognitionError> {
        self.execute(samples, sample_rate, &mut NullPipelineLogger)
    }

    pub fn execute(
        &self,
        samples: &[f32],
        sample_rate: u32,
        logger: &mut dyn PipelineLogger,
    ) -> Result<RecognitionResult, RecognitionError> {
        let t0 = Instant::now();
        let clip = prepare(samples, sample_rate)?;
        logger.timing("prepare", elapsed_ms(t0));

        let t0 = Instant::now();
        let window = self.segmenter.segment(clip.samples(), clip.sample_rate());
        logger.timing("segment", elapsed_ms(t0));
        let onset_ms = window.onset_index() as f64 * 1000.0 / MODEL_SAMPLE_RATE as f64;
        logger.metric("onset_ms", onset_ms);

        let t0 = Instant::now();
        let matrix = self.model.get()?.infer(&window)?;
        logger.timing("model", elapsed_ms(t0));

        let expected_classes = self.decoder.inventory().num_classes();
        if matrix.classes() != expected_classes {
            return Err(InferenceError::ClassCount {
                expected: expected_classes,
                actual: matrix.classes(),
            }
            .into());
        }

        let t0 = Instant::now();
        let phonemes = self.decoder.decode(&matrix);
        logger.timing("decode", elapsed_ms(t0));
        logger.metric("phonemes", phonemes.len() as f64);

        let t0 = Instant::now();
        let classification = self.classifier.classify(&phonemes);
        logger.timing("classify", elapsed_ms(t0));

        log::debug!(
            "Recognized {} from {:?} (score {})",
            classification.letter(),
            phonemes.as_slice(),
            classification.chosen_score()
        );
        Ok(classification.into())
    }
}

/// Reject short or malformed clips, then bring the rest to the model rate
/// at unit peak amplitude.
pub fn prepare(samples: &[f32], sample_rate: u32) -> Result<AudioSegment, InputError> {
    let raw = AudioSegment::new(samples.to_vec(), sample_rate);
    raw.validate(MIN_INPUT_SAMPLES)?;
    let mut clip = raw.resample_nearest(MODEL_SAMPLE_RATE);
    clip.peak_normalize();
    Ok(clip)
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
