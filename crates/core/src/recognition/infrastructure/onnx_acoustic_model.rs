/// Phoneme acoustic model backed by an ONNX Runtime session.
///
/// Runs the feature front end on the window, feeds a `[1, frames, channels, 1]`
/// tensor to the exported CNN + BiLSTM network and wraps the
/// `[1, time, classes]` output in a validated probability matrix.
use std::path::Path;
use std::sync::Mutex;

use ndarray::{Array4, Ix3};

use crate::audio::domain::feature_extractor::FeatureExtractor;
use crate::audio::domain::window::Window;
use crate::recognition::domain::acoustic_model::{AcousticModel, InferenceError};
use crate::recognition::domain::phoneme::PhonemeInventory;
use crate::recognition::domain::probability_matrix::ClassProbabilityMatrix;

use super::execution_provider::preferred_execution_providers;

pub struct OnnxAcousticModel {
    session: Mutex<ort::session::Session>,
    extractor: Box<dyn FeatureExtractor>,
    num_classes: usize,
    expected_frames: Option<usize>,
}

impl OnnxAcousticModel {
    /// Load the model at `model_path`.
    ///
    /// The output frame count is read from the model's declared output shape
    /// when it is static and checked on every run.
    pub fn new(
        model_path: &Path,
        extractor: Box<dyn FeatureExtractor>,
        inventory: &PhonemeInventory,
    ) -> Result<Self, InferenceError> {
        let intra_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let session = ort::session::Session::builder()
            .map_err(|e| load_error(model_path, e))?
            .with_intra_threads(intra_threads)
            .map_err(|e| load_error(model_path, e))?
            .with_execution_providers(preferred_execution_providers())
            .map_err(|e| load_error(model_path, e))?
            .commit_from_file(model_path)
            .map_err(|e| load_error(model_path, e))?;

        let expected_frames = session.outputs().first().and_then(|output| {
            if let ort::value::ValueType::Tensor { ref shape, .. } = output.dtype() {
                // [batch, time, classes]; dynamic dims are negative.
                if shape.len() == 3 && shape[1] > 0 {
                    Some(shape[1] as usize)
                } else {
                    None
                }
            } else {
                None
            }
        });

        log::debug!(
            "Acoustic model {} expects {:?} output frames",
            model_path.display(),
            expected_frames
        );

        Ok(Self {
            session: Mutex::new(session),
            extractor,
            num_classes: inventory.num_classes(),
            expected_frames,
        })
    }

    fn run(&self, input: Array4<f32>) -> Result<ndarray::Array3<f32>, InferenceError> {
        let input_value = ort::value::Tensor::from_array(input).map_err(session_error)?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| InferenceError::Session(format!("Lock poisoned: {e}")))?;
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(session_error)?;
        if outputs.len() == 0 {
            return Err(InferenceError::OutputShape(Vec::new()));
        }
        let tensor = outputs[0].try_extract_array::<f32>().map_err(session_error)?;
        let shape = tensor.shape().to_vec();
        let scores = tensor.to_owned();
        scores
            .into_dimensionality::<Ix3>()
            .map_err(|_| InferenceError::OutputShape(shape))
    }
}

fn load_error(model_path: &Path, e: impl std::fmt::Display) -> InferenceError {
    InferenceError::Load(format!("{}: {e}", model_path.display()))
}

fn session_error(e: impl std::fmt::Display) -> InferenceError {
    InferenceError::Session(e.to_string())
}

impl AcousticModel for OnnxAcousticModel {
    fn infer(&self, window: &Window) -> Result<ClassProbabilityMatrix, InferenceError> {
        let features = self.extractor.extract(window);
        let expected = self.extractor.output_shape();
        if features.dim() != expected {
            return Err(InferenceError::FeatureShape {
                expected,
                actual: features.dim(),
            });
        }

        let (frames, channels) = expected;
        let input = features
            .into_shape_with_order((1, frames, channels, 1))
            .map_err(|e| InferenceError::Session(e.to_string()))?;

        let output = self.run(input)?;
        if output.shape()[0] != 1 {
            return Err(InferenceError::OutputShape(output.shape().to_vec()));
        }
        let matrix = ClassProbabilityMatrix::split_batch(output.view(), self.num_classes)?
            .into_iter()
            .next()
            .ok_or_else(|| InferenceError::OutputShape(output.shape().to_vec()))?;

        if let Some(expected) = self.expected_frames {
            if matrix.frames() != expected {
                return Err(InferenceError::FrameCount {
                    expected,
                    actual: matrix.frames(),
                });
            }
        }
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::infrastructure::spectral_feature_extractor::SpectralFeatureExtractor;
    use crate::shared::constants::ACOUSTIC_MODEL_NAME;
    use crate::shared::model_resolver::{self, ModelSource};

    #[test]
    fn test_missing_model_file_is_load_error() {
        let result = OnnxAcousticModel::new(
            Path::new("/nonexistent/letter_phonemes.onnx"),
            Box::new(SpectralFeatureExtractor::new()),
            &PhonemeInventory::standard(),
        );
        assert!(matches!(result, Err(InferenceError::Load(_))));
    }

    #[test]
    #[ignore] // requires the acoustic model in the local cache
    fn test_silence_produces_full_probability_matrix() {
        let path = model_resolver::resolve(ACOUSTIC_MODEL_NAME, &ModelSource::default(), None)
            .unwrap();
        let inventory = PhonemeInventory::standard();
        let model = OnnxAcousticModel::new(
            &path,
            Box::new(SpectralFeatureExtractor::new()),
            &inventory,
        )
        .unwrap();
        let window = Window::new(vec![0.0; 24000], 16000, 0, 3200);
        let matrix = model.infer(&window).unwrap();
        assert_eq!(matrix.classes(), inventory.num_classes());
        assert!(matrix.frames() > 0);
    }
}
