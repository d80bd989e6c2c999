use thiserror::Error;

use crate::audio::domain::window::Window;

use super::probability_matrix::ClassProbabilityMatrix;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("failed to load acoustic model: {0}")]
    Load(String),
    #[error("acoustic model run failed: {0}")]
    Session(String),
    #[error("feature shape mismatch: expected {expected:?}, got {actual:?}")]
    FeatureShape {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("unexpected model output shape {0:?}")]
    OutputShape(Vec<usize>),
    #[error("model emitted {actual} classes per frame, expected {expected}")]
    ClassCount { expected: usize, actual: usize },
    #[error("model emitted {actual} frames, expected {expected}")]
    FrameCount { expected: usize, actual: usize },
    #[error("invalid probability {value} at frame {frame}, class {class}")]
    InvalidProbability {
        frame: usize,
        class: usize,
        value: f32,
    },
}

/// Domain interface for the phoneme acoustic model.
///
/// Implementations own their feature front end and must be safe to call
/// from several requests at once once loaded.
pub trait AcousticModel: Send + Sync {
    fn infer(&self, window: &Window) -> Result<ClassProbabilityMatrix, InferenceError>;
}
