use ndarray::{Array2, ArrayView2, ArrayView3, Axis};

use super::acoustic_model::InferenceError;

/// Per-frame class scores from the acoustic model, `frames x classes`.
///
/// Construction checks the shape and values, so anything holding one of
/// these can decode it without further validation.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassProbabilityMatrix {
    scores: Array2<f32>,
}

impl ClassProbabilityMatrix {
    pub fn new(scores: Array2<f32>, num_classes: usize) -> Result<Self, InferenceError> {
        let (frames, classes) = scores.dim();
        if classes != num_classes {
            return Err(InferenceError::ClassCount {
                expected: num_classes,
                actual: classes,
            });
        }
        if frames == 0 {
            return Err(InferenceError::OutputShape(vec![frames, classes]));
        }
        for ((frame, class), &value) in scores.indexed_iter() {
            if !value.is_finite() || value < 0.0 {
                return Err(InferenceError::InvalidProbability {
                    frame,
                    class,
                    value,
                });
            }
        }
        Ok(Self { scores })
    }

    /// Split a `batch x frames x classes` tensor into one matrix per utterance.
    pub fn split_batch(
        batch: ArrayView3<'_, f32>,
        num_classes: usize,
    ) -> Result<Vec<Self>, InferenceError> {
        batch
            .axis_iter(Axis(0))
            .map(|utterance| Self::new(utterance.to_owned(), num_classes))
            .collect()
    }

    pub fn frames(&self) -> usize {
        self.scores.nrows()
    }

    pub fn classes(&self) -> usize {
        self.scores.ncols()
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.scores.view()
    }
}
