use ndarray::Array2;

use super::window::Window;

/// Domain interface for the acoustic front end.
///
/// Turns a segmented window into a `frames x channels` feature matrix. The
/// shape must be fixed for a given configuration; the acoustic model checks it.
pub trait FeatureExtractor: Send + Sync {
    fn extract(&self, window: &Window) -> Array2<f32>;

    /// `(frames, channels)` produced for a full-length window.
    fn output_shape(&self) -> (usize, usize);
}
