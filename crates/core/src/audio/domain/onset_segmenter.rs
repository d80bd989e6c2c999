use crate::shared::constants::{INTENSITY_THRESHOLD, POST_ONSET_SECONDS, PRE_ONSET_SECONDS};

use super::window::Window;

/// Cuts a fixed-length window around the first loud sample of a clip.
///
/// The window always holds `pre + post` samples with the onset sample at
/// index `pre`; anything outside the source clip is zero.
#[derive(Clone, Debug)]
pub struct OnsetSegmenter {
    threshold: f32,
    pre_seconds: f64,
    post_seconds: f64,
}

impl OnsetSegmenter {
    pub fn new(threshold: f32, pre_seconds: f64, post_seconds: f64) -> Self {
        Self {
            threshold,
            pre_seconds,
            post_seconds,
        }
    }

    /// Samples kept before and after the onset at `sample_rate`.
    pub fn bounds(&self, sample_rate: u32) -> (usize, usize) {
        let pre = (self.pre_seconds * sample_rate as f64) as usize;
        let post = (self.post_seconds * sample_rate as f64) as usize;
        (pre, post)
    }

    pub fn window_len(&self, sample_rate: u32) -> usize {
        let (pre, post) = self.bounds(sample_rate);
        pre + post
    }

    /// First index whose magnitude exceeds the threshold, or 0 if none does.
    pub fn detect_onset(&self, samples: &[f32]) -> usize {
        samples
            .iter()
            .position(|s| s.abs() > self.threshold)
            .unwrap_or(0)
    }

    pub fn segment(&self, samples: &[f32], sample_rate: u32) -> Window {
        let onset = self.detect_onset(samples);
        let (pre, post) = self.bounds(sample_rate);

        let mut out = vec![0.0f32; pre + post];
        let start = onset.saturating_sub(pre);
        let end = samples.len().min(onset + post);

        if start < end {
            let offset = pre - (onset - start);
            out[offset..offset + (end - start)].copy_from_slice(&samples[start..end]);
        }

        log::debug!(
            "Onset at sample {onset}, copied [{start}, {end}) into {}-sample window",
            out.len()
        );
        Window::new(out, sample_rate, onset, pre)
    }
}

impl Default for OnsetSegmenter {
    fn default() -> Self {
        Self::new(INTENSITY_THRESHOLD, PRE_ONSET_SECONDS, POST_ONSET_SECONDS)
    }
}
