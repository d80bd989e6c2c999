/// Fixed-length, zero-padded slice of a clip aligned on its onset.
#[derive(Clone, Debug, PartialEq)]
pub struct Window {
    samples: Vec<f32>,
    sample_rate: u32,
    onset_index: usize,
    pre_onset: usize,
}

impl Window {
    pub(crate) fn new(
        samples: Vec<f32>,
        sample_rate: u32,
        onset_index: usize,
        pre_onset: usize,
    ) -> Self {
        Self {
            samples,
            sample_rate,
            onset_index,
            pre_onset,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Onset position in the source clip.
    pub fn onset_index(&self) -> usize {
        self.onset_index
    }

    /// Index in this window where the onset sample sits.
    pub fn pre_onset(&self) -> usize {
        self.pre_onset
    }
}
