use thiserror::Error;

/// Rejections raised before a clip reaches the recognition core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("audio too short: {len} samples, need at least {min}")]
    TooShort { len: usize, min: usize },
    #[error("malformed audio: {0}")]
    Malformed(String),
}

/// A clip of decoded mono PCM audio.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSegment {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioSegment {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
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

    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Check that the clip is long enough and well-formed.
    ///
    /// The length check runs on the clip as received, before any resampling.
    pub fn validate(&self, min_samples: usize) -> Result<(), InputError> {
        if self.sample_rate == 0 {
            return Err(InputError::Malformed("sample rate must be positive".into()));
        }
        if self.samples.len() < min_samples {
            return Err(InputError::TooShort {
                len: self.samples.len(),
                min: min_samples,
            });
        }
        if let Some(idx) = self.samples.iter().position(|s| !s.is_finite()) {
            return Err(InputError::Malformed(format!(
                "non-finite sample at index {idx}"
            )));
        }
        Ok(())
    }

    /// Nearest-index resampling to `target_rate`.
    ///
    /// Output length is `trunc(len * target / source)`; output sample `i`
    /// takes source index `trunc(i * step)` with `step = (len - 1) / (out_len - 1)`,
    /// so the first and last samples are always kept.
    pub fn resample_nearest(&self, target_rate: u32) -> AudioSegment {
        if self.sample_rate == target_rate || self.sample_rate == 0 || self.samples.is_empty() {
            return AudioSegment::new(self.samples.clone(), target_rate);
        }

        let len = self.samples.len();
        let ratio = target_rate as f64 / self.sample_rate as f64;
        let out_len = (len as f64 * ratio) as usize;

        let resampled = match out_len {
            0 => Vec::new(),
            1 => vec![self.samples[0]],
            _ => {
                let step = (len - 1) as f64 / (out_len - 1) as f64;
                (0..out_len)
                    .map(|i| {
                        // Last index is pinned; i * step can land just under it.
                        let idx = if i == out_len - 1 {
                            len - 1
                        } else {
                            ((i as f64 * step) as usize).min(len - 1)
                        };
                        self.samples[idx]
                    })
                    .collect()
            }
        };
        AudioSegment::new(resampled, target_rate)
    }

    /// Scale so the loudest sample has magnitude 1.0. Silent clips are left as-is.
    pub fn peak_normalize(&mut self) {
        let peak = self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        if peak > 0.0 {
            for sample in self.samples.iter_mut() {
                *sample /= peak;
            }
        }
    }
}
