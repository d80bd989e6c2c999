use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::recognition::domain::acoustic_model::{AcousticModel, InferenceError};

pub type ModelLoader =
    Box<dyn Fn() -> Result<Arc<dyn AcousticModel>, InferenceError> + Send + Sync>;

/// Lazily loaded, process-wide acoustic model handle.
///
/// The first `get()` runs the loader while holding the slot lock, so callers
/// racing on a cold start wait for that single load instead of starting their
/// own. A failed load is not cached; the next `get()` tries again.
pub struct ModelCell {
    loader: ModelLoader,
    slot: Mutex<Option<Arc<dyn AcousticModel>>>,
    loaded: AtomicBool,
    load_ms: AtomicU64,
}

impl ModelCell {
    pub fn new(loader: ModelLoader) -> Self {
        Self {
            loader,
            slot: Mutex::new(None),
            loaded: AtomicBool::new(false),
            load_ms: AtomicU64::new(0),
        }
    }

    /// A cell that is already initialized with `model`.
    pub fn ready(model: Arc<dyn AcousticModel>) -> Self {
        let cell = Self::new(Box::new(|| {
            Err(InferenceError::Load("model cell has no loader".into()))
        }));
        if let Ok(mut slot) = cell.slot.lock() {
            *slot = Some(model);
        }
        cell.loaded.store(true, Ordering::Release);
        cell
    }

    pub fn get(&self) -> Result<Arc<dyn AcousticModel>, InferenceError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| InferenceError::Load(format!("Lock poisoned: {e}")))?;
        if let Some(model) = slot.as_ref() {
            return Ok(Arc::clone(model));
        }

        let start = Instant::now();
        let model = (self.loader)()?;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        log::info!("Model loaded in {elapsed_ms} ms");

        *slot = Some(Arc::clone(&model));
        self.load_ms.store(elapsed_ms, Ordering::Release);
        self.loaded.store(true, Ordering::Release);
        Ok(model)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Time the successful load took, or `None` before the model is loaded.
    pub fn load_duration(&self) -> Option<Duration> {
        self.is_loaded()
            .then(|| Duration::from_millis(self.load_ms.load(Ordering::Acquire)))
    }
}
