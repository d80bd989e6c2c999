use std::path::PathBuf;
use std::sync::Arc;

use crate::audio::domain::audio_reader::AudioReader;
use crate::pipeline::batch_executor::{recognize_file, BatchExecutor, ClipError, ClipOutcome};
use crate::pipeline::pipeline_logger::{PipelineLogger, StdoutPipelineLogger};
use crate::pipeline::recognize_letter_use_case::RecognizeLetterUseCase;
use crate::recognition::domain::recognition_result::RecognitionResult;

type Job = (usize, PathBuf);
type Done = (usize, Result<RecognitionResult, ClipError>);

/// Runs recognition on a fixed pool of worker threads.
///
/// Layout: `main [jobs] → workers [decode → recognize] → main [collect]`
///
/// Each worker keeps its own logger; their timings are merged into the
/// caller's logger once the pool has drained.
pub struct ThreadedBatchExecutor {
    workers: usize,
}

impl ThreadedBatchExecutor {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Default for ThreadedBatchExecutor {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(workers)
    }
}

impl BatchExecutor for ThreadedBatchExecutor {
    fn execute(
        &self,
        paths: &[PathBuf],
        reader: Arc<dyn AudioReader>,
        use_case: Arc<RecognizeLetterUseCase>,
        logger: &mut StdoutPipelineLogger,
    ) -> Vec<ClipOutcome> {
        let total = paths.len();
        let workers = self.workers.min(total.max(1));

        let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
        let (done_tx, done_rx) = crossbeam_channel::unbounded::<Done>();
        for job in paths.iter().cloned().enumerate() {
            // Receiver is alive until the handles below are joined.
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let handles: Vec<_> = (0..workers)
            .map(|_| {
                spawn_worker(
                    job_rx.clone(),
                    done_tx.clone(),
                    Arc::clone(&reader),
                    Arc::clone(&use_case),
                )
            })
            .collect();
        drop(done_tx);

        let mut results: Vec<Option<Result<RecognitionResult, ClipError>>> =
            (0..total).map(|_| None).collect();
        let mut finished = 0;
        for (index, result) in done_rx {
            finished += 1;
            logger.progress(finished, total);
            results[index] = Some(result);
        }

        for handle in handles {
            match handle.join() {
                Ok(worker_logger) => logger.merge(worker_logger),
                Err(_) => log::error!("Recognition worker panicked"),
            }
        }

        paths
            .iter()
            .cloned()
            .zip(results)
            .map(|(path, result)| ClipOutcome {
                path,
                result: result.unwrap_or_else(|| {
                    Err(ClipError::Read("worker stopped before the clip was processed".into()))
                }),
            })
            .collect()
    }
}

fn spawn_worker(
    job_rx: crossbeam_channel::Receiver<Job>,
    done_tx: crossbeam_channel::Sender<Done>,
    reader: Arc<dyn AudioReader>,
    use_case: Arc<RecognizeLetterUseCase>,
) -> std::thread::JoinHandle<StdoutPipelineLogger> {
    std::thread::spawn(move || {
        let mut logger = StdoutPipelineLogger::new(usize::MAX);
        for (index, path) in job_rx {
            let result = recognize_file(&path, reader.as_ref(), &use_case, &mut logger);
            if let Err(ref e) = result {
                log::warn!("{}: {e}", path.display());
            }
            if done_tx.send((index, result)).is_err() {
                break;
            }
        }
        logger
    })
}
