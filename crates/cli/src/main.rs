use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;

use akshara_core::audio::domain::onset_segmenter::OnsetSegmenter;
use akshara_core::audio::infrastructure::ffmpeg_audio_reader::FfmpegAudioReader;
use akshara_core::audio::infrastructure::spectral_feature_extractor::SpectralFeatureExtractor;
use akshara_core::pipeline::batch_executor::{BatchExecutor, ClipOutcome};
use akshara_core::pipeline::infrastructure::threaded_batch_executor::ThreadedBatchExecutor;
use akshara_core::pipeline::pipeline_logger::{PipelineLogger, StdoutPipelineLogger};
use akshara_core::pipeline::recognize_letter_use_case::RecognizeLetterUseCase;
use akshara_core::recognition::domain::acoustic_model::{AcousticModel, InferenceError};
use akshara_core::recognition::domain::alphabet_classifier::AlphabetClassifier;
use akshara_core::recognition::domain::phoneme::PhonemeInventory;
use akshara_core::recognition::domain::recognition_result::RecognitionResult;
use akshara_core::recognition::domain::rule_table::RuleTable;
use akshara_core::recognition::domain::sequence_decoder::GreedyDecoder;
use akshara_core::recognition::infrastructure::model_cell::{ModelCell, ModelLoader};
use akshara_core::recognition::infrastructure::onnx_acoustic_model::OnnxAcousticModel;
use akshara_core::shared::constants::ACOUSTIC_MODEL_NAME;
use akshara_core::shared::model_resolver::{self, ModelSource};

/// Recognize the single spoken letter in each audio clip.
#[derive(Parser)]
#[command(name = "akshara")]
struct Cli {
    /// Audio or video files, one spoken letter each.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Acoustic model file (skips cache lookup and download).
    #[arg(long)]
    model: Option<PathBuf>,

    /// URL to download the acoustic model from when it is not cached.
    #[arg(long)]
    model_url: Option<String>,

    /// JSON rule table to use instead of the built-in English alphabet.
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Print one JSON object per file instead of a text line.
    #[arg(long)]
    json: bool,

    /// Worker threads (default: available CPUs).
    #[arg(long)]
    jobs: Option<usize>,

    /// Log progress every N clips.
    #[arg(long, default_value = "10")]
    progress_every: usize,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let inventory = PhonemeInventory::standard();
    let rules = match &cli.rules {
        Some(path) => RuleTable::load(path)?,
        None => RuleTable::english_alphabet(),
    };
    rules.validate_against(&inventory)?;

    let model = Arc::new(ModelCell::new(model_loader(
        cli.model.clone(),
        cli.model_url.clone(),
        inventory.clone(),
    )));
    model.get()?;
    eprintln!();

    let use_case = Arc::new(RecognizeLetterUseCase::new(
        Arc::clone(&model),
        OnsetSegmenter::default(),
        GreedyDecoder::new(inventory),
        AlphabetClassifier::new(rules),
    ));

    let executor = match cli.jobs {
        Some(jobs) => ThreadedBatchExecutor::new(jobs),
        None => ThreadedBatchExecutor::default(),
    };
    let mut logger = StdoutPipelineLogger::new(cli.progress_every);
    logger.info(&format!(
        "Recognizing {} clips on {} workers",
        cli.inputs.len(),
        executor.workers()
    ));

    let outcomes = executor.execute(
        &cli.inputs,
        Arc::new(FfmpegAudioReader),
        use_case,
        &mut logger,
    );

    for outcome in &outcomes {
        if cli.json {
            println!("{}", json_line(outcome)?);
        } else {
            println!("{}", text_line(outcome));
        }
    }

    if let Some(load) = model.load_duration() {
        logger.metric("model_load_ms", load.as_secs_f64() * 1000.0);
    }
    logger.summary();

    let failed = outcomes
        .iter()
        .filter(|o| o.result.as_ref().is_err_and(|e| e.is_inference_failure()))
        .count();
    if failed > 0 {
        return Err(format!("{failed} of {} clips failed during inference", outcomes.len()).into());
    }
    Ok(())
}

fn model_loader(
    explicit: Option<PathBuf>,
    url: Option<String>,
    inventory: PhonemeInventory,
) -> ModelLoader {
    Box::new(move || {
        let bundled_dir = bundled_model_dir();
        let source = ModelSource {
            explicit: explicit.as_deref(),
            bundled_dir: bundled_dir.as_deref(),
            url: url.as_deref(),
        };
        log::info!("Resolving model: {ACOUSTIC_MODEL_NAME}");
        let path = model_resolver::resolve(
            ACOUSTIC_MODEL_NAME,
            &source,
            Some(Box::new(download_progress)),
        )
        .map_err(|e| InferenceError::Load(e.to_string()))?;

        let model = OnnxAcousticModel::new(
            &path,
            Box::new(SpectralFeatureExtractor::new()),
            &inventory,
        )?;
        Ok(Arc::new(model) as Arc<dyn AcousticModel>)
    })
}

/// `models/` next to the executable, if it exists.
fn bundled_model_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let dir = exe.parent()?.join("models");
    dir.is_dir().then_some(dir)
}

fn text_line(outcome: &ClipOutcome) -> String {
    let name = outcome.path.display();
    match &outcome.result {
        Ok(result) => format!(
            "{name}: {} (confidence {:.2}) [{}]",
            result.letter,
            result.confidence,
            result.phonemes.join(" ")
        ),
        Err(e) => format!("{name}: error: {e}"),
    }
}

/// One `--json` output line: the file name plus the recognition result or
/// the error it failed with.
#[derive(Serialize)]
struct FileLine<'a> {
    file: String,
    #[serde(flatten)]
    body: LineBody<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum LineBody<'a> {
    Recognized(&'a RecognitionResult),
    Failed { success: bool, error: String },
}

fn json_line(outcome: &ClipOutcome) -> Result<String, serde_json::Error> {
    let body = match &outcome.result {
        Ok(result) => LineBody::Recognized(result),
        Err(e) => LineBody::Failed {
            success: false,
            error: e.to_string(),
        },
    };
    serde_json::to_string(&FileLine {
        file: outcome.path.display().to_string(),
        body,
    })
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(model) = &cli.model {
        if !model.exists() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    if let Some(rules) = &cli.rules {
        if !rules.exists() {
            return Err(format!("Rule table not found: {}", rules.display()).into());
        }
    }
    if cli.jobs == Some(0) {
        return Err("Jobs must be at least 1".into());
    }
    if cli.progress_every == 0 {
        return Err("Progress interval must be at least 1".into());
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading acoustic model... {pct}%");
    } else {
        eprint!("\rDownloading acoustic model... {downloaded} bytes");
    }
}
