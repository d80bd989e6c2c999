use std::collections::HashMap;
use std::time::Instant;

/// Cross-cutting logger for recognition pipeline events.
///
/// Lets the use case report progress and stage timings without knowing
/// whether the caller prints them, aggregates them or ignores them.
pub trait PipelineLogger: Send {
    /// Report clip-level progress.
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long a named pipeline stage took for one clip.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. phonemes decoded, window onset).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI-oriented logger that keeps per-stage timings and metrics and prints
/// a summary when the batch is done.
///
/// Progress lines are throttled to every `throttle_clips` clips. Worker
/// threads each keep their own logger; the batch merges them at the end.
pub struct StdoutPipelineLogger {
    throttle_clips: usize,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    total_clips: usize,
    messages: Vec<String>,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_clips: usize) -> Self {
        Self {
            throttle_clips: throttle_clips.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            total_clips: 0,
            messages: Vec::new(),
        }
    }

    /// Fold another logger's recorded timings, metrics and messages into this one.
    pub fn merge(&mut self, other: StdoutPipelineLogger) {
        for (stage, values) in other.timings {
            self.timings.entry(stage).or_default().extend(values);
        }
        for (name, values) in other.metrics {
            self.metrics.entry(name).or_default().extend(values);
        }
        self.messages.extend(other.messages);
        self.total_clips = self.total_clips.max(other.total_clips);
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let clips = self.total_clips;
        let mut lines = vec![format!(
            "Recognition summary ({clips} clips, {:.1}s total):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = mean(durations);
            lines.push(format!(
                "  {stage:10}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms  ({} clips)",
                durations.len()
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            lines.push(format!("  {name}: avg {:.1}", mean(&self.metrics[name])));
        }

        if clips > 0 && elapsed_ms > 0.0 {
            let rate = clips as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {rate:.1} clips/s"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.total_clips = total;
        if total > 0 && (current % self.throttle_clips == 0 || current == total) {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Recognizing: {current}/{total} clips ({pct:.1}%)");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn info(&mut self, message: &str) {
        self.messages.push(message.to_string());
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullPipelineLogger;
        logger.progress(1, 10);
        logger.timing("model", 5.0);
        logger.metric("phonemes", 3.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_records_values() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing("model", 20.0);
        logger.timing("model", 30.0);
        logger.timing("decode", 0.5);

        assert_eq!(logger.timings_for("model").unwrap(), &[20.0, 30.0]);
        assert_eq!(logger.timings_for("decode").unwrap(), &[0.5]);
        assert!(logger.timings_for("classify").is_none());
    }

    #[test]
    fn test_summary_lists_stages_and_metrics() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.total_clips = 2;
        logger.timing("segment", 1.0);
        logger.timing("model", 40.0);
        logger.metric("phonemes", 2.0);
        logger.metric("phonemes", 3.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Recognition summary"));
        assert!(summary.contains("segment"));
        assert!(summary.contains("model"));
        assert!(summary.contains("phonemes: avg 2.5"));
        assert!(summary.contains("clips/s"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(StdoutPipelineLogger::new(10).summary_string().is_none());
    }

    #[test]
    fn test_progress_tracks_total() {
        let mut logger = StdoutPipelineLogger::new(3);
        for i in 1..=7 {
            logger.progress(i, 7);
        }
        assert_eq!(logger.total_clips, 7);
    }

    #[test]
    fn test_merge_combines_workers() {
        let mut main = StdoutPipelineLogger::new(10);
        main.timing("model", 10.0);
        main.info("first");

        let mut worker = StdoutPipelineLogger::new(10);
        worker.timing("model", 30.0);
        worker.timing("classify", 0.1);
        worker.metric("phonemes", 4.0);
        worker.progress(5, 5);
        worker.info("second");

        main.merge(worker);
        let model = main.timings_for("model").unwrap();
        assert_eq!(model.len(), 2);
        assert_relative_eq!(mean(model), 20.0);
        assert!(main.timings_for("classify").is_some());
        assert_eq!(main.metrics_for("phonemes").unwrap(), &[4.0]);
        assert_eq!(main.messages, ["first", "second"]);
        assert_eq!(main.total_clips, 5);
    }

    #[test]
    fn test_default_throttle() {
        assert_eq!(StdoutPipelineLogger::default().throttle_clips, 10);
    }
}
