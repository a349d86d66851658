//! Progress reporting service
//!
//! The removal backend reports raw `(stage, current, total)` ticks through a
//! [`ProgressCallback`]. The [`ProgressMeter`] turns those into the percentage
//! a progress bar shows, and [`ProgressReporter`] implementations decide
//! where those percentages go (logs, terminals, nowhere).

use instant::Instant;

/// Receiver of raw progress ticks from a removal backend
pub trait ProgressCallback: Send + Sync {
    /// `stage` is a backend-defined key such as `fetch:model` or `compute:inference`
    fn on_progress(&self, stage: &str, current: u64, total: u64);
}

impl<F> ProgressCallback for F
where
    F: Fn(&str, u64, u64) + Send + Sync,
{
    fn on_progress(&self, stage: &str, current: u64, total: u64) {
        self(stage, current, total);
    }
}

/// Human-readable label for a backend stage key
#[must_use]
pub fn describe_stage(stage: &str) -> &'static str {
    let (family, detail) = stage.split_once(':').unwrap_or((stage, ""));
    match (family, detail) {
        ("fetch", _) => "Downloading model",
        ("compute", "decode") => "Decoding image",
        ("compute", "mask") => "Computing mask",
        ("compute", "encode") => "Encoding result",
        ("compute", _) => "Removing background",
        _ => "Processing",
    }
}

/// Maps raw progress ticks to a display percentage for one job.
///
/// The displayed value is floored at `min_visible` while running, clamped to
/// 100, and never moves backwards. Ticks with `total == 0` or out-of-range
/// ratios are clamped rather than trusted.
#[derive(Debug, Clone)]
pub struct ProgressMeter {
    min_visible: u8,
    current: u8,
}

impl ProgressMeter {
    #[must_use]
    pub fn new(min_visible: u8) -> Self {
        Self {
            min_visible: min_visible.min(100),
            current: 0,
        }
    }

    /// Enter the running state and return the first visible percentage
    pub fn start(&mut self) -> u8 {
        self.current = self.min_visible;
        self.current
    }

    /// Fold one tick into the meter and return the percentage to display
    pub fn update(&mut self, current: u64, total: u64) -> u8 {
        let ratio = if total == 0 {
            0.0
        } else {
            (current as f64 / total as f64).clamp(0.0, 1.0)
        };
        let percent = (ratio * 100.0).round() as u8;
        self.current = self.current.max(percent).max(self.min_visible).min(100);
        self.current
    }

    #[must_use]
    pub fn percent(&self) -> u8 {
        self.current
    }
}

/// Progress update containing stage and timing information
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Backend stage key
    pub stage: String,
    /// Display percentage (0-100)
    pub progress: u8,
    /// Human-readable stage description
    pub description: &'static str,
    /// Elapsed time since the job started (milliseconds)
    pub elapsed_ms: u64,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new(stage: &str, progress: u8, start_time: Instant) -> Self {
        Self {
            stage: stage.to_string(),
            progress,
            description: describe_stage(stage),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
        }
    }
}

/// Trait for reporting progress during background removal operations
pub trait ProgressReporter: Send + Sync {
    /// Report a progress update
    fn report_progress(&self, update: ProgressUpdate);

    /// Report that a job produced a result
    fn report_completion(&self, elapsed_ms: u64);

    /// Report a processing failure
    fn report_error(&self, error: &str);

    /// Report that a job was cancelled or superseded
    fn report_cancelled(&self) {}
}

/// No-op progress reporter that discards all progress updates
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_progress(&self, _update: ProgressUpdate) {}

    fn report_completion(&self, _elapsed_ms: u64) {}

    fn report_error(&self, _error: &str) {}
}

/// Console progress reporter that logs progress
pub struct ConsoleProgressReporter {
    verbose: bool,
}

impl ConsoleProgressReporter {
    /// Create a new console progress reporter
    ///
    /// # Arguments
    /// * `verbose` - Whether to include stage keys and timings
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        if self.verbose {
            log::info!(
                "[{}%] {} ({}, {}ms elapsed)",
                update.progress,
                update.description,
                update.stage,
                update.elapsed_ms
            );
        } else {
            log::info!("[{}%] {}", update.progress, update.description);
        }
    }

    fn report_completion(&self, elapsed_ms: u64) {
        log::info!("✅ Background removed in {}ms", elapsed_ms);
    }

    fn report_error(&self, error: &str) {
        log::error!("❌ {}", error);
    }

    fn report_cancelled(&self) {
        if self.verbose {
            log::info!("Processing cancelled");
        }
    }
}
