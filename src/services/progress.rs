//! Progress reporting service
//!
//! Keeps progress reporting out of the pipeline logic so each frontend can
//! decide how (and whether) to surface it.

use crate::types::ProcessingTimings;
use instant::Instant;
use std::sync::Mutex;

/// Stages of a single background removal call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Checking that the segmenter can run here
    CapabilityCheck,
    /// Resolving the URI and decoding the image
    Decoding,
    /// Waiting for the segmenter
    Segmenting,
    /// Blending foreground and background
    Compositing,
    /// Encoding the PNG and writing it to disk
    Persisting,
    /// Output written
    Completed,
}

impl ProcessingStage {
    /// Get a human-readable description of the processing stage
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            ProcessingStage::CapabilityCheck => "Checking segmentation support",
            ProcessingStage::Decoding => "Decoding input image",
            ProcessingStage::Segmenting => "Running subject segmentation",
            ProcessingStage::Compositing => "Compositing over background",
            ProcessingStage::Persisting => "Writing PNG output",
            ProcessingStage::Completed => "Processing completed",
        }
    }

    /// Get the typical progress percentage for this stage
    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        match self {
            ProcessingStage::CapabilityCheck => 2,
            ProcessingStage::Decoding => 10,
            ProcessingStage::Segmenting => 60,
            ProcessingStage::Compositing => 85,
            ProcessingStage::Persisting => 95,
            ProcessingStage::Completed => 100,
        }
    }
}

/// Progress update containing stage and timing information
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Current processing stage
    pub stage: ProcessingStage,
    /// Progress percentage (0-100)
    pub progress: u8,
    /// Human-readable stage description
    pub description: String,
    /// Elapsed time since processing started (milliseconds)
    pub elapsed_ms: u64,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new(stage: ProcessingStage, start_time: Instant) -> Self {
        Self::with_description(stage, stage.description().to_string(), start_time)
    }

    #[must_use]
    pub fn with_description(
        stage: ProcessingStage,
        description: String,
        start_time: Instant,
    ) -> Self {
        Self {
            progress: stage.progress_percentage(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            stage,
            description,
        }
    }
}

/// Trait for reporting progress during background removal operations
pub trait ProgressReporter: Send + Sync {
    /// Report a progress update
    fn report_progress(&self, update: ProgressUpdate);

    /// Report processing completion with final timings
    fn report_completion(&self, timings: &ProcessingTimings);

    /// Report an error during processing
    ///
    /// # Arguments
    /// * `stage` - Stage where error occurred
    /// * `error` - Error description
    fn report_error(&self, stage: ProcessingStage, error: &str);
}

/// No-op progress reporter that discards all progress updates
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_progress(&self, _update: ProgressUpdate) {}

    fn report_completion(&self, _timings: &ProcessingTimings) {}

    fn report_error(&self, _stage: ProcessingStage, _error: &str) {}
}

/// Reporter that emits progress as tracing events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgressReporter {
    verbose: bool,
}

impl TracingProgressReporter {
    /// # Arguments
    /// * `verbose` - Include elapsed times and the per-stage timing breakdown
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for TracingProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        if self.verbose {
            tracing::info!(
                progress = update.progress,
                elapsed_ms = update.elapsed_ms,
                "[{}%] {}",
                update.progress,
                update.description
            );
        } else {
            tracing::info!("[{}%] {}", update.progress, update.description);
        }
    }

    fn report_completion(&self, timings: &ProcessingTimings) {
        tracing::info!(total_ms = timings.total_ms, "Background removal completed");
        if self.verbose {
            tracing::info!("{}", timings.summary());
        }
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        tracing::error!(stage = ?stage, "Error during {}: {}", stage.description(), error);
    }
}

/// Progress tracker that manages timing and progress reporting for one call
pub struct ProgressTracker<'a> {
    reporter: &'a dyn ProgressReporter,
    start_time: Instant,
    current_stage: Mutex<Option<ProcessingStage>>,
}

impl<'a> ProgressTracker<'a> {
    #[must_use]
    pub fn new(reporter: &'a dyn ProgressReporter) -> Self {
        Self {
            reporter,
            start_time: Instant::now(),
            current_stage: Mutex::new(None),
        }
    }

    /// Report progress for a specific stage
    pub fn report_stage(&self, stage: ProcessingStage) {
        if let Ok(mut current) = self.current_stage.lock() {
            *current = Some(stage);
        }
        self.reporter
            .report_progress(ProgressUpdate::new(stage, self.start_time));
    }

    pub fn report_completion(&self, timings: &ProcessingTimings) {
        self.report_stage(ProcessingStage::Completed);
        self.reporter.report_completion(timings);
    }

    /// Report an error against the most recently entered stage
    pub fn report_error(&self, error: &str) {
        let stage = self
            .current_stage()
            .unwrap_or(ProcessingStage::CapabilityCheck);
        self.reporter.report_error(stage, error);
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    #[must_use]
    pub fn current_stage(&self) -> Option<ProcessingStage> {
        self.current_stage.lock().ok().and_then(|stage| *stage)
    }
}
