//! Background removal processor
//!
//! `BackgroundRemovalProcessor` runs one call end to end:
//! capability check, decode, segment, composite, encode and persist. Every
//! failure leaves the call with exactly one typed error and no output file.

use crate::{
    compositor::Compositor,
    config::RemovalConfig,
    error::{BgRemovalError, Result},
    segmenter::{Segmenter, SupportStatus},
    services::{
        ContentResolver, ImageIOService, ImageSource, NoOpProgressReporter, ProcessingStage,
        ProgressReporter, ProgressTracker,
    },
    types::{PixelBuffer, ProcessingTimings, RemovalOutcome, SegmentationMask},
};
use instant::Instant;
use std::sync::Arc;
use tracing::{debug, info, instrument, span, warn, Instrument, Level};

/// Orchestrates background removal around an injected segmenter
pub struct BackgroundRemovalProcessor {
    segmenter: Arc<dyn Segmenter>,
    config: RemovalConfig,
    content_resolver: Option<Arc<dyn ContentResolver>>,
    progress_reporter: Arc<dyn ProgressReporter>,
}

impl BackgroundRemovalProcessor {
    /// Create a processor
    ///
    /// # Errors
    /// - `InvalidConfig` if the configuration does not validate
    pub fn new(segmenter: Arc<dyn Segmenter>, config: RemovalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            segmenter,
            config,
            content_resolver: None,
            progress_reporter: Arc::new(NoOpProgressReporter),
        })
    }

    /// Resolve `content://` inputs through the given resolver
    #[must_use]
    pub fn with_content_resolver(mut self, resolver: Arc<dyn ContentResolver>) -> Self {
        self.content_resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn with_progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = reporter;
        self
    }

    #[must_use]
    pub fn config(&self) -> &RemovalConfig {
        &self.config
    }

    /// Capability query that needs no image
    #[must_use]
    pub fn support_status(&self) -> SupportStatus {
        self.segmenter.support()
    }

    #[must_use]
    pub fn is_background_removal_supported(&self) -> bool {
        self.support_status().is_supported()
    }

    /// Remove the background of the image at `image_uri`
    ///
    /// The background is `background_color_hex` when it parses, else the
    /// configured color, else opaque white. Malformed colors never fail
    /// the call.
    ///
    /// When segmentation is unsupported and `fallback_to_original` is set,
    /// the input URI comes back unchanged with `was_processed == false`.
    ///
    /// # Errors
    /// - `InvalidImage` when the URI cannot be resolved or decoded
    /// - `Unsupported` when the environment cannot segment and fallback is off
    /// - `SegmentationFailed` when the model fails or times out
    /// - `PersistFailed` when the PNG cannot be written
    #[instrument(
        skip(self, image_uri, background_color_hex),
        fields(segmenter = %self.segmenter.name(), policy = %self.config.policy)
    )]
    pub async fn remove_background(
        &self,
        image_uri: &str,
        background_color_hex: Option<&str>,
    ) -> Result<RemovalOutcome> {
        let tracker = ProgressTracker::new(self.progress_reporter.as_ref());
        let result = self.run(image_uri, background_color_hex, &tracker).await;
        match &result {
            Ok(outcome) if outcome.was_processed => tracker.report_completion(&outcome.timings),
            Ok(_) => {},
            Err(e) => {
                tracker.report_error(&e.to_string());
                warn!(code = e.code(), "Background removal failed: {}", e);
            },
        }
        result
    }

    async fn run(
        &self,
        image_uri: &str,
        background_color_hex: Option<&str>,
        tracker: &ProgressTracker<'_>,
    ) -> Result<RemovalOutcome> {
        let total_start = Instant::now();
        let mut timings = ProcessingTimings::default();

        // Reject malformed URIs even when falling back
        let source = ImageSource::parse(image_uri)?;

        tracker.report_stage(ProcessingStage::CapabilityCheck);
        if let SupportStatus::Unsupported { reason } = self.support_status() {
            return self.unsupported(image_uri, reason);
        }

        tracker.report_stage(ProcessingStage::Decoding);
        let start = Instant::now();
        let image = async {
            let bytes =
                ImageIOService::read_source(&source, self.content_resolver.as_deref()).await?;
            ImageIOService::decode(&bytes, &source.describe())
        }
        .instrument(span!(Level::DEBUG, "decoding", source = %source.describe()))
        .await
        .map_err(|e| e.at_stage("decoding"))?;
        timings.image_decode_ms = start.elapsed().as_millis() as u64;
        let dimensions = image.dimensions();

        tracker.report_stage(ProcessingStage::Segmenting);
        let start = Instant::now();
        let mask = match self.segment(&image).await {
            Ok(mask) => mask,
            Err(e) if e.is_unsupported() && self.config.fallback_to_original => {
                return self.unsupported(image_uri, e.to_string());
            },
            Err(e) => return Err(e.at_stage("segmenting")),
        };
        timings.segmentation_ms = start.elapsed().as_millis() as u64;

        let background = self.config.background_for(background_color_hex);
        let composited = {
            let _span = span!(
                Level::DEBUG,
                "compositing",
                width = dimensions.0,
                height = dimensions.1,
                background = %background
            )
            .entered();
            tracker.report_stage(ProcessingStage::Compositing);
            let start = Instant::now();
            let composited = self.compositor(background).composite(&image, &mask);
            timings.compositing_ms = start.elapsed().as_millis() as u64;
            composited
        };
        drop(image);

        tracker.report_stage(ProcessingStage::Persisting);
        let start = Instant::now();
        let output_path = self.persist(composited).await.map_err(|e| e.at_stage("persisting"))?;
        timings.image_encode_ms = start.elapsed().as_millis() as u64;
        timings.total_ms = total_start.elapsed().as_millis() as u64;

        info!(
            output = %output_path.display(),
            width = dimensions.0,
            height = dimensions.1,
            total_ms = timings.total_ms,
            "Background removed"
        );

        Ok(RemovalOutcome {
            output_uri: ImageIOService::file_uri(&output_path),
            was_processed: true,
            dimensions: Some(dimensions),
            timings,
        })
    }

    /// Segment and composite an already decoded image without touching disk
    ///
    /// # Errors
    /// - `Unsupported` / `SegmentationFailed` from the segmenter
    pub async fn process_image(
        &self,
        image: &PixelBuffer,
        background_color_hex: Option<&str>,
    ) -> Result<PixelBuffer> {
        let mask = self.segment(image).await?;
        let background = self.config.background_for(background_color_hex);
        Ok(self.compositor(background).composite(image, &mask))
    }

    async fn segment(&self, image: &PixelBuffer) -> Result<SegmentationMask> {
        let segmentation = self
            .segmenter
            .segment(image)
            .instrument(span!(Level::INFO, "segmentation", segmenter = %self.segmenter.name()));

        let mask = match self.config.segmentation_timeout() {
            Some(limit) => tokio::time::timeout(limit, segmentation).await.map_err(|_| {
                BgRemovalError::segmentation_failed(format!(
                    "{} did not finish within {} ms",
                    self.segmenter.name(),
                    limit.as_millis()
                ))
            })??,
            None => segmentation.await?,
        };

        let stats = mask.statistics();
        debug!(
            mask_width = mask.width(),
            mask_height = mask.height(),
            partial = mask.is_partial(),
            foreground_ratio = stats.foreground_ratio,
            "Received segmentation mask"
        );
        Ok(mask)
    }

    fn compositor(&self, background: crate::color::Color) -> Compositor {
        Compositor::new(self.config.policy, background).parallel(self.config.parallel)
    }

    async fn persist(&self, composited: PixelBuffer) -> Result<std::path::PathBuf> {
        let dir = self.config.resolved_output_dir();
        let prefix = self.config.file_prefix.clone();
        tokio::task::spawn_blocking(move || {
            let png = ImageIOService::encode_png(&composited)?;
            ImageIOService::persist_png(&png, &dir, &prefix)
        })
        .await
        .map_err(|e| BgRemovalError::persist_failed(format!("Output writer task failed: {}", e)))?
    }

    fn unsupported(&self, image_uri: &str, reason: String) -> Result<RemovalOutcome> {
        if self.config.fallback_to_original {
            warn!(reason = %reason, "Background removal unsupported, returning original image");
            return Ok(RemovalOutcome::unprocessed(image_uri));
        }
        Err(BgRemovalError::unsupported(reason))
    }
}
