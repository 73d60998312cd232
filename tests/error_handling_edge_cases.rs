//! Failure paths and edge cases
//!
//! Every call must end in exactly one outcome: a written PNG or a typed error
//! with a stable code, never a partial file.

use maskcut::{
    map_coordinate, parse_color, BackgroundRemovalProcessor, BgRemovalError, CallbackSegmenter,
    Color, CompositingPolicy, ErrorKind, FixedMaskSegmenter, PixelBuffer, ProcessingStage,
    ProcessingTimings, ProgressReporter, ProgressUpdate, RemovalConfig, Result,
    SegmentationCompletion, SegmentationMask, UnsupportedSegmenter,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn red_png(dir: &Path) -> String {
    let path = dir.join("red.png");
    PixelBuffer::from_pixel(4, 4, image::Rgba([255, 0, 0, 255]))
        .save(&path)
        .unwrap();
    path.to_str().unwrap().to_string()
}

fn processor_in(dir: &Path, segmenter: Arc<dyn maskcut::Segmenter>) -> BackgroundRemovalProcessor {
    let config = RemovalConfig::builder()
        .output_dir(dir.join("out"))
        .build()
        .unwrap();
    BackgroundRemovalProcessor::new(segmenter, config).unwrap()
}

fn foreground() -> Arc<FixedMaskSegmenter> {
    Arc::new(FixedMaskSegmenter::new(
        SegmentationMask::uniform(1.0, (1, 1)).unwrap(),
    ))
}

fn output_files(dir: &Path) -> usize {
    std::fs::read_dir(dir.join("out")).map_or(0, |entries| entries.count())
}

#[test]
fn test_error_codes_are_stable() {
    let cases = [
        (BgRemovalError::invalid_image("x"), "INVALID_IMAGE"),
        (BgRemovalError::unsupported("x"), "UNSUPPORTED"),
        (BgRemovalError::segmentation_failed("x"), "SEGMENTATION_ERROR"),
        (BgRemovalError::persist_failed("x"), "PERSIST_ERROR"),
        (BgRemovalError::invalid_config("x"), "INVALID_CONFIG"),
    ];
    for (error, code) in cases {
        assert_eq!(error.code(), code);
        assert_eq!(error.kind().code(), code);
        let staged = error.at_stage("persisting");
        assert_eq!(staged.code(), code);
        assert!(staged.to_string().contains("persisting"));
    }
}

#[tokio::test]
async fn test_missing_file_is_invalid_image() {
    let dir = TempDir::new().unwrap();
    let processor = processor_in(dir.path(), foreground());
    let missing = dir.path().join("does_not_exist.png");

    let err = processor
        .remove_background(missing.to_str().unwrap(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidImage);
    assert_eq!(output_files(dir.path()), 0);
}

#[tokio::test]
async fn test_unrecognized_inputs_are_invalid_image() {
    let dir = TempDir::new().unwrap();
    let processor = processor_in(dir.path(), foreground());

    for uri in [
        "",
        "https://example.com/photo.png",
        "data:image/png,not-base64",
        "data:image/png;base64,%%%",
        "content://media/1",
    ] {
        let err = processor.remove_background(uri, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidImage, "uri {uri:?}");
    }
}

#[tokio::test]
async fn test_non_image_bytes_are_invalid_image() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.png");
    std::fs::write(&path, b"plain text, not a picture").unwrap();
    let empty = dir.path().join("empty.png");
    std::fs::write(&empty, b"").unwrap();

    let processor = processor_in(dir.path(), foreground());
    for input in [&path, &empty] {
        let err = processor
            .remove_background(input.to_str().unwrap(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidImage);
    }
}

#[tokio::test]
async fn test_unsupported_without_fallback() {
    let dir = TempDir::new().unwrap();
    let processor = processor_in(
        dir.path(),
        Arc::new(UnsupportedSegmenter::new("Background removal is not supported on simulator")),
    );

    let err = processor
        .remove_background(&red_png(dir.path()), None)
        .await
        .unwrap_err();
    assert!(err.is_unsupported());
    assert!(err.to_string().contains("simulator"));
    assert_eq!(output_files(dir.path()), 0);
}

#[tokio::test]
async fn test_completion_dropped_without_result() {
    let dir = TempDir::new().unwrap();
    let segmenter = CallbackSegmenter::new("forgetful", |_: &PixelBuffer, done: SegmentationCompletion| {
        drop(done);
    });
    let processor = processor_in(dir.path(), Arc::new(segmenter));

    let err = processor
        .remove_background(&red_png(dir.path()), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SegmentationFailed);
    assert_eq!(output_files(dir.path()), 0);
}

#[tokio::test]
async fn test_segmenter_reported_failure() {
    let dir = TempDir::new().unwrap();
    let segmenter = CallbackSegmenter::new("vision", |_: &PixelBuffer, done: SegmentationCompletion| {
        done.fail("no subject found");
    });
    let processor = processor_in(dir.path(), Arc::new(segmenter));

    let err = processor
        .remove_background(&red_png(dir.path()), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "SEGMENTATION_ERROR");
    assert!(err.to_string().contains("no subject found"));
}

#[tokio::test]
async fn test_unwritable_output_dir_is_persist_failure() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"file where a directory should be").unwrap();

    let config = RemovalConfig::builder()
        .output_dir(blocker.join("nested"))
        .build()
        .unwrap();
    let processor = BackgroundRemovalProcessor::new(foreground(), config).unwrap();

    let err = processor
        .remove_background(&red_png(dir.path()), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PersistFailed);
}

#[test]
fn test_invalid_config_rejected_before_processing() {
    for json in [
        r#"{"file_prefix": ""}"#,
        r#"{"file_prefix": "../escape_"}"#,
        r#"{"segmentation_timeout_ms": 0}"#,
        r#"{"policy": {"mode": "sharpen"}}"#,
        "not json",
    ] {
        let err = RemovalConfig::from_json_str(json).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig, "config {json}");
    }

    let mut config = RemovalConfig::default();
    config.file_prefix = "a/b".to_string();
    let err = BackgroundRemovalProcessor::new(foreground(), config)
        .err()
        .expect("invalid prefix must be rejected");
    assert_eq!(err.kind(), ErrorKind::InvalidConfig);
}

#[test]
fn test_malformed_colors_fall_back_to_white() {
    for input in [
        None,
        Some(""),
        Some("#"),
        Some("#FFF"),
        Some("GG0000"),
        Some("#12345"),
        Some("+1234567"),
        Some("#1234567890"),
    ] {
        assert_eq!(parse_color(input), Color::DEFAULT, "input {input:?}");
    }
    assert_eq!(parse_color(Some("#00FF00")), Color::rgb(0, 255, 0));
    assert_eq!(parse_color(Some("  ff000080 ")).a, 0x80);
}

#[test]
fn test_mapping_stays_in_bounds() {
    let dims = [1_u32, 2, 3, 7, 64, 513];
    for &iw in &dims {
        for &ih in &dims {
            for &mw in &dims {
                for &mh in &dims {
                    for (x, y) in [(0, 0), (iw - 1, ih - 1), (iw / 2, ih / 3)] {
                        let (mx, my) = map_coordinate(x, y, iw, ih, mw, mh);
                        assert!(mx < mw && my < mh, "({x},{y}) in {iw}x{ih} -> {mw}x{mh}");
                    }
                }
            }
        }
    }
    assert_eq!(map_coordinate(u32::MAX - 1, 0, u32::MAX, 1, u32::MAX, 1).0, u32::MAX - 1);
}

#[test]
fn test_truncated_mask_composites_missing_cells_as_background() -> Result<()> {
    let image = PixelBuffer::from_pixel(2, 2, image::Rgba([9, 9, 9, 255]));
    let mask = SegmentationMask::from_u8_partial(&[255, 255, 255], (2, 2))?;
    assert!(mask.is_partial());

    let out = maskcut::composite(&image, &mask, CompositingPolicy::default(), Color::rgb(1, 2, 3));
    assert_eq!(out.get_pixel(0, 1).0, [9, 9, 9, 255]);
    assert_eq!(out.get_pixel(1, 1).0, [1, 2, 3, 255]);
    Ok(())
}

#[test]
fn test_mask_constructors_reject_bad_input() {
    assert!(SegmentationMask::from_u8(&[0; 3], (2, 2)).is_err());
    assert!(SegmentationMask::from_u8(&[], (0, 0)).is_err());
    assert!(SegmentationMask::from_f32(&[0.5], (2, 1)).is_err());
    assert!(SegmentationMask::uniform(1.0, (0, 3)).is_err());
    assert!(SegmentationMask::from_u8_partial(&[0; 5], (2, 2)).is_err());

    // Out-of-range scores are clamped and NaN reads as background
    let mask = SegmentationMask::from_f32(&[1.5, f32::NAN], (2, 1)).unwrap();
    assert_eq!(mask.scores(), &[1.0, 0.0]);
}

#[derive(Default)]
struct RecordingReporter {
    stages: Mutex<Vec<ProcessingStage>>,
    errors: Mutex<Vec<String>>,
}

impl ProgressReporter for RecordingReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        self.stages.lock().unwrap().push(update.stage);
    }

    fn report_completion(&self, _timings: &ProcessingTimings) {}

    fn report_error(&self, _stage: ProcessingStage, error: &str) {
        self.errors.lock().unwrap().push(error.to_string());
    }
}

#[tokio::test]
async fn test_progress_stops_at_failing_stage() {
    let dir = TempDir::new().unwrap();
    let reporter = Arc::new(RecordingReporter::default());
    let segmenter = CallbackSegmenter::new("vision", |_: &PixelBuffer, done: SegmentationCompletion| {
        done.fail("model crashed");
    });
    let processor = processor_in(dir.path(), Arc::new(segmenter)).with_progress_reporter(reporter.clone());

    assert!(processor.remove_background(&red_png(dir.path()), None).await.is_err());

    let stages = reporter.stages.lock().unwrap().clone();
    assert_eq!(stages.last(), Some(&ProcessingStage::Segmenting));
    assert!(!stages.contains(&ProcessingStage::Persisting));
    assert_eq!(reporter.errors.lock().unwrap().len(), 1);
}
