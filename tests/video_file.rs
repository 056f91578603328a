//! FFmpeg-backed source and end-to-end conversion tests.
//!
//! Tests require fixture files from `tests/fixtures/generate_fixtures.sh`
//! and are skipped when they are missing.

use std::path::Path;

use gifcast::{
    ConversionOutcome, Converter, FrameAdmissionPolicy, FrameSource, OutputTarget,
    ProcessingConfig, VideoFile,
};

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

fn static_video_path() -> &'static str {
    "tests/fixtures/static_video.mp4"
}

// ── VideoFile ────────────────────────────────────────────────────

#[test]
fn open_reports_header_properties() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let source = VideoFile::open(path).expect("Failed to open test video");
    let info = source.info();
    assert_eq!((info.width, info.height), (320, 240));
    assert!((info.frames_per_second - 30.0).abs() < 0.01);
    assert!(info.frame_count >= 140 && info.frame_count <= 160);
}

#[test]
fn frames_are_sequential_and_native_size() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut source = VideoFile::open(path).expect("Failed to open test video");
    let mut expected = 0;
    while let Some(frame) = source.next_frame().expect("Failed to decode") {
        assert_eq!(frame.index, expected);
        assert_eq!(frame.image.dimensions(), (320, 240));
        expected += 1;
    }
    assert!(expected > 0);
    assert!(source.next_frame().unwrap().is_none());
}

// ── Conversion ───────────────────────────────────────────────────

#[test]
fn convert_sample_every_third_frame() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let directory = tempfile::tempdir().unwrap();
    let output = directory.path().join("sample.gif");
    let config =
        ProcessingConfig::new().with_admission(FrameAdmissionPolicy::FixedStride { step: 3 });
    let outcome = Converter::new(config)
        .unwrap()
        .convert(path, OutputTarget::path(&output))
        .expect("Failed to convert");

    let ConversionOutcome::Completed(report) = outcome else {
        panic!("conversion was cancelled");
    };
    assert_eq!(report.frame_duration_ms, 100);
    assert_eq!((report.width, report.height), (160, 120));
    assert!(output.exists());
}

#[test]
fn static_video_with_high_threshold_keeps_one_frame() {
    let path = static_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let directory = tempfile::tempdir().unwrap();
    let config = ProcessingConfig::new().with_admission(FrameAdmissionPolicy::Adaptive {
        motion_threshold: 70_000.0,
    });
    let outcome = Converter::new(config)
        .unwrap()
        .convert(path, OutputTarget::path(directory.path().join("still.gif")))
        .expect("Failed to convert");

    let ConversionOutcome::Completed(report) = outcome else {
        panic!("conversion was cancelled");
    };
    assert_eq!(report.frame_count, 1);
}
