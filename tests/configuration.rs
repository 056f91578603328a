//! ProcessingConfig, Settings and output-resolution tests.

use gifcast::{
    ColorStrategy, ConflictPolicy, Converter, FrameAdmissionPolicy, GifcastError, OutputTarget,
    PaletteMode, ProcessingConfig, ProcessingOrder, Settings, default_output_path, resolve_output,
};

// ── Settings ─────────────────────────────────────────────────────

#[test]
fn empty_settings_file_uses_defaults() {
    let settings: Settings = serde_json::from_str("{}").unwrap();
    assert_eq!(settings, Settings::default());

    let config = ProcessingConfig::try_from(settings).unwrap();
    assert_eq!(config, ProcessingConfig::default());
    assert_eq!(config.admission, FrameAdmissionPolicy::FixedStride { step: 1 });
    assert_eq!(config.scale_factor, 0.5);
    assert_eq!(config.color, ColorStrategy::Palette(PaletteMode::Adaptive));
    assert_eq!(config.order, ProcessingOrder::Efficiency);
    assert!(config.time_logging);
}

#[test]
fn settings_file_round_trips_through_disk() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("settings.json");
    let settings = Settings {
        frame_step: 3,
        dynamic_framerate: true,
        motion_threshold: 42.0,
        processing_order: ProcessingOrder::Quality,
        ..Settings::default()
    };
    std::fs::write(&path, serde_json::to_string_pretty(&settings).unwrap()).unwrap();

    let loaded = Settings::from_json_file(&path).unwrap();
    assert_eq!(loaded, settings);
    assert!(
        std::fs::read_to_string(&path)
            .unwrap()
            .contains("\"processing_order\": \"quality\"")
    );
}

#[test]
fn malformed_settings_file_is_a_settings_error() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("broken.json");
    std::fs::write(&path, r#"{ "frame_step": "three" }"#).unwrap();

    let error = Settings::from_json_file(&path).unwrap_err();
    assert!(matches!(error, GifcastError::Settings(_)));
    assert!(error.to_string().contains("broken.json"));
}

#[test]
fn missing_settings_file_is_an_io_error() {
    let result = Settings::from_json_file("definitely/missing/settings.json");
    assert!(matches!(result, Err(GifcastError::Io(_))));
}

#[test]
fn negative_threshold_is_rejected() {
    let settings = Settings {
        dynamic_framerate: true,
        motion_threshold: -1.0,
        ..Settings::default()
    };
    assert!(matches!(
        ProcessingConfig::try_from(settings),
        Err(GifcastError::InvalidConfig(_))
    ));
}

// ── Converter construction ───────────────────────────────────────

#[test]
fn converter_rejects_invalid_config() {
    let config = ProcessingConfig::new().with_scale_factor(0.0);
    assert!(matches!(
        Converter::new(config),
        Err(GifcastError::InvalidConfig(_))
    ));
}

#[cfg(feature = "vector-quantization")]
#[test]
fn converter_accepts_vector_quantization() {
    let config = ProcessingConfig::new()
        .with_color(ColorStrategy::VectorQuantize { colors: 16 })
        .with_order(ProcessingOrder::Quality);
    let converter = Converter::new(config).unwrap();
    assert_eq!(converter.orderer().describe(), "quantize -> scale");
}

#[cfg(not(feature = "vector-quantization"))]
#[test]
fn converter_reports_missing_vector_quantization() {
    let config = ProcessingConfig::new().with_color(ColorStrategy::VectorQuantize { colors: 16 });
    assert!(matches!(
        Converter::new(config),
        Err(GifcastError::DependencyUnavailable(_))
    ));
}

// ── Output resolution ────────────────────────────────────────────

#[test]
fn default_output_sits_next_to_the_input() {
    let directory = tempfile::tempdir().unwrap();
    let input = directory.path().join("holiday.mov");
    assert_eq!(default_output_path(&input), directory.path().join("holiday.gif"));
}

#[test]
fn rename_picks_the_first_free_suffix() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("clip.gif");
    std::fs::write(&path, b"").unwrap();

    let first = resolve_output(&path, ConflictPolicy::Rename);
    assert_eq!(first, OutputTarget::path(directory.path().join("clip (1).gif")));

    std::fs::write(directory.path().join("clip (1).gif"), b"").unwrap();
    let second = resolve_output(&path, ConflictPolicy::Rename);
    assert_eq!(second, OutputTarget::path(directory.path().join("clip (2).gif")));
}

#[test]
fn cancel_policy_on_existing_file_cancels() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("clip.gif");
    std::fs::write(&path, b"keep me").unwrap();

    assert!(resolve_output(&path, ConflictPolicy::Cancel).is_cancelled());
    assert_eq!(std::fs::read(&path).unwrap(), b"keep me");
}
