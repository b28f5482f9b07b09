//! SourceOptions, SeekMode and host option map tests.

use std::sync::Arc;

use framesource::{
    MediaCapability, PixelFormat, ProgressCallback, ProgressInfo, ScalingQuality, SeekMode,
    SourceError, SourceOptions,
};

// ── SourceOptions builder ────────────────────────────────────────

#[test]
fn options_defaults() {
    let options = SourceOptions::new();
    assert_eq!(options.stream_index(), None);
    assert_eq!(options.threads(), 0);
    assert!(options.cache_index());
    assert_eq!(options.seek_mode(), SeekMode::Normal);
    assert_eq!(options.seek_threshold(), 10);
    assert!(!options.variable_dimensions());
    assert_eq!(options.format(), None);
    assert_eq!(options.scaling(), ScalingQuality::FastBilinear);
    assert_eq!(options.capability(), MediaCapability::VideoOnly);
}

#[test]
fn options_builder_sets_values() {
    let options = SourceOptions::new()
        .with_stream_index(3)
        .with_threads(4)
        .with_cache_index(false)
        .with_seek_mode(SeekMode::Aggressive)
        .with_seek_threshold(50)
        .with_variable_dimensions(true)
        .with_format(PixelFormat::Yuv420p10)
        .with_scaling(ScalingQuality::Lanczos)
        .with_capability(MediaCapability::VideoAndAudio);

    assert_eq!(options.stream_index(), Some(3));
    assert_eq!(options.threads(), 4);
    assert!(!options.cache_index());
    assert_eq!(options.seek_mode(), SeekMode::Aggressive);
    assert_eq!(options.seek_threshold(), 50);
    assert!(options.variable_dimensions());
    assert_eq!(options.format(), Some(PixelFormat::Yuv420p10));
    assert_eq!(options.scaling(), ScalingQuality::Lanczos);
    assert_eq!(options.capability(), MediaCapability::VideoAndAudio);
}

#[test]
fn seek_threshold_is_clamped() {
    assert_eq!(SourceOptions::new().with_seek_threshold(0).seek_threshold(), 1);
    assert_eq!(SourceOptions::new().with_seek_threshold(1_000).seek_threshold(), 999);
}

#[test]
fn options_debug_omits_callback() {
    struct Silent;
    impl ProgressCallback for Silent {
        fn on_progress(&self, _info: &ProgressInfo) {}
    }

    let options = SourceOptions::new().with_progress(Arc::new(Silent));
    let debug = format!("{options:?}");
    assert!(debug.contains("SourceOptions"));
    assert!(debug.contains("seek_threshold: 10"));
    assert!(!debug.contains("progress"));
}

// ── SeekMode ─────────────────────────────────────────────────────

#[test]
fn seek_mode_levels_are_clamped() {
    assert_eq!(SeekMode::from_level(-4), SeekMode::Normal);
    assert_eq!(SeekMode::from_level(0), SeekMode::Normal);
    assert_eq!(SeekMode::from_level(1), SeekMode::Unsafe);
    assert_eq!(SeekMode::from_level(2), SeekMode::Aggressive);
    assert_eq!(SeekMode::from_level(42), SeekMode::Aggressive);
    assert_eq!(SeekMode::Unsafe.level(), 1);
}

// ── Host option map ──────────────────────────────────────────────

#[test]
fn from_pairs_reads_every_key() {
    let options = SourceOptions::from_pairs([
        ("stream_index", "1"),
        ("threads", "8"),
        ("cache_index", "0"),
        ("seek_mode", "1"),
        ("seek_threshold", "25"),
        ("variable", "1"),
        ("format", "YUV444P16"),
    ])
    .expect("Failed to parse options");

    assert_eq!(options.stream_index(), Some(1));
    assert_eq!(options.threads(), 8);
    assert!(!options.cache_index());
    assert_eq!(options.seek_mode(), SeekMode::Unsafe);
    assert_eq!(options.seek_threshold(), 25);
    assert!(options.variable_dimensions());
    assert_eq!(options.format(), Some(PixelFormat::Yuv444p16));
}

#[test]
fn from_pairs_clamps_numbers() {
    let options = SourceOptions::from_pairs([
        ("stream_index", "-1"),
        ("threads", "-3"),
        ("seek_mode", "9"),
        ("seek_threshold", "-20"),
        ("variable", "7"),
    ])
    .expect("Failed to parse options");

    assert_eq!(options.stream_index(), None);
    assert_eq!(options.threads(), 0);
    assert_eq!(options.seek_mode(), SeekMode::Aggressive);
    assert_eq!(options.seek_threshold(), 1);
    assert!(options.variable_dimensions());
}

#[test]
fn from_pairs_rejects_bad_input() {
    let unknown = SourceOptions::from_pairs([("colour", "1")]).unwrap_err();
    assert!(matches!(unknown, SourceError::InvalidOption { ref key, .. } if key == "colour"));

    let not_a_number = SourceOptions::from_pairs([("threads", "many")]).unwrap_err();
    assert!(not_a_number.to_string().contains("threads"));

    let bad_format = SourceOptions::from_pairs([("format", "cmyk")]).unwrap_err();
    assert!(bad_format.to_string().contains("cmyk"));
}

// ── PixelFormat names ────────────────────────────────────────────

#[test]
fn pixel_format_names_round_trip() {
    let formats = [
        PixelFormat::Gray8,
        PixelFormat::Gray16,
        PixelFormat::Yuv420p8,
        PixelFormat::Yuv422p8,
        PixelFormat::Yuv444p8,
        PixelFormat::Yuv410p8,
        PixelFormat::Yuv411p8,
        PixelFormat::Yuv420p10,
        PixelFormat::Yuv422p10,
        PixelFormat::Yuv444p10,
        PixelFormat::Yuv420p16,
        PixelFormat::Yuv422p16,
        PixelFormat::Yuv444p16,
        PixelFormat::Rgb8,
        PixelFormat::Rgba8,
    ];
    for format in formats {
        assert_eq!(PixelFormat::from_name(format.name()), Some(format));
    }
    assert_eq!(PixelFormat::from_name("rgb24"), Some(PixelFormat::Rgb8));
    assert_eq!(PixelFormat::from_name(" yuv420p "), Some(PixelFormat::Yuv420p8));
    assert_eq!(PixelFormat::from_name("nv12"), None);
}
