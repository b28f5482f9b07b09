//! Error handling integration tests.
//!
//! These tests verify that meaningful errors are returned for various
//! failure conditions, and that the error taxonomy classifies them.

use std::path::Path;

use framesource::{ErrorKind, SourceError, VideoSource};

#[test]
fn open_nonexistent_file() {
    let result = VideoSource::open("this_file_does_not_exist.mp4");
    assert!(result.is_err());

    let error = result.unwrap_err();
    assert!(error.is_setup_error());
    let error_message = error.to_string();
    assert!(
        error_message.contains("Failed to open media file"),
        "Error message should mention file open failure: {error_message}",
    );
}

#[test]
fn open_invalid_file() {
    // Create a temporary file with garbage content.
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let invalid_file_path = temporary_directory.path().join("invalid.mp4");
    std::fs::write(&invalid_file_path, b"this is not a media file")
        .expect("Failed to write invalid file");

    let result = VideoSource::open(&invalid_file_path);
    assert!(result.is_err(), "Expected error for invalid media file");
    assert!(result.unwrap_err().is_setup_error());
}

#[test]
fn frame_out_of_range() {
    let path = "tests/fixtures/sample_video.mp4";
    if !Path::new(path).exists() {
        return;
    }

    let mut source = VideoSource::open(path).expect("Failed to open test video");
    let result = source.get_frame(999_999);
    assert!(result.is_err());

    let error_message = result.unwrap_err().to_string();
    assert!(
        error_message.contains("out of range"),
        "Error message should mention out of range: {error_message}",
    );
}

#[test]
fn audio_stream_is_not_a_video_track() {
    let path = "tests/fixtures/sample_video.mp4";
    if !Path::new(path).exists() {
        return;
    }

    // The fixture carries video on stream 0 and audio on stream 1.
    let options = framesource::SourceOptions::new()
        .with_stream_index(1)
        .with_cache_index(false);
    let error = VideoSource::open_with_options(path, options).unwrap_err();
    assert!(matches!(
        error,
        SourceError::VideoTrackOutOfRange { stream_index: 1, .. }
    ));
}

#[test]
fn error_kinds() {
    let cases = [
        (SourceError::NoVideoStream, ErrorKind::Setup),
        (SourceError::IndexBuild("empty".to_string()), ErrorKind::Setup),
        (SourceError::IndexImport("refused".to_string()), ErrorKind::Setup),
        (SourceError::Setup("probe".to_string()), ErrorKind::Setup),
        (
            SourceError::UnsupportedFormat("Pal8".to_string()),
            ErrorKind::UnsupportedFormat,
        ),
        (
            SourceError::NoRandomAccessPoint { frame_number: 3 },
            ErrorKind::Index,
        ),
        (SourceError::Decode("eof".to_string()), ErrorKind::Decode),
        (SourceError::Conversion("short plane".to_string()), ErrorKind::Other),
        (
            SourceError::FrameOutOfRange {
                frame_number: -1,
                total_frames: 10,
            },
            ErrorKind::OutOfRange,
        ),
        (
            SourceError::InvalidOption {
                key: "x".to_string(),
                reason: "unknown".to_string(),
            },
            ErrorKind::Other,
        ),
    ];
    for (error, kind) in cases {
        assert_eq!(error.kind(), kind, "{error}");
    }
}

#[test]
fn setup_errors_include_unsupported_formats() {
    assert!(SourceError::UnsupportedFormat("Pal8".to_string()).is_setup_error());
    assert!(
        SourceError::VideoTrackOutOfRange {
            stream_index: 4,
            stream_count: 2
        }
        .is_setup_error()
    );
    assert!(!SourceError::Decode("broken".to_string()).is_setup_error());
    assert!(
        !SourceError::NoRandomAccessPoint { frame_number: 1 }.is_setup_error()
    );
}

#[test]
fn error_conversions() {
    let io: SourceError = std::io::Error::other("disk").into();
    assert!(matches!(io, SourceError::IoError(_)));
    assert_eq!(io.kind(), ErrorKind::Other);

    let json: SourceError = serde_json::from_str::<serde_json::Value>("{")
        .unwrap_err()
        .into();
    assert!(matches!(json, SourceError::IndexCache(_)));

    let ffmpeg: SourceError = ffmpeg_next::Error::Eof.into();
    assert!(matches!(ffmpeg, SourceError::FfmpegError(_)));
}

#[test]
fn error_messages_carry_context() {
    let error = SourceError::FrameOutOfRange {
        frame_number: 12,
        total_frames: 10,
    };
    assert_eq!(
        error.to_string(),
        "Frame 12 is out of range (video has 10 frames)"
    );

    let error = SourceError::NoRandomAccessPoint { frame_number: 7 };
    assert!(error.to_string().contains("frame 7"));
}
