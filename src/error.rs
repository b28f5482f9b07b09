//! Error types for the `framesource` crate.
//!
//! This module defines [`SourceError`], the unified error type returned by all
//! fallible operations in the crate. Variants fall into a small taxonomy (see
//! [`ErrorKind`]) that decides how the caller should react: setup errors abort
//! construction, decode errors end the stream, out-of-range requests are simply
//! rejected.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use serde_json::Error as JsonError;
use thiserror::Error;

/// The unified error type for all `framesource` operations.
///
/// Every public method that can fail returns `Result<T, SourceError>`.
/// Variants carry enough context to diagnose the problem without needing
/// additional logging at the call site.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    /// The media file could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::VideoSource::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// The configured stream index does not name a video stream.
    #[error("Stream {stream_index} is not a video stream (file has {stream_count} streams)")]
    VideoTrackOutOfRange {
        /// Requested container stream index.
        stream_index: usize,
        /// Number of streams in the container.
        stream_count: usize,
    },

    /// Scanning the container to build the frame index failed.
    #[error("Failed to construct index: {0}")]
    IndexBuild(String),

    /// The precomputed index entries could not be pushed into the demuxer.
    #[error("Failed to import index entries for video: {0}")]
    IndexImport(String),

    /// Any other failure while preparing the source (buffer allocation,
    /// decoder setup, startup probing).
    #[error("Setup failed: {0}")]
    Setup(String),

    /// The decoded pixel format has no conversion path to the output format.
    #[error("Pixel format {0} is not supported")]
    UnsupportedFormat(String),

    /// No random-access point precedes the requested frame.
    #[error("No random access point found at or before frame {frame_number}")]
    NoRandomAccessPoint {
        /// The 1-based frame number that was being located.
        frame_number: u32,
    },

    /// Demuxing or decoding failed mid-stream.
    #[error("Failed to decode video frame: {0}")]
    Decode(String),

    /// A decoded picture could not be converted to the output frame. The
    /// stream itself is still usable.
    #[error("Failed to convert picture: {0}")]
    Conversion(String),

    /// The requested frame index is outside `[0, total_frames)`.
    #[error("Frame {frame_number} is out of range (video has {total_frames} frames)")]
    FrameOutOfRange {
        /// The 0-based frame index that was requested.
        frame_number: i64,
        /// The total number of frames in the video.
        total_frames: u32,
    },

    /// A host option had an unusable value or an unknown key.
    #[error("Invalid option `{key}`: {reason}")]
    InvalidOption {
        /// Option name as supplied by the host.
        key: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate during frame conversion.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// The on-disk index cache could not be parsed or written.
    #[error("Index cache error: {0}")]
    IndexCache(#[from] JsonError),
}

/// Coarse classification of a [`SourceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Construction-time failure; the source was never usable.
    Setup,
    /// No conversion path exists for the decoded pixel format.
    UnsupportedFormat,
    /// A seek target could not be located in the index.
    Index,
    /// The stream failed mid-decode and is now terminal.
    Decode,
    /// The request was rejected before touching the stream.
    OutOfRange,
    /// Plumbing errors (I/O, FFmpeg, serialization, options).
    Other,
}

impl SourceError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SourceError::FileOpen { .. }
            | SourceError::NoVideoStream
            | SourceError::VideoTrackOutOfRange { .. }
            | SourceError::IndexBuild(_)
            | SourceError::IndexImport(_)
            | SourceError::Setup(_) => ErrorKind::Setup,
            SourceError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            SourceError::NoRandomAccessPoint { .. } => ErrorKind::Index,
            SourceError::Decode(_) => ErrorKind::Decode,
            SourceError::FrameOutOfRange { .. } => ErrorKind::OutOfRange,
            _ => ErrorKind::Other,
        }
    }

    /// Returns `true` for errors that abort source construction.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Setup | ErrorKind::UnsupportedFormat
        )
    }
}

impl From<FfmpegError> for SourceError {
    fn from(error: FfmpegError) -> Self {
        SourceError::FfmpegError(error.to_string())
    }
}
