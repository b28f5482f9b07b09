//! Source metadata types.
//!
//! This module defines the metadata returned by
//! [`VideoSource::metadata`](crate::VideoSource::metadata). It is gathered
//! once when the source is opened and cached for its lifetime.

use std::time::Duration;

/// Metadata for an opened source.
///
/// # Example
///
/// ```no_run
/// use framesource::VideoSource;
///
/// let source = VideoSource::open("input.mp4")?;
/// let metadata = source.metadata();
/// println!("{} frames of {}", metadata.video.frame_count, metadata.format);
/// # Ok::<(), framesource::SourceError>(())
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct SourceMetadata {
    /// The selected video track.
    pub video: VideoMetadata,
    /// The best audio track, recorded only with
    /// [`MediaCapability::VideoAndAudio`](crate::MediaCapability::VideoAndAudio).
    pub audio: Option<AudioMetadata>,
    /// Container duration.
    pub duration: Duration,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`, `"matroska,webm"`).
    pub format: String,
    /// Size of the source file in bytes.
    pub file_size: u64,
}

/// Metadata for the selected video track.
#[derive(Debug, Clone)]
#[must_use]
pub struct VideoMetadata {
    /// Container stream index of the track.
    pub stream_index: usize,
    /// Coded width in pixels.
    pub width: u32,
    /// Coded height in pixels.
    pub height: u32,
    /// Nominal frame rate as `(numerator, denominator)`.
    pub frame_rate: (i32, i32),
    /// Nominal frame rate as a float.
    pub frames_per_second: f64,
    /// Exact number of frames, from the index.
    pub frame_count: u32,
    /// Number of random-access points in the index.
    pub random_access_points: usize,
    /// Codec name (e.g. `"h264"`, `"hevc"`, `"mpeg2video"`).
    pub codec: String,
    /// Native pixel format of the decoder, if known.
    pub pixel_format_name: Option<String>,
}

/// Metadata for an audio track.
#[derive(Debug, Clone)]
#[must_use]
pub struct AudioMetadata {
    /// Container stream index of the track.
    pub stream_index: usize,
    /// Sample rate in hertz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channels: u16,
    /// Codec name (e.g. `"aac"`, `"ac3"`).
    pub codec: String,
    /// Bit rate in bits per second.
    pub bit_rate: u64,
}
