//! Source configuration.
//!
//! [`SourceOptions`] is a builder that carries every recognised option of a
//! [`VideoSource`](crate::VideoSource): track selection, decoder threading,
//! index caching, seek behaviour and the output format. Values outside their
//! legal range are clamped rather than rejected, so a host can forward user
//! input verbatim.
//!
//! # Example
//!
//! ```no_run
//! use framesource::{PixelFormat, SeekMode, SourceOptions};
//!
//! let options = SourceOptions::new()
//!     .with_seek_threshold(30)
//!     .with_seek_mode(SeekMode::Unsafe)
//!     .with_format(PixelFormat::Rgb8);
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::PathBuf,
    sync::Arc,
};

use ffmpeg_next::software::scaling::Flags as ScalingFlags;

use crate::{
    error::SourceError,
    frame::PixelFormat,
    progress::{NoOpProgress, ProgressCallback},
};

/// Default forward-decode window, in frames.
pub const DEFAULT_SEEK_THRESHOLD: u32 = 10;
/// Smallest accepted forward-decode window.
pub const MIN_SEEK_THRESHOLD: u32 = 1;
/// Largest accepted forward-decode window.
pub const MAX_SEEK_THRESHOLD: u32 = 999;

/// How hard the source tries to recover when a decode pass misses its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeekMode {
    /// Step back to earlier random-access points a few times, then fail.
    #[default]
    Normal,
    /// Fail on the first miss without stepping back.
    Unsafe,
    /// Step back like [`Normal`](SeekMode::Normal) and skip packets the
    /// decoder rejects instead of treating them as fatal.
    Aggressive,
}

impl SeekMode {
    /// Map the host's numeric level (0–2) to a mode, clamping out-of-range
    /// values.
    pub fn from_level(level: i64) -> Self {
        match level.clamp(0, 2) {
            0 => SeekMode::Normal,
            1 => SeekMode::Unsafe,
            _ => SeekMode::Aggressive,
        }
    }

    /// The numeric level of this mode.
    pub fn level(self) -> u8 {
        match self {
            SeekMode::Normal => 0,
            SeekMode::Unsafe => 1,
            SeekMode::Aggressive => 2,
        }
    }

    /// Number of step-back retries allowed after a missed target.
    pub(crate) fn max_retries(self) -> u32 {
        match self {
            SeekMode::Unsafe => 0,
            SeekMode::Normal | SeekMode::Aggressive => 3,
        }
    }

    /// Whether packets rejected by the decoder are skipped.
    pub(crate) fn tolerates_decode_errors(self) -> bool {
        self == SeekMode::Aggressive
    }
}

/// Quality of the pixel-format conversion step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScalingQuality {
    /// Fast bilinear. This is the default.
    #[default]
    FastBilinear,
    /// Regular bilinear.
    Bilinear,
    /// Bicubic.
    Bicubic,
    /// Lanczos.
    Lanczos,
}

impl ScalingQuality {
    /// Map to the corresponding FFmpeg scaler flags.
    pub(crate) fn to_scaling_flags(self) -> ScalingFlags {
        match self {
            ScalingQuality::FastBilinear => ScalingFlags::FAST_BILINEAR,
            ScalingQuality::Bilinear => ScalingFlags::BILINEAR,
            ScalingQuality::Bicubic => ScalingFlags::BICUBIC,
            ScalingQuality::Lanczos => ScalingFlags::LANCZOS,
        }
    }
}

/// Which media the source is prepared to expose.
///
/// Only video is decoded. `VideoAndAudio` additionally records the best audio
/// track's metadata so a host can pair the source with its own audio path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaCapability {
    /// Video only. This is the default.
    #[default]
    VideoOnly,
    /// Video plus audio-track metadata.
    VideoAndAudio,
}

/// Options for opening a [`VideoSource`](crate::VideoSource).
#[derive(Clone)]
pub struct SourceOptions {
    /// Container stream index to use. `None` picks the best video stream.
    pub(crate) stream_index: Option<usize>,
    /// Decoder thread count; 0 lets FFmpeg decide.
    pub(crate) threads: usize,
    /// Reuse (and write) an on-disk index next to the source.
    pub(crate) cache_index: bool,
    /// Explicit location of the index cache file.
    pub(crate) index_cache_path: Option<PathBuf>,
    pub(crate) seek_mode: SeekMode,
    /// Forward-decode window, always within [1, 999].
    pub(crate) seek_threshold: u32,
    /// Let output geometry follow each decoded picture.
    pub(crate) variable_dimensions: bool,
    /// Forced output pixel format. `None` derives it from the source.
    pub(crate) format: Option<PixelFormat>,
    pub(crate) scaling: ScalingQuality,
    pub(crate) capability: MediaCapability,
    /// Progress callback used while the index is built.
    pub(crate) progress: Arc<dyn ProgressCallback>,
}

impl Debug for SourceOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SourceOptions")
            .field("stream_index", &self.stream_index)
            .field("threads", &self.threads)
            .field("cache_index", &self.cache_index)
            .field("index_cache_path", &self.index_cache_path)
            .field("seek_mode", &self.seek_mode)
            .field("seek_threshold", &self.seek_threshold)
            .field("variable_dimensions", &self.variable_dimensions)
            .field("format", &self.format)
            .field("scaling", &self.scaling)
            .field("capability", &self.capability)
            .finish_non_exhaustive()
    }
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceOptions {
    /// Create options with default settings.
    ///
    /// Defaults: best video stream, automatic threading, index caching on,
    /// normal seek mode, seek threshold 10, fixed geometry, output format
    /// derived from the source.
    pub fn new() -> Self {
        Self {
            stream_index: None,
            threads: 0,
            cache_index: true,
            index_cache_path: None,
            seek_mode: SeekMode::Normal,
            seek_threshold: DEFAULT_SEEK_THRESHOLD,
            variable_dimensions: false,
            format: None,
            scaling: ScalingQuality::FastBilinear,
            capability: MediaCapability::VideoOnly,
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Build options from the host's key/value option map.
    ///
    /// Recognised keys: `stream_index`, `threads`, `cache_index`,
    /// `seek_mode`, `seek_threshold`, `variable`, `format`. Numeric values are
    /// clamped like the builder methods do; a negative `stream_index` means
    /// automatic selection.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidOption`] for unknown keys, values that
    /// are not integers, or an unknown `format` name.
    ///
    /// # Example
    ///
    /// ```
    /// use framesource::SourceOptions;
    ///
    /// let options = SourceOptions::from_pairs([("seek_threshold", "2000"), ("variable", "1")])?;
    /// assert_eq!(options.seek_threshold(), 999);
    /// assert!(options.variable_dimensions());
    /// # Ok::<(), framesource::SourceError>(())
    /// ```
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, SourceError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut options = Self::new();
        for (key, value) in pairs {
            match key {
                "stream_index" => {
                    let index = parse_integer(key, value)?;
                    options.stream_index = usize::try_from(index).ok();
                }
                "threads" => {
                    let threads = parse_integer(key, value)?;
                    options = options.with_threads(usize::try_from(threads).unwrap_or(0));
                }
                "cache_index" => {
                    options = options.with_cache_index(parse_integer(key, value)? != 0);
                }
                "seek_mode" => {
                    options = options.with_seek_mode(SeekMode::from_level(parse_integer(key, value)?));
                }
                "seek_threshold" => {
                    let threshold = parse_integer(key, value)?
                        .clamp(MIN_SEEK_THRESHOLD as i64, MAX_SEEK_THRESHOLD as i64);
                    options = options.with_seek_threshold(threshold as u32);
                }
                "variable" => {
                    options = options.with_variable_dimensions(parse_integer(key, value)?.clamp(0, 1) == 1);
                }
                "format" => {
                    let format =
                        PixelFormat::from_name(value).ok_or_else(|| SourceError::InvalidOption {
                            key: key.to_string(),
                            reason: format!("unknown pixel format `{value}`"),
                        })?;
                    options = options.with_format(format);
                }
                _ => {
                    return Err(SourceError::InvalidOption {
                        key: key.to_string(),
                        reason: "unrecognised option".to_string(),
                    });
                }
            }
        }
        Ok(options)
    }

    /// Select a specific container stream. It must be a video stream.
    #[must_use]
    pub fn with_stream_index(mut self, stream_index: usize) -> Self {
        self.stream_index = Some(stream_index);
        self
    }

    /// Set the decoder thread count. 0 lets FFmpeg decide.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Enable or disable the on-disk index cache.
    #[must_use]
    pub fn with_cache_index(mut self, cache_index: bool) -> Self {
        self.cache_index = cache_index;
        self
    }

    /// Store the index cache at an explicit path instead of next to the
    /// source file.
    #[must_use]
    pub fn with_index_cache_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.index_cache_path = Some(path.into());
        self
    }

    /// Set the recovery strategy for missed seeks.
    #[must_use]
    pub fn with_seek_mode(mut self, mode: SeekMode) -> Self {
        self.seek_mode = mode;
        self
    }

    /// Set the forward-decode window. Clamped to `[1, 999]`.
    #[must_use]
    pub fn with_seek_threshold(mut self, threshold: u32) -> Self {
        self.seek_threshold = threshold.clamp(MIN_SEEK_THRESHOLD, MAX_SEEK_THRESHOLD);
        self
    }

    /// Let output geometry vary per frame instead of compositing every picture
    /// onto a fixed-size background.
    #[must_use]
    pub fn with_variable_dimensions(mut self, variable: bool) -> Self {
        self.variable_dimensions = variable;
        self
    }

    /// Force the output pixel format.
    #[must_use]
    pub fn with_format(mut self, format: PixelFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Set the conversion quality.
    #[must_use]
    pub fn with_scaling(mut self, quality: ScalingQuality) -> Self {
        self.scaling = quality;
        self
    }

    /// Choose which media the source exposes.
    #[must_use]
    pub fn with_capability(mut self, capability: MediaCapability) -> Self {
        self.capability = capability;
        self
    }

    /// Attach a progress callback for index construction.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// The configured stream index, if any.
    pub fn stream_index(&self) -> Option<usize> {
        self.stream_index
    }

    /// The configured decoder thread count.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Whether the index cache is enabled.
    pub fn cache_index(&self) -> bool {
        self.cache_index
    }

    /// The configured seek mode.
    pub fn seek_mode(&self) -> SeekMode {
        self.seek_mode
    }

    /// The forward-decode window.
    pub fn seek_threshold(&self) -> u32 {
        self.seek_threshold
    }

    /// Whether output geometry may vary per frame.
    pub fn variable_dimensions(&self) -> bool {
        self.variable_dimensions
    }

    /// The forced output format, if any.
    pub fn format(&self) -> Option<PixelFormat> {
        self.format
    }

    /// The conversion quality.
    pub fn scaling(&self) -> ScalingQuality {
        self.scaling
    }

    /// The configured media capability.
    pub fn capability(&self) -> MediaCapability {
        self.capability
    }
}

fn parse_integer(key: &str, value: &str) -> Result<i64, SourceError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|error| SourceError::InvalidOption {
            key: key.to_string(),
            reason: format!("expected an integer, got `{value}` ({error})"),
        })
}
