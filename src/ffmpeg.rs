//! FFmpeg log level configuration.
//!
//! FFmpeg has its own internal logging system, separate from the Rust
//! [`log`](https://crates.io/crates/log) crate. By default it prints warnings
//! and errors to stderr, which is noisy when a source seeks a lot (demuxers
//! and decoders complain about references missing after a seek). This module
//! wraps FFmpeg's log-level API so callers can tune that output without
//! importing `ffmpeg-next` directly.
//!
//! # Example
//!
//! ```no_run
//! use framesource::{FfmpegLogLevel, VideoSource};
//!
//! // Silence all FFmpeg output except fatal errors.
//! framesource::set_ffmpeg_log_level(FfmpegLogLevel::Fatal);
//!
//! // Or follow whatever the `log` facade is configured for.
//! framesource::sync_ffmpeg_log_level();
//!
//! let source = VideoSource::open("input.mp4")?;
//! # Ok::<(), framesource::SourceError>(())
//! ```

use ffmpeg_next::util::log::Level;
use log::LevelFilter;

/// FFmpeg internal log verbosity level.
///
/// Maps directly to FFmpeg's `AV_LOG_*` constants. Setting a level causes
/// FFmpeg to suppress all messages below that severity.
///
/// # Ordering (most verbose → most quiet)
///
/// `Trace` > `Debug` > `Verbose` > `Info` > `Warning` > `Error` > `Fatal` > `Panic` > `Quiet`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// Print no output at all.
    Quiet,
    /// Only conditions the process cannot survive.
    Panic,
    /// Unrecoverable errors.
    Fatal,
    /// Recoverable errors.
    Error,
    /// Warnings (FFmpeg's default).
    Warning,
    /// Informational messages.
    Info,
    /// Verbose informational messages.
    Verbose,
    /// Debugging messages.
    Debug,
    /// Extremely verbose tracing output.
    Trace,
}

impl FfmpegLogLevel {
    fn to_ffmpeg_level(self) -> Level {
        match self {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Panic => Level::Panic,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Verbose => Level::Verbose,
            FfmpegLogLevel::Debug => Level::Debug,
            FfmpegLogLevel::Trace => Level::Trace,
        }
    }

    fn from_ffmpeg_level(level: Level) -> Self {
        match level {
            Level::Quiet => FfmpegLogLevel::Quiet,
            Level::Panic => FfmpegLogLevel::Panic,
            Level::Fatal => FfmpegLogLevel::Fatal,
            Level::Error => FfmpegLogLevel::Error,
            Level::Warning => FfmpegLogLevel::Warning,
            Level::Info => FfmpegLogLevel::Info,
            Level::Verbose => FfmpegLogLevel::Verbose,
            Level::Debug => FfmpegLogLevel::Debug,
            Level::Trace => FfmpegLogLevel::Trace,
        }
    }

    /// The FFmpeg level matching a `log` level filter.
    ///
    /// `Off` silences FFmpeg entirely; `Error` still lets fatal conditions
    /// through.
    pub fn from_level_filter(filter: LevelFilter) -> Self {
        match filter {
            LevelFilter::Off => FfmpegLogLevel::Quiet,
            LevelFilter::Error => FfmpegLogLevel::Error,
            LevelFilter::Warn => FfmpegLogLevel::Warning,
            LevelFilter::Info => FfmpegLogLevel::Info,
            LevelFilter::Debug => FfmpegLogLevel::Debug,
            LevelFilter::Trace => FfmpegLogLevel::Trace,
        }
    }
}

/// Set the FFmpeg internal log verbosity level.
///
/// This controls what FFmpeg prints to stderr. It does **not** affect
/// Rust-side `log` crate output.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}

/// Get the current FFmpeg internal log verbosity level.
///
/// Returns `None` if the current level does not map to a known variant.
pub fn get_ffmpeg_log_level() -> Option<FfmpegLogLevel> {
    ffmpeg_next::util::log::get_level()
        .ok()
        .map(FfmpegLogLevel::from_ffmpeg_level)
}

/// Align FFmpeg's verbosity with [`log::max_level`].
///
/// Call after installing a logger. Returns the level that was applied.
pub fn sync_ffmpeg_log_level() -> FfmpegLogLevel {
    let level = FfmpegLogLevel::from_level_filter(log::max_level());
    set_ffmpeg_log_level(level);
    level
}
