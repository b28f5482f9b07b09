//! Progress reporting for index construction.
//!
//! Building the frame index means reading every packet of the container
//! once, which can take a while for long files. This module provides
//! [`ProgressCallback`] for observing that scan and [`ProgressInfo`] for the
//! snapshots it receives. Frame requests themselves never report progress.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framesource::{ProgressCallback, ProgressInfo, SourceOptions, VideoSource};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("indexing: {pct:.1}%");
//!         }
//!     }
//! }
//!
//! let options = SourceOptions::new().with_progress(Arc::new(PrintProgress));
//! let source = VideoSource::open_with_options("input.mkv", options)?;
//! # Ok::<(), framesource::SourceError>(())
//! ```

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// A snapshot of index-construction progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Bytes of the container consumed so far.
    pub current: u64,
    /// Total container size in bytes, if known.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Video packets indexed so far.
    pub frames_indexed: u32,
    /// Wall-clock time elapsed since the scan started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
}

/// Trait for receiving progress updates while the index is built.
///
/// Progress callbacks are **infallible**: they observe but cannot halt the
/// scan.
pub trait ProgressCallback: Send + Sync {
    /// Called at regular intervals during index construction.
    fn on_progress(&self, info: &ProgressInfo);
}

/// A no-op implementation that discards all progress notifications.
///
/// This is the default when no callback is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Number of indexed packets between two reports.
const REPORT_INTERVAL: u32 = 256;

/// Internal helper that tracks progress timing and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: Option<u64>,
    current: u64,
    frames_indexed: u32,
    start_time: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, total: Option<u64>) -> Self {
        Self {
            callback,
            total,
            current: 0,
            frames_indexed: 0,
            start_time: Instant::now(),
        }
    }

    /// Record one indexed packet ending at byte `position`.
    pub(crate) fn advance(&mut self, position: Option<u64>) {
        self.frames_indexed += 1;
        if let Some(position) = position {
            self.current = self.current.max(position);
        }
        if self.frames_indexed % REPORT_INTERVAL == 0 {
            self.report();
        }
    }

    /// Unconditionally emit a final report with the scan marked complete.
    pub(crate) fn finish(&mut self) {
        if let Some(total) = self.total {
            self.current = total;
        }
        self.report();
    }

    fn report(&self) {
        let elapsed = self.start_time.elapsed();

        let percentage = self
            .total
            .filter(|&t| t > 0)
            .map(|t| (self.current.min(t) as f32 / t as f32) * 100.0);

        let estimated_remaining = match (self.total, self.current) {
            (Some(total), current) if current > 0 => {
                let remaining = total.saturating_sub(current) as f64;
                Some(elapsed.mul_f64(remaining / current as f64))
            }
            _ => None,
        };

        let info = ProgressInfo {
            current: self.current,
            total: self.total,
            percentage,
            frames_indexed: self.frames_indexed,
            elapsed,
            estimated_remaining,
        };

        self.callback.on_progress(&info);
    }
}
