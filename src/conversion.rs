//! Internal utility functions.
//!
//! Helpers for pixel-data copying and timestamp conversion that do not belong
//! in any single public module.

use std::time::Duration;

use ffmpeg_next::{Rational, frame::Video as FfmpegVideoFrame};

use crate::{
    error::SourceError,
    frame::{PixelFormat, VideoFrame},
};

/// Copy every plane of a converted FFmpeg frame into a tightly packed
/// [`VideoFrame`] of `format`.
///
/// FFmpeg pads rows to its alignment; the padding is dropped here.
pub(crate) fn frame_to_planes(
    converted: &FfmpegVideoFrame,
    format: PixelFormat,
    width: u32,
    height: u32,
) -> Result<VideoFrame, SourceError> {
    let layouts = format.plane_layouts(width, height);
    let mut planes = Vec::with_capacity(layouts.len());
    for (index, layout) in layouts.iter().enumerate() {
        let stride = converted.stride(index);
        let row_bytes = layout.row_bytes();
        let data = converted.data(index);
        let rows = layout.height as usize;
        if stride < row_bytes || data.len() < stride * rows.saturating_sub(1) + row_bytes {
            return Err(SourceError::Conversion(format!(
                "Converted plane {index} is smaller than a {width}x{height} {} frame",
                format.name()
            )));
        }

        if stride == row_bytes {
            planes.push(data[..row_bytes * rows].to_vec());
        } else {
            let mut buffer = Vec::with_capacity(row_bytes * rows);
            for row in 0..rows {
                let row_start = row * stride;
                buffer.extend_from_slice(&data[row_start..row_start + row_bytes]);
            }
            planes.push(buffer);
        }
    }
    VideoFrame::from_planes(format, width, height, planes)
}

/// A rational as `f64`, or `None` when the denominator is zero.
pub(crate) fn rational_to_f64(rational: Rational) -> Option<f64> {
    (rational.denominator() != 0)
        .then(|| rational.numerator() as f64 / rational.denominator() as f64)
}

/// Rescale a timestamp from stream time base to seconds.
pub(crate) fn timestamp_to_seconds(timestamp: i64, time_base: (i32, i32)) -> f64 {
    let (numerator, denominator) = time_base;
    timestamp as f64 * numerator as f64 / denominator.max(1) as f64
}

/// Time of a 0-based frame at a fixed frame rate `(numerator, denominator)`.
pub(crate) fn frame_number_to_duration(frame_number: u64, frame_rate: (i32, i32)) -> Duration {
    let (numerator, denominator) = frame_rate;
    if numerator <= 0 || denominator <= 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(frame_number as f64 * denominator as f64 / numerator as f64)
}
