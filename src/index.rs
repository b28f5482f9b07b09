//! Random-access index of a video track.
//!
//! The index maps every 1-based frame number (decode order) to an
//! [`IndexEntry`]: where the frame's packet lives in the container, its
//! timestamps, and whether decoding can start there. The seek pipeline only
//! ever reads it through the [`IndexProvider`] trait, so any index source can
//! be plugged in; [`FrameIndex`] is the concrete in-memory implementation
//! produced by the packet scan in [`crate::indexer`].

use serde::{Deserialize, Serialize};

/// How seek targets are expressed to the demuxer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressingMode {
    /// Seek by byte offset into the container.
    ByteOffset,
    /// Seek by decode timestamp in the stream time base.
    Timestamp,
    /// Seek by 0-based frame number.
    FrameNumber,
}

impl AddressingMode {
    /// Pick the addressing mode for a container.
    ///
    /// Byte seeking is used for formats with timestamp discontinuities (MPEG
    /// transport and program streams) as long as the demuxer supports it and
    /// packet positions are known. Otherwise timestamps are used when every
    /// packet carries one, and frame numbers as the last resort.
    pub fn choose(
        timestamp_discontinuities: bool,
        byte_seek_supported: bool,
        positions_known: bool,
        timestamps_known: bool,
    ) -> Self {
        if timestamp_discontinuities && byte_seek_supported && positions_known {
            AddressingMode::ByteOffset
        } else if timestamps_known {
            AddressingMode::Timestamp
        } else {
            AddressingMode::FrameNumber
        }
    }
}

/// One frame's location and random-access flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Byte offset of the frame's packet, if the demuxer reported one.
    pub byte_position: Option<i64>,
    /// Decode timestamp in the stream time base.
    pub timestamp: Option<i64>,
    /// Presentation timestamp in the stream time base.
    pub presentation_timestamp: Option<i64>,
    /// Packet size in bytes.
    pub size: u32,
    /// Decoding can start at this frame.
    pub random_access: bool,
}

/// A record pushed into the demuxer's native index at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeIndexRecord {
    pub byte_position: i64,
    pub timestamp: i64,
    pub size: i32,
    /// Entries since the previous random-access point (0 on one).
    pub min_distance: i32,
    /// [`NativeIndexRecord::KEYFRAME`] or 0.
    pub flags: i32,
}

impl NativeIndexRecord {
    /// Flag marking a random-access record.
    pub const KEYFRAME: i32 = ffmpeg_sys_next::AVINDEX_KEYFRAME as i32;

    /// Returns `true` if the record is a random-access point.
    pub fn is_keyframe(&self) -> bool {
        self.flags & Self::KEYFRAME != 0
    }
}

/// Read-only access to a track's random-access index.
///
/// Frame numbers are 1-based and in decode order.
pub trait IndexProvider {
    /// Number of frames in the track.
    fn frame_count(&self) -> u32;

    /// The entry for `frame`, or `None` outside `[1, frame_count]`.
    fn entry(&self, frame: u32) -> Option<&IndexEntry>;

    /// The closest random-access point at or before `frame`.
    fn nearest_random_access_point(&self, frame: u32) -> Option<u32>;

    /// How seek targets should be expressed to the demuxer.
    fn addressing(&self) -> AddressingMode;

    /// Byte offset of `frame`'s packet, if known.
    fn position_of(&self, frame: u32) -> Option<i64> {
        self.entry(frame).and_then(|entry| entry.byte_position)
    }

    /// The random-access point strictly before `random_access_point`.
    fn previous_random_access_point(&self, random_access_point: u32) -> Option<u32> {
        random_access_point
            .checked_sub(1)
            .filter(|&frame| frame > 0)
            .and_then(|frame| self.nearest_random_access_point(frame))
    }

    /// Records for the one-shot import into the demuxer's own index.
    ///
    /// Entries without both a byte position and a timestamp are skipped.
    fn native_records(&self) -> Vec<NativeIndexRecord> {
        let mut records = Vec::new();
        let mut distance = 0i32;
        for frame in 1..=self.frame_count() {
            let Some(entry) = self.entry(frame) else {
                continue;
            };
            distance = if entry.random_access {
                0
            } else {
                distance.saturating_add(1)
            };
            if let (Some(byte_position), Some(timestamp)) = (entry.byte_position, entry.timestamp)
            {
                records.push(NativeIndexRecord {
                    byte_position,
                    timestamp,
                    size: i32::try_from(entry.size).unwrap_or(i32::MAX),
                    min_distance: distance,
                    flags: if entry.random_access {
                        NativeIndexRecord::KEYFRAME
                    } else {
                        0
                    },
                });
            }
        }
        records
    }
}

/// In-memory random-access index of one video track.
///
/// Besides the entries it remembers the track-level facts gathered while
/// indexing: the container stream index, the largest coded picture size and
/// the nominal frame rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameIndex {
    stream_index: usize,
    addressing: AddressingMode,
    entries: Vec<IndexEntry>,
    max_width: u32,
    max_height: u32,
    frame_rate: (i32, i32),
    time_base: (i32, i32),
    #[serde(skip)]
    random_access_points: Vec<u32>,
}

impl FrameIndex {
    /// Create an index over `entries` (frame 1 first).
    ///
    /// Defaults: stream 0, frame-number addressing, 0×0 geometry, 25 fps,
    /// time base 1/25.
    pub fn new(entries: Vec<IndexEntry>) -> Self {
        let mut index = Self {
            stream_index: 0,
            addressing: AddressingMode::FrameNumber,
            entries,
            max_width: 0,
            max_height: 0,
            frame_rate: (25, 1),
            time_base: (1, 25),
            random_access_points: Vec::new(),
        };
        index.rebuild_lookup();
        index
    }

    #[must_use]
    pub fn with_stream_index(mut self, stream_index: usize) -> Self {
        self.stream_index = stream_index;
        self
    }

    #[must_use]
    pub fn with_addressing(mut self, addressing: AddressingMode) -> Self {
        self.addressing = addressing;
        self
    }

    /// Record the largest picture size of the track.
    #[must_use]
    pub fn with_max_dimensions(mut self, width: u32, height: u32) -> Self {
        self.max_width = width;
        self.max_height = height;
        self
    }

    /// Record the nominal frame rate as `(numerator, denominator)`.
    #[must_use]
    pub fn with_frame_rate(mut self, numerator: i32, denominator: i32) -> Self {
        self.frame_rate = (numerator, denominator);
        self
    }

    /// Record the stream time base as `(numerator, denominator)`.
    #[must_use]
    pub fn with_time_base(mut self, numerator: i32, denominator: i32) -> Self {
        self.time_base = (numerator, denominator);
        self
    }

    /// Recompute the random-access lookup table from the entries.
    ///
    /// Needed after deserializing, since the table is not persisted.
    pub(crate) fn rebuild_lookup(&mut self) {
        self.random_access_points = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.random_access)
            .filter_map(|(position, _)| u32::try_from(position + 1).ok())
            .collect();
    }

    pub fn stream_index(&self) -> usize {
        self.stream_index
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// All random-access points, ascending.
    pub fn random_access_points(&self) -> &[u32] {
        &self.random_access_points
    }

    /// Largest picture size as `(width, height)`.
    pub fn max_dimensions(&self) -> (u32, u32) {
        (self.max_width, self.max_height)
    }

    /// Nominal frame rate as `(numerator, denominator)`.
    pub fn frame_rate(&self) -> (i32, i32) {
        self.frame_rate
    }

    /// Stream time base as `(numerator, denominator)`.
    pub fn time_base(&self) -> (i32, i32) {
        self.time_base
    }
}

impl IndexProvider for FrameIndex {
    fn frame_count(&self) -> u32 {
        u32::try_from(self.entries.len()).unwrap_or(u32::MAX)
    }

    fn entry(&self, frame: u32) -> Option<&IndexEntry> {
        let position = usize::try_from(frame).ok()?.checked_sub(1)?;
        self.entries.get(position)
    }

    fn nearest_random_access_point(&self, frame: u32) -> Option<u32> {
        if frame == 0 || frame > self.frame_count() {
            return None;
        }
        let after = self.random_access_points.partition_point(|&rap| rap <= frame);
        after
            .checked_sub(1)
            .map(|position| self.random_access_points[position])
    }

    fn addressing(&self) -> AddressingMode {
        self.addressing
    }
}
