//! The demux/decode engine seam.
//!
//! [`DecodeEngine`] is everything the seek pipeline needs from a demuxer plus
//! decoder pair: read-and-decode one step, reposition, and report the
//! decoder's own idea of its delay. [`FfmpegEngine`](crate::FfmpegEngine) is
//! the production implementation; tests drive the pipeline with scripted
//! engines.

use crate::{
    error::SourceError,
    index::{AddressingMode, IndexProvider, NativeIndexRecord},
};

/// Outcome of one [`DecodeEngine::read_and_decode`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    /// A picture was produced and is available through
    /// [`DecodeEngine::picture`].
    Picture,
    /// A packet was consumed but the decoder produced nothing yet.
    NeedMoreInput,
    /// Input is exhausted and the decoder is fully drained.
    EndOfStream,
}

/// Where a seek left the demuxer relative to the requested random-access
/// point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekLanding {
    /// The next packet read is the random-access point, or the landing
    /// could not be checked.
    Exact,
    /// The demuxer came to rest after the random-access point, so decoding
    /// from here would mislabel every frame.
    Overshot,
}

/// Where a seek lands, in the units of the index's addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekTarget {
    /// Byte offset into the container.
    Byte(i64),
    /// Decode timestamp in the stream time base.
    Timestamp(i64),
    /// 0-based frame number.
    Frame(i64),
}

/// A request to reposition the engine at a random-access point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekRequest {
    /// 1-based frame number of the random-access point.
    pub frame: u32,
    pub target: SeekTarget,
}

impl SeekRequest {
    /// Build the request for `frame` from the index.
    ///
    /// Byte addressing falls back to the timestamp, and the timestamp to the
    /// frame number, when the entry lacks the preferred value.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NoRandomAccessPoint`] if the index has no entry
    /// for `frame`.
    pub fn for_frame<I>(index: &I, frame: u32) -> Result<Self, SourceError>
    where
        I: IndexProvider + ?Sized,
    {
        let entry = index
            .entry(frame)
            .ok_or(SourceError::NoRandomAccessPoint {
                frame_number: frame,
            })?;
        let by_frame = SeekTarget::Frame(i64::from(frame) - 1);
        let by_timestamp = entry.timestamp.map(SeekTarget::Timestamp);
        let target = match index.addressing() {
            AddressingMode::ByteOffset => entry
                .byte_position
                .map(SeekTarget::Byte)
                .or(by_timestamp)
                .unwrap_or(by_frame),
            AddressingMode::Timestamp => by_timestamp.unwrap_or(by_frame),
            AddressingMode::FrameNumber => by_frame,
        };
        Ok(Self { frame, target })
    }
}

/// A demuxer and decoder for exactly one video track.
pub trait DecodeEngine {
    /// The decoder's native picture type.
    type Picture;

    /// Feed at most one packet of the track to the decoder and try to
    /// receive one picture.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Decode`] if demuxing or decoding fails.
    fn read_and_decode(&mut self) -> Result<DecodeStatus, SourceError>;

    /// The picture produced by the last call that returned
    /// [`DecodeStatus::Picture`].
    fn picture(&self) -> &Self::Picture;

    /// Reposition at a random-access point and flush the decoder.
    ///
    /// Packets ahead of the random-access point are skipped, so after an
    /// [`SeekLanding::Exact`] landing the next attempt feeds that packet.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Decode`] if the demuxer rejects the seek even
    /// after falling back to the closest match.
    fn seek(&mut self, request: &SeekRequest) -> Result<SeekLanding, SourceError>;

    /// Delay the decoder reports for itself, in frames.
    fn reported_delay(&self) -> u32;

    /// Push precomputed index records into the demuxer's own index.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::IndexImport`] if the demuxer refuses them.
    fn import_index(&mut self, records: &[NativeIndexRecord]) -> Result<(), SourceError>;
}
