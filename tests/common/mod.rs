//! Scripted in-memory decode engine shared by the integration tests.
//!
//! `ScriptedEngine` behaves like a decoder with a fixed reordering delay:
//! after a seek to frame `r`, the first `delay` packets produce nothing and
//! every later packet releases the next frame in decode order. Once the
//! packets run out the buffered frames are drained one per call, so after a
//! seek close to the end they come out sooner than the delay suggests. Pictures are
//! just frame numbers, and `StampMaterializer` turns them into tiny gray
//! frames whose samples carry that number.

#![allow(dead_code)]

use std::collections::HashSet;

use framesource::{
    DecodeEngine, DecodeStatus, FrameIndex, FrameSource, IndexEntry, Materialize,
    NativeIndexRecord, OutputDescriptor, PixelFormat, SeekLanding, SeekMode, SeekPlanner,
    SeekRequest, SourceError, VideoFrame,
};

pub const STAMP_WIDTH: u32 = 4;
pub const STAMP_HEIGHT: u32 = 2;

pub type ScriptedSource = FrameSource<ScriptedEngine, StampMaterializer, FrameIndex>;

/// A decoded picture: the 1-based frame number it shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StampedPicture {
    pub frame: u32,
}

#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    frame_count: u32,
    delay: u32,
    reported_delay: u32,
    /// Next packet to read, 1-based.
    position: u32,
    /// Packets fed since the last seek.
    fed: u32,
    /// Next frame the decoder releases.
    next_output: u32,
    /// Random-access point of the last seek.
    started_at: Option<u32>,
    picture: StampedPicture,
    failing_packets: HashSet<u32>,
    /// `(seek origin, frame)`; `None` drops the frame whatever the origin.
    dropped_pictures: HashSet<(Option<u32>, u32)>,
    /// Random-access points the demuxer lands one packet past.
    overshooting_seeks: HashSet<u32>,
    reject_import: bool,
    pub seeks: Vec<SeekRequest>,
    pub reads: u32,
    pub imported_records: usize,
}

impl ScriptedEngine {
    pub fn new(frame_count: u32, delay: u32) -> Self {
        Self {
            frame_count,
            delay,
            reported_delay: delay,
            position: 1,
            fed: 0,
            next_output: 1,
            started_at: None,
            picture: StampedPicture::default(),
            failing_packets: HashSet::new(),
            dropped_pictures: HashSet::new(),
            overshooting_seeks: HashSet::new(),
            reject_import: false,
            seeks: Vec::new(),
            reads: 0,
            imported_records: 0,
        }
    }

    /// Let the decoder claim a delay different from its real one.
    pub fn with_reported_delay(mut self, reported_delay: u32) -> Self {
        self.reported_delay = reported_delay;
        self
    }

    /// Reading packet `frame` fails with a decode error.
    pub fn with_failing_packet(mut self, frame: u32) -> Self {
        self.failing_packets.insert(frame);
        self
    }

    /// `frame` never comes out of the decoder.
    pub fn with_dropped_picture(mut self, frame: u32) -> Self {
        self.dropped_pictures.insert((None, frame));
        self
    }

    /// `frame` never comes out when decoding started at `random_access_point`.
    pub fn with_dropped_picture_from(mut self, random_access_point: u32, frame: u32) -> Self {
        self.dropped_pictures
            .insert((Some(random_access_point), frame));
        self
    }

    /// Seeking to `random_access_point` leaves the demuxer one packet later.
    pub fn with_overshooting_seek(mut self, random_access_point: u32) -> Self {
        self.overshooting_seeks.insert(random_access_point);
        self
    }

    pub fn rejecting_index_import(mut self) -> Self {
        self.reject_import = true;
        self
    }

    fn release(&mut self) -> DecodeStatus {
        let frame = self.next_output;
        self.next_output += 1;
        if self.dropped_pictures.contains(&(None, frame))
            || self.dropped_pictures.contains(&(self.started_at, frame))
        {
            return DecodeStatus::NeedMoreInput;
        }
        self.picture = StampedPicture { frame };
        DecodeStatus::Picture
    }
}

impl DecodeEngine for ScriptedEngine {
    type Picture = StampedPicture;

    fn read_and_decode(&mut self) -> Result<DecodeStatus, SourceError> {
        self.reads += 1;
        if self.position <= self.frame_count {
            let packet = self.position;
            self.position += 1;
            if self.failing_packets.contains(&packet) {
                return Err(SourceError::Decode(format!("corrupt packet {packet}")));
            }
            self.fed += 1;
            if self.fed <= self.delay {
                return Ok(DecodeStatus::NeedMoreInput);
            }
            return Ok(self.release());
        }
        if self.next_output >= self.position {
            return Ok(DecodeStatus::EndOfStream);
        }
        Ok(self.release())
    }

    fn picture(&self) -> &StampedPicture {
        &self.picture
    }

    fn seek(&mut self, request: &SeekRequest) -> Result<SeekLanding, SourceError> {
        self.seeks.push(*request);
        let overshot = self.overshooting_seeks.contains(&request.frame);
        let landed_at = if overshot {
            request.frame + 1
        } else {
            request.frame
        };
        self.position = landed_at;
        self.next_output = landed_at;
        self.fed = 0;
        self.started_at = Some(request.frame);
        Ok(if overshot {
            SeekLanding::Overshot
        } else {
            SeekLanding::Exact
        })
    }

    fn reported_delay(&self) -> u32 {
        self.reported_delay
    }

    fn import_index(&mut self, records: &[NativeIndexRecord]) -> Result<(), SourceError> {
        if self.reject_import {
            return Err(SourceError::IndexImport("demuxer has no index".to_string()));
        }
        self.imported_records = records.len();
        Ok(())
    }
}

/// Materializes a [`StampedPicture`] as a 4x2 gray frame filled with the
/// frame number.
#[derive(Debug, Clone, Default)]
pub struct StampMaterializer {
    failing_frames: HashSet<u32>,
    pub calls: u32,
}

impl StampMaterializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Materializing `frame` fails.
    pub fn with_failing_frame(mut self, frame: u32) -> Self {
        self.failing_frames.insert(frame);
        self
    }
}

impl Materialize<StampedPicture> for StampMaterializer {
    fn materialize(&mut self, picture: &StampedPicture) -> Result<VideoFrame, SourceError> {
        self.calls += 1;
        if self.failing_frames.contains(&picture.frame) {
            return Err(SourceError::Conversion(format!(
                "picture {} has no usable planes",
                picture.frame
            )));
        }
        let samples = vec![stamp_value(picture.frame); (STAMP_WIDTH * STAMP_HEIGHT) as usize];
        let mut frame =
            VideoFrame::from_planes(PixelFormat::Gray8, STAMP_WIDTH, STAMP_HEIGHT, vec![samples])?;
        frame.properties_mut().duration = (1, 25);
        frame.properties_mut().picture_type = 'P';
        Ok(frame)
    }

    fn output(&self) -> OutputDescriptor {
        OutputDescriptor {
            format: PixelFormat::Gray8,
            width: STAMP_WIDTH,
            height: STAMP_HEIGHT,
            variable_dimensions: false,
        }
    }
}

/// Sample value a stamped frame is filled with.
pub fn stamp_value(frame: u32) -> u8 {
    (frame % 251) as u8
}

/// The 1-based frame number a stamped output frame shows.
pub fn stamp_of(frame: &VideoFrame) -> u32 {
    u32::from(frame.planes()[0][0])
}

/// An index of `frame_count` frames with a random-access point every `gop`
/// frames, starting at frame 1.
pub fn gop_index(frame_count: u32, gop: u32) -> FrameIndex {
    index_with_random_access_points(frame_count, |frame| (frame - 1) % gop == 0)
}

pub fn index_with_random_access_points<F>(frame_count: u32, is_random_access: F) -> FrameIndex
where
    F: Fn(u32) -> bool,
{
    let entries = (1..=frame_count)
        .map(|frame| IndexEntry {
            byte_position: Some(i64::from(frame) * 1_000),
            timestamp: Some(i64::from(frame - 1)),
            presentation_timestamp: Some(i64::from(frame - 1)),
            size: 1_000,
            random_access: is_random_access(frame),
        })
        .collect();
    FrameIndex::new(entries)
}

/// A source over a scripted engine with the default planner.
pub fn scripted_source(
    engine: ScriptedEngine,
    index: FrameIndex,
    seek_mode: SeekMode,
) -> Result<ScriptedSource, SourceError> {
    FrameSource::new(
        engine,
        StampMaterializer::new(),
        index,
        SeekPlanner::default(),
        seek_mode,
    )
}
