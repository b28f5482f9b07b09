//! The frame-accurate source.
//!
//! [`FrameSource`] ties the pieces together: it validates a request, asks the
//! [`SeekPlanner`] whether to continue or seek, drives the
//! [`DecodeEngine`] until the delay-compensated target comes out, and hands
//! the picture to the [`Materialize`] step. It owns the decode state: the last
//! produced frame, the frozen decoder delay and the terminal failure latch.

use crate::{
    config::SeekMode,
    delay::{DecodeCursor, DelayTracker},
    engine::{DecodeEngine, DecodeStatus, SeekLanding, SeekRequest},
    error::{ErrorKind, SourceError},
    frame::VideoFrame,
    index::IndexProvider,
    materialize::{Materialize, OutputDescriptor},
    planner::{SeekPlan, SeekPlanner},
    probe::StartupProber,
};

/// Counters describing the work a source has done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceStatistics {
    /// Calls to [`FrameSource::get_frame`], including rejected ones.
    pub requests: u64,
    /// Seeks issued after startup.
    pub seeks: u64,
    /// Engine decode attempts after startup.
    pub decode_attempts: u64,
    /// Requests answered from the first-valid-frame cache.
    pub cached_frames: u64,
}

/// Random-access frame source over a decode engine, a materializer and an
/// index.
///
/// Requests are served one at a time: every mutating call takes `&mut self`.
pub struct FrameSource<E, M, I>
where
    E: DecodeEngine,
    M: Materialize<E::Picture>,
    I: IndexProvider,
{
    engine: E,
    materializer: M,
    index: I,
    planner: SeekPlanner,
    delay: DelayTracker,
    seek_mode: SeekMode,
    first_valid_frame: u32,
    first_frame: VideoFrame,
    blank_frame: VideoFrame,
    /// `None` forces the next request to seek.
    last_produced: Option<u32>,
    /// Where the current decode run stands.
    cursor: DecodeCursor,
    failed: bool,
    statistics: SourceStatistics,
}

impl<E, M, I> FrameSource<E, M, I>
where
    E: DecodeEngine,
    M: Materialize<E::Picture>,
    I: IndexProvider,
{
    /// Prepare a source: import the index into the engine and run the
    /// startup probe.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::IndexImport`] if the engine refuses the index
    /// records and [`SourceError::Setup`] if the probe finds no usable
    /// picture.
    pub fn new(
        mut engine: E,
        mut materializer: M,
        index: I,
        planner: SeekPlanner,
        seek_mode: SeekMode,
    ) -> Result<Self, SourceError> {
        let frame_count = index.frame_count();
        if frame_count == 0 {
            return Err(SourceError::Setup("the index has no frames".to_string()));
        }

        let records = index.native_records();
        if !records.is_empty() {
            engine.import_index(&records)?;
        }

        let reported_delay = engine.reported_delay();
        let report = StartupProber::new(frame_count, reported_delay).run(
            &mut engine,
            &mut materializer,
            &index,
        )?;
        let blank_frame = report.first_frame.black_like();

        log::debug!(
            "Source ready: {frame_count} frames, seek threshold {}, {:?} seek mode",
            planner.threshold(),
            seek_mode
        );

        Ok(Self {
            engine,
            materializer,
            index,
            planner,
            delay: DelayTracker::new(report.delay),
            seek_mode,
            first_valid_frame: report.first_valid_frame,
            first_frame: report.first_frame,
            blank_frame,
            last_produced: None,
            cursor: DecodeCursor::default(),
            failed: false,
            statistics: SourceStatistics::default(),
        })
    }

    /// Return the frame at 0-based index `n`.
    ///
    /// Frames before the first valid frame, and every frame of a one-frame
    /// track, are copies of the first picture. Once a decode error has
    /// occurred, every later request returns a black frame.
    ///
    /// # Errors
    ///
    /// - [`SourceError::FrameOutOfRange`] if `n` is negative or not below
    ///   [`frame_count`](Self::frame_count). The engine is not touched.
    /// - [`SourceError::NoRandomAccessPoint`] if no random-access point
    ///   precedes the frame.
    /// - [`SourceError::Decode`] if decoding fails; the source then stays
    ///   in the failed state.
    pub fn get_frame(&mut self, n: i64) -> Result<VideoFrame, SourceError> {
        self.statistics.requests += 1;
        let frame_count = self.index.frame_count();
        let frame = u32::try_from(n)
            .ok()
            .filter(|&n| n < frame_count)
            .map(|n| n + 1)
            .ok_or(SourceError::FrameOutOfRange {
                frame_number: n,
                total_frames: frame_count,
            })?;

        if frame < self.first_valid_frame || frame_count == 1 {
            self.last_produced = None;
            self.statistics.cached_frames += 1;
            return Ok(self.first_frame.clone());
        }

        if self.failed {
            return Ok(self.blank_frame.clone());
        }

        match self.produce(frame) {
            Ok(output) => Ok(output),
            Err(error) => {
                self.last_produced = None;
                if error.kind() == ErrorKind::Decode {
                    log::warn!("Frame {frame} failed, source is now unusable: {error}");
                    self.failed = true;
                } else {
                    log::debug!("Frame {frame} failed: {error}");
                }
                Err(error)
            }
        }
    }

    fn produce(&mut self, frame: u32) -> Result<VideoFrame, SourceError> {
        let plan = self.planner.plan(&self.index, frame, self.last_produced)?;
        log::trace!("Frame {frame}: {plan:?}");

        let mut random_access_point = match plan {
            SeekPlan::Reuse => return self.materializer.materialize(self.engine.picture()),
            SeekPlan::Continue => None,
            SeekPlan::Seek {
                random_access_point,
            } => Some(random_access_point),
        };

        let mut retries = 0;
        loop {
            let landed = match random_access_point {
                Some(random_access_point) => self.seek_to(random_access_point)?,
                None => true,
            };
            if landed && self.decode_until(frame)? {
                break;
            }

            self.last_produced = None;
            if retries >= self.seek_mode.max_retries() {
                return Err(SourceError::Decode(format!(
                    "frame {frame} was not produced after {retries} retries"
                )));
            }
            retries += 1;
            random_access_point = match random_access_point {
                None => self.index.nearest_random_access_point(frame),
                Some(current) => self.index.previous_random_access_point(current),
            };
            let Some(next) = random_access_point else {
                return Err(SourceError::Decode(format!(
                    "frame {frame} was not produced and no earlier random access point exists"
                )));
            };
            log::debug!("Frame {frame} missed, retrying from random access point {next}");
        }

        let output = self.materializer.materialize(self.engine.picture())?;
        self.last_produced = Some(frame);
        Ok(output)
    }

    /// Seek to `random_access_point`. Returns `false` if the engine came to
    /// rest past it.
    fn seek_to(&mut self, random_access_point: u32) -> Result<bool, SourceError> {
        let request = SeekRequest::for_frame(&self.index, random_access_point)?;
        let landing = self.engine.seek(&request)?;
        self.cursor = DecodeCursor::at(random_access_point);
        self.statistics.seeks += 1;
        if landing == SeekLanding::Overshot {
            log::debug!("Seek to random access point {random_access_point} overshot");
            return Ok(false);
        }
        Ok(true)
    }

    /// Decode until the output slot of `frame`. Returns `true` if that slot
    /// held a picture.
    fn decode_until(&mut self, frame: u32) -> Result<bool, SourceError> {
        let packet_count = self.index.frame_count();
        loop {
            let status = self.engine.read_and_decode()?;
            self.statistics.decode_attempts += 1;
            let slot = self.delay.advance(&mut self.cursor, packet_count);
            if status == DecodeStatus::EndOfStream {
                return Ok(false);
            }
            match slot {
                Some(slot) if slot == frame => return Ok(status == DecodeStatus::Picture),
                Some(slot) if slot > frame => return Ok(false),
                _ => {}
            }
        }
    }

    /// Number of frames in the track.
    pub fn frame_count(&self) -> u32 {
        self.index.frame_count()
    }

    /// Format and geometry of returned frames.
    pub fn output(&self) -> OutputDescriptor {
        self.materializer.output()
    }

    /// Decoder delay established at startup, in frames.
    pub fn delay(&self) -> u32 {
        self.delay.delay()
    }

    /// 1-based number of the first frame a decode run can produce.
    pub fn first_valid_frame(&self) -> u32 {
        self.first_valid_frame
    }

    /// 1-based number of the frame produced last, if the decoder position is
    /// known.
    pub fn last_produced(&self) -> Option<u32> {
        self.last_produced
    }

    /// Returns `true` once a decode error has made the source terminal.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn seek_mode(&self) -> SeekMode {
        self.seek_mode
    }

    pub fn planner(&self) -> &SeekPlanner {
        &self.planner
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn statistics(&self) -> SourceStatistics {
        self.statistics
    }
}
