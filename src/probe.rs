//! Startup probing.
//!
//! Before the first request the source decodes from the start of the track
//! until the decoder emits its first usable picture. Two facts fall out of
//! that run and are frozen for the rest of the session:
//!
//! - the decoder delay: how many packets were consumed before anything came
//!   out, and
//! - the first valid frame: pictures below it never appear in a decode run,
//!   so requests for them are answered with a copy of the first picture.
//!
//! [`StartupProber`] is an explicit state machine over [`ProbeState`]:
//! `NotStarted → Probing → Ready | Failed`. There is no transition out of
//! `Ready` or `Failed`.

use crate::{
    delay::DelayTracker,
    engine::{DecodeEngine, DecodeStatus, SeekLanding, SeekRequest},
    error::SourceError,
    frame::VideoFrame,
    index::IndexProvider,
    materialize::Materialize,
};

/// Where a [`StartupProber`] stands.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeState {
    /// No decode attempt yet.
    NotStarted,
    /// Decoding from the start, no usable picture yet.
    Probing {
        /// Decode attempts so far.
        attempts: u32,
        /// Attempts that consumed a packet without producing a picture.
        delay_count: u32,
    },
    /// The first usable picture was produced.
    Ready {
        /// Decoder delay for the session, in frames.
        delay: u32,
        /// 1-based frame number of the first picture.
        first_valid_frame: u32,
        /// The first picture, materialized.
        first_frame: VideoFrame,
    },
    /// The attempt budget ran out or the stream ended first.
    Failed,
}

/// Facts established by a successful probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub delay: u32,
    pub first_valid_frame: u32,
    pub first_frame: VideoFrame,
    /// Decode attempts it took.
    pub attempts: u32,
}

/// Discovers the decoder delay and the first valid frame.
#[derive(Debug, Clone)]
pub struct StartupProber {
    state: ProbeState,
    reported_delay: u32,
    max_attempts: u32,
    /// A picture came out but could not be used. Later empty attempts are
    /// dropped pictures, not priming.
    picture_seen: bool,
}

impl StartupProber {
    /// Create a prober for a track of `frame_count` frames whose decoder
    /// reports `reported_delay`. At most `frame_count + reported_delay`
    /// attempts are made.
    pub fn new(frame_count: u32, reported_delay: u32) -> Self {
        Self {
            state: ProbeState::NotStarted,
            reported_delay,
            max_attempts: frame_count.saturating_add(reported_delay),
            picture_seen: false,
        }
    }

    pub fn state(&self) -> &ProbeState {
        &self.state
    }

    /// Returns `true` once the prober reached `Ready` or `Failed`.
    pub fn is_finished(&self) -> bool {
        matches!(self.state, ProbeState::Ready { .. } | ProbeState::Failed)
    }

    /// Feed the outcome of one decode attempt.
    ///
    /// `materialize` is only called for [`DecodeStatus::Picture`]. A picture
    /// that fails to materialize is discarded and probing continues. Returns
    /// [`is_finished`](Self::is_finished).
    pub fn observe<F>(&mut self, status: DecodeStatus, materialize: F) -> bool
    where
        F: FnOnce() -> Result<VideoFrame, SourceError>,
    {
        let (attempts, delay_count) = match self.state {
            ProbeState::NotStarted => (1, 0),
            ProbeState::Probing {
                attempts,
                delay_count,
            } => (attempts + 1, delay_count),
            ProbeState::Ready { .. } | ProbeState::Failed => return true,
        };

        self.state = match status {
            DecodeStatus::Picture => {
                let first_valid_frame = DelayTracker::first_valid_frame(attempts, delay_count);
                self.picture_seen = true;
                match materialize() {
                    Ok(first_frame) => ProbeState::Ready {
                        delay: delay_count,
                        first_valid_frame,
                        first_frame,
                    },
                    Err(error) => {
                        log::warn!("Discarding unusable picture at attempt {attempts}: {error}");
                        self.after_attempt(attempts, delay_count)
                    }
                }
            }
            DecodeStatus::NeedMoreInput if self.picture_seen => {
                self.after_attempt(attempts, delay_count)
            }
            DecodeStatus::NeedMoreInput => self.after_attempt(attempts, delay_count + 1),
            DecodeStatus::EndOfStream => ProbeState::Failed,
        };
        self.is_finished()
    }

    fn after_attempt(&self, attempts: u32, delay_count: u32) -> ProbeState {
        if attempts >= self.max_attempts {
            ProbeState::Failed
        } else {
            ProbeState::Probing {
                attempts,
                delay_count,
            }
        }
    }

    /// Run the probe to completion against `engine`.
    ///
    /// For tracks of more than one frame the engine is first positioned at
    /// the random-access point of frame 1.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Setup`] if the engine cannot be positioned at
    /// frame 1 or no usable picture was found, and propagates engine errors.
    pub fn run<E, M, I>(
        mut self,
        engine: &mut E,
        materializer: &mut M,
        index: &I,
    ) -> Result<ProbeReport, SourceError>
    where
        E: DecodeEngine,
        M: Materialize<E::Picture>,
        I: IndexProvider + ?Sized,
    {
        if index.frame_count() > 1 {
            match index.nearest_random_access_point(1) {
                Some(random_access_point) => {
                    let request = SeekRequest::for_frame(index, random_access_point)?;
                    if engine.seek(&request)? == SeekLanding::Overshot {
                        return Err(SourceError::Setup(format!(
                            "could not position the demuxer at frame {random_access_point}"
                        )));
                    }
                }
                None => log::debug!("Frame 1 is not a random access point, probing from the start"),
            }
        }

        let mut attempts = 0;
        while !self.is_finished() {
            let status = engine.read_and_decode()?;
            attempts += 1;
            self.observe(status, || materializer.materialize(engine.picture()));
        }

        match self.state {
            ProbeState::Ready {
                delay,
                first_valid_frame,
                first_frame,
            } => {
                log::info!(
                    "Decoder delay {delay} (reported {}), first valid frame {first_valid_frame}",
                    self.reported_delay
                );
                Ok(ProbeReport {
                    delay,
                    first_valid_frame,
                    first_frame,
                    attempts,
                })
            }
            _ => Err(SourceError::Setup(
                "no decodable picture found while probing the track".to_string(),
            )),
        }
    }
}
