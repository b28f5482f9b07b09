//! Seek planning.
//!
//! Given the frame that was produced last and the frame requested now,
//! [`SeekPlanner::plan`] decides whether the decoder can simply keep going
//! from where it is or has to be repositioned at a random-access point.

use crate::{
    config::{DEFAULT_SEEK_THRESHOLD, MAX_SEEK_THRESHOLD, MIN_SEEK_THRESHOLD},
    error::SourceError,
    index::IndexProvider,
};

/// What to do to reach a requested frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekPlan {
    /// The requested frame is the one produced last; the decoder still holds
    /// it.
    Reuse,
    /// Decode forward from the current demuxer position.
    Continue,
    /// Reposition the demuxer at this random-access point first.
    Seek {
        /// 1-based frame number of the random-access point.
        random_access_point: u32,
    },
}

/// Chooses between continuing and seeking.
///
/// A forward request is decoded through when the target lies within
/// `threshold` frames of its random-access point and of the frame produced
/// last; anything else seeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekPlanner {
    threshold: u32,
}

impl Default for SeekPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_SEEK_THRESHOLD)
    }
}

impl SeekPlanner {
    /// Create a planner. `threshold` is clamped to `[1, 999]`.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.clamp(MIN_SEEK_THRESHOLD, MAX_SEEK_THRESHOLD),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Plan how to reach the 1-based `target`.
    ///
    /// `last_produced` is the frame the decoder produced last, or `None`
    /// when its position is unknown (nothing decoded yet, or the last request
    /// failed), which always forces a seek.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NoRandomAccessPoint`] if a seek is needed and
    /// no random-access point precedes `target`.
    pub fn plan<I>(
        &self,
        index: &I,
        target: u32,
        last_produced: Option<u32>,
    ) -> Result<SeekPlan, SourceError>
    where
        I: IndexProvider + ?Sized,
    {
        match last_produced {
            Some(last) if target == last => return Ok(SeekPlan::Reuse),
            Some(last) if target == last + 1 => return Ok(SeekPlan::Continue),
            _ => {}
        }

        let random_access_point = index
            .nearest_random_access_point(target)
            .ok_or(SourceError::NoRandomAccessPoint {
                frame_number: target,
            })?;

        // Forward decoding reads `target - last` packets; both distances
        // must fit the window.
        match last_produced {
            Some(last)
                if target > last
                    && target - random_access_point <= self.threshold
                    && target - last <= self.threshold =>
            {
                Ok(SeekPlan::Continue)
            }
            _ => Ok(SeekPlan::Seek {
                random_access_point,
            }),
        }
    }
}
