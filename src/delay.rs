//! Decoder delay bookkeeping.
//!
//! Decoders with frame reordering or frame threading hold back pictures: the
//! picture for frame `n` only comes out once `n + D` packets have been fed
//! in. [`DelayTracker`] turns that fixed delay `D` into the arithmetic the
//! seek pipeline needs, and [`DecodeCursor`] follows one decode run.

/// Maps decode attempts to logical frames for a fixed decoder delay.
///
/// Decode attempts are counted from the random-access point the decoder was
/// last positioned at: the attempt that consumes packet `p` (1-based, decode
/// order) yields frame `p - D`. Once the packets run out the decoder is
/// drained and releases its buffered frames back to back, whatever `D` is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DelayTracker {
    delay: u32,
}

impl DelayTracker {
    pub fn new(delay: u32) -> Self {
        Self { delay }
    }

    /// The decoder delay `D`, in frames.
    pub fn delay(&self) -> u32 {
        self.delay
    }

    /// The frame yielded by feeding attempt `attempt`, if any.
    pub fn frame_for_attempt(&self, attempt: u32) -> Option<u32> {
        attempt.checked_sub(self.delay).filter(|&frame| frame > 0)
    }

    /// Logical frame of the first picture seen during startup.
    ///
    /// `attempt` is the attempt that produced it and `primed` the number of
    /// attempts that consumed a packet without producing anything. The
    /// primed count is the delay the session decodes with, so the first
    /// picture is labelled with it too.
    pub fn first_valid_frame(attempt: u32, primed: u32) -> u32 {
        attempt.saturating_sub(primed).max(1)
    }

    /// Account for one decode attempt made at `cursor`.
    ///
    /// Returns the frame whose output slot the attempt was, or `None` while
    /// the decoder is still priming after a seek. Attempts up to
    /// `packet_count` feed a packet; later ones drain the decoder.
    pub fn advance(&self, cursor: &mut DecodeCursor, packet_count: u32) -> Option<u32> {
        let attempt = cursor.next_attempt;
        cursor.next_attempt += 1;
        let frame = if attempt <= packet_count {
            self.frame_for_attempt(attempt)
                .filter(|&frame| frame >= cursor.next_frame)?
        } else {
            cursor.next_frame
        };
        cursor.next_frame = frame + 1;
        Some(frame)
    }
}

/// Position of a decode run: the next attempt and the frame the next output
/// slot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeCursor {
    pub next_attempt: u32,
    pub next_frame: u32,
}

impl DecodeCursor {
    /// The cursor right after a seek to `random_access_point`.
    pub fn at(random_access_point: u32) -> Self {
        Self {
            next_attempt: random_access_point,
            next_frame: random_access_point,
        }
    }
}
