//! Sequence length discovery.
//!
//! Mesh sequences do not announce their length. Until a fetch fails the
//! bound is a large sentinel; the first failure for frame `F` narrows it to
//! `F`. An explicit length disables discovery.

use meshseq_core::{FrameIndex, SequenceLength};

/// Upper bound (exclusive) on valid frame indices.
#[derive(Debug, Clone, Copy)]
pub struct SequenceBound {
    length: SequenceLength,
    max_frames: FrameIndex,
}

impl SequenceBound {
    pub fn new(length: SequenceLength) -> Self {
        Self {
            length,
            max_frames: length.initial_bound(),
        }
    }

    /// Current exclusive bound.
    #[inline]
    pub fn max_frames(&self) -> FrameIndex {
        self.max_frames
    }

    /// True once a failure has revealed the end, or the length was given.
    pub fn is_known(&self) -> bool {
        match self.length {
            SequenceLength::Fixed(_) => true,
            SequenceLength::Discover => self.max_frames < self.length.initial_bound(),
        }
    }

    /// Record a failed fetch for `frame`. Returns `true` if the bound narrowed.
    pub fn on_fetch_failed(&mut self, frame: FrameIndex) -> bool {
        if !self.length.allows_discovery() || frame >= self.max_frames {
            return false;
        }
        tracing::info!("sequence end discovered: {} frames", frame);
        self.max_frames = frame;
        true
    }

    /// Restore the configured starting bound (clip change).
    pub fn reset(&mut self) {
        self.max_frames = self.length.initial_bound();
    }
}
