//! Ordinal readiness tiers shared by the video and mesh tracks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How much playable data is available at the playhead.
///
/// Variants are ordered, so `min`/`max` and comparisons follow the tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum ReadyState {
    /// Nothing is available for the current frame.
    #[default]
    Nothing,
    /// The current frame is available but nothing after it.
    CurrentData,
    /// The current frame and at least a little lookahead are available.
    FutureData,
    /// Enough is available to play through without stalling.
    EnoughData,
}

impl ReadyState {
    /// Combine two tracks: the pair is only as ready as its weakest member.
    #[inline]
    pub fn combine(self, other: Self) -> Self {
        self.min(other)
    }

    /// True if playback can proceed without immediately stalling.
    #[inline]
    pub fn can_play(self) -> bool {
        self >= Self::FutureData
    }

    /// Numeric level matching the media element convention (0, 2, 3, 4).
    pub fn level(self) -> u8 {
        match self {
            Self::Nothing => 0,
            Self::CurrentData => 2,
            Self::FutureData => 3,
            Self::EnoughData => 4,
        }
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Nothing => "HAVE_NOTHING",
            Self::CurrentData => "HAVE_CURRENT_DATA",
            Self::FutureData => "HAVE_FUTURE_DATA",
            Self::EnoughData => "HAVE_ENOUGH_DATA",
        };
        f.write_str(name)
    }
}
