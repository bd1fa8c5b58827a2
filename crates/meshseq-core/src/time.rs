//! Frame indexing against a nominal frame rate.
//!
//! Mesh frames and video frames share one zero-based index space. The
//! index of a video frame is derived from its media time by rounding to
//! the nearest frame at the nominal rate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Zero-based ordinal identifying one mesh/video pairing in a sequence.
pub type FrameIndex = u64;

/// Frame rate as a rational number (e.g., 30000/1001 for 29.97 fps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    /// Numerator (e.g., 30000)
    pub numerator: u32,
    /// Denominator (e.g., 1001)
    pub denominator: u32,
}

impl FrameRate {
    /// Create a new frame rate.
    #[inline]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Convert to frames per second as f64.
    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Duration of a single frame in seconds.
    #[inline]
    pub fn frame_duration_secs(self) -> f64 {
        self.denominator as f64 / self.numerator as f64
    }

    /// Frame index displayed at `media_time` seconds.
    ///
    /// Rounds to the nearest frame. Negative times map to frame 0.
    pub fn frame_at(self, media_time: f64) -> FrameIndex {
        let frame = (media_time * self.to_fps_f64()).round();
        if frame.is_finite() && frame > 0.0 {
            frame as FrameIndex
        } else {
            0
        }
    }

    /// Media time in seconds at which `frame` is presented.
    #[inline]
    pub fn media_time_of(self, frame: FrameIndex) -> f64 {
        frame as f64 * self.frame_duration_secs()
    }

    /// True if both parts are non-zero.
    pub fn is_valid(self) -> bool {
        self.numerator != 0 && self.denominator != 0
    }

    /// Common frame rates
    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_25: Self = Self::new(25, 1);
    pub const FPS_29_97: Self = Self::new(30000, 1001);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_60: Self = Self::new(60, 1);
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_30
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fps = self.to_fps_f64();
        if (fps - fps.round()).abs() < 0.001 {
            write!(f, "{} fps", fps.round() as u32)
        } else {
            write!(f, "{:.3} fps", fps)
        }
    }
}
