//! Playback clock interface and playhead tracking.
//!
//! The clock source is the video: it presents frames, reports its own
//! buffering state, and notifies once per displayed frame. The engine only
//! ever pauses and resumes it.

use meshseq_core::{FrameIndex, FrameRate, ReadyState};

/// Delivered once per displayed video frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameNotification {
    /// Host timestamp of the presentation, in milliseconds.
    pub timestamp: f64,
    /// Media time of the presented frame, in seconds.
    pub media_time: f64,
}

impl FrameNotification {
    pub fn at_media_time(media_time: f64) -> Self {
        Self {
            timestamp: 0.0,
            media_time,
        }
    }
}

/// Playback flags handed to the clock at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackSettings {
    pub looping: bool,
    pub autoplay: bool,
    pub muted: bool,
}

/// A media clock with frame-accurate presentation callbacks.
pub trait PlaybackClock {
    /// True if the host can notify once per displayed frame. Without this
    /// the player cannot be constructed.
    fn supports_frame_notifications(&self) -> bool;

    /// Arm a one-shot notification for the next displayed frame.
    fn request_frame_notification(&mut self);

    fn apply_settings(&mut self, settings: PlaybackSettings);

    /// Replace the media source and start loading it.
    fn load_source(&mut self, src: &str);

    /// The clock's own buffering state.
    fn ready_state(&self) -> ReadyState;

    fn is_paused(&self) -> bool;

    fn pause(&mut self);

    fn play(&mut self);
}

/// How the playhead moved on a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStep {
    /// Same frame as before; nothing to do.
    Duplicate,
    /// Moved to a later frame.
    Forward,
    /// Moved to an earlier frame (loop or backward seek).
    Backward,
}

/// Current and previous frame of the playhead.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackPosition {
    frame_rate: FrameRate,
    current: FrameIndex,
    previous: Option<FrameIndex>,
}

impl PlaybackPosition {
    pub fn new(frame_rate: FrameRate) -> Self {
        Self {
            frame_rate,
            current: 0,
            previous: None,
        }
    }

    pub fn current(&self) -> FrameIndex {
        self.current
    }

    pub fn previous(&self) -> Option<FrameIndex> {
        self.previous
    }

    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    /// Move the playhead to the frame shown at `media_time`.
    pub fn advance(&mut self, media_time: f64) -> FrameStep {
        let frame = self.frame_rate.frame_at(media_time);
        if frame == self.current {
            return FrameStep::Duplicate;
        }
        self.previous = Some(self.current);
        self.current = frame;
        if frame < self.previous.unwrap_or(0) {
            FrameStep::Backward
        } else {
            FrameStep::Forward
        }
    }

    /// Back to frame 0 with no history (clip change).
    pub fn reset(&mut self) {
        self.current = 0;
        self.previous = None;
    }
}
