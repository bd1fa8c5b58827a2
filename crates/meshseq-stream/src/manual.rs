//! Manually driven clock and loader.
//!
//! Headless hosts and tests advance `ManualClock` themselves and resolve
//! the fetches captured by `RecordingLoader` in whatever order they like,
//! so every interleaving of ticks and completions can be reproduced
//! without timers or threads.

use std::time::Duration;

use meshseq_core::{FrameIndex, ReadyState};

use crate::clock::{FrameNotification, PlaybackClock, PlaybackSettings};
use crate::loader::{CompletionSender, FetchCompletion, FetchRequest, MeshLoader};
use crate::resource::GeometryResource;

/// A clock whose media time only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    frame_notifications: bool,
    media_time: f64,
    duration: Option<f64>,
    ready_state: ReadyState,
    paused: bool,
    settings: PlaybackSettings,
    source: Option<String>,
    armed: bool,
    notification_requests: usize,
    pause_calls: usize,
    play_calls: usize,
}

impl ManualClock {
    /// A paused clock at time zero whose video is fully buffered.
    pub fn new() -> Self {
        Self {
            frame_notifications: true,
            media_time: 0.0,
            duration: None,
            ready_state: ReadyState::EnoughData,
            paused: true,
            settings: PlaybackSettings::default(),
            source: None,
            armed: false,
            notification_requests: 0,
            pause_calls: 0,
            play_calls: 0,
        }
    }

    /// A clock on a host without per-frame notifications.
    pub fn without_frame_notifications() -> Self {
        Self {
            frame_notifications: false,
            ..Self::new()
        }
    }

    pub fn media_time(&self) -> f64 {
        self.media_time
    }

    /// Jump to `media_time` (a seek).
    pub fn set_media_time(&mut self, media_time: f64) {
        self.media_time = media_time.max(0.0);
    }

    /// Media duration; playback stops or wraps there.
    pub fn set_duration(&mut self, duration: Option<f64>) {
        self.duration = duration;
    }

    pub fn set_ready_state(&mut self, ready_state: ReadyState) {
        self.ready_state = ready_state;
    }

    /// Advance media time by `secs` if playing, wrapping when looping.
    pub fn advance(&mut self, secs: f64) {
        if self.paused {
            return;
        }
        self.media_time += secs;
        if let Some(duration) = self.duration.filter(|d| *d > 0.0) {
            if self.media_time >= duration {
                if self.settings.looping {
                    self.media_time %= duration;
                } else {
                    self.media_time = duration;
                    self.paused = true;
                }
            }
        }
    }

    /// Consume the armed notification, if any, for the current media time.
    pub fn take_notification(&mut self, timestamp: f64) -> Option<FrameNotification> {
        if !self.armed {
            return None;
        }
        self.armed = false;
        Some(FrameNotification {
            timestamp,
            media_time: self.media_time,
        })
    }

    /// True while a notification is requested and not yet delivered.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Total number of notification requests received.
    pub fn notification_requests(&self) -> usize {
        self.notification_requests
    }

    pub fn settings(&self) -> PlaybackSettings {
        self.settings
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn pause_calls(&self) -> usize {
        self.pause_calls
    }

    pub fn play_calls(&self) -> usize {
        self.play_calls
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClock for ManualClock {
    fn supports_frame_notifications(&self) -> bool {
        self.frame_notifications
    }

    fn request_frame_notification(&mut self) {
        self.armed = true;
        self.notification_requests += 1;
    }

    fn apply_settings(&mut self, settings: PlaybackSettings) {
        self.settings = settings;
    }

    fn load_source(&mut self, src: &str) {
        self.source = Some(src.to_string());
        self.media_time = 0.0;
        self.paused = !self.settings.autoplay;
    }

    fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn pause(&mut self) {
        self.pause_calls += 1;
        self.paused = true;
    }

    fn play(&mut self) {
        self.play_calls += 1;
        self.paused = false;
    }
}

/// A fetch captured by `RecordingLoader`, waiting to be resolved.
pub struct PendingFetch<R> {
    pub request: FetchRequest,
    completions: CompletionSender<R>,
}

impl<R> PendingFetch<R> {
    /// Deliver a successful completion.
    pub fn succeed(self, resource: R, bytes: u64, elapsed: Duration) {
        let completion = FetchCompletion::loaded(&self.request, resource, bytes, elapsed);
        let _ = self.completions.send(completion);
    }

    /// Deliver a failed completion.
    pub fn fail(self, reason: impl Into<String>) {
        let _ = self.completions.send(FetchCompletion::failed(&self.request, reason));
    }
}

/// Captures every fetch and leaves resolution to the caller.
pub struct RecordingLoader<R> {
    pending: Vec<PendingFetch<R>>,
    history: Vec<FetchRequest>,
}

impl<R> RecordingLoader<R> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Every request ever issued, in issue order.
    pub fn history(&self) -> &[FetchRequest] {
        &self.history
    }

    /// Requests not yet resolved, in issue order.
    pub fn pending(&self) -> impl Iterator<Item = &FetchRequest> {
        self.pending.iter().map(|p| &p.request)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Highest frame ever requested.
    pub fn max_requested(&self) -> Option<FrameIndex> {
        self.history.iter().map(|r| r.frame).max()
    }

    /// Remove and return every unresolved fetch.
    pub fn take_pending(&mut self) -> Vec<PendingFetch<R>> {
        std::mem::take(&mut self.pending)
    }

    /// Remove the oldest unresolved fetch for `frame`.
    pub fn take(&mut self, frame: FrameIndex) -> Option<PendingFetch<R>> {
        let index = self.pending.iter().position(|p| p.request.frame == frame)?;
        Some(self.pending.remove(index))
    }

    /// Resolve the oldest fetch for `frame` successfully.
    pub fn complete(&mut self, frame: FrameIndex, resource: R, bytes: u64, elapsed: Duration) -> bool {
        match self.take(frame) {
            Some(fetch) => {
                fetch.succeed(resource, bytes, elapsed);
                true
            }
            None => false,
        }
    }

    /// Resolve the oldest fetch for `frame` as failed.
    pub fn fail(&mut self, frame: FrameIndex) -> bool {
        match self.take(frame) {
            Some(fetch) => {
                fetch.fail("not found");
                true
            }
            None => false,
        }
    }
}

impl<R> Default for RecordingLoader<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: GeometryResource> MeshLoader for RecordingLoader<R> {
    type Resource = R;

    fn load(&mut self, request: FetchRequest, completions: CompletionSender<R>) {
        self.history.push(request.clone());
        self.pending.push(PendingFetch {
            request,
            completions,
        });
    }
}
