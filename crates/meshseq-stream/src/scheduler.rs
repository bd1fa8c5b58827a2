//! Prefetch scheduling.
//!
//! Tracks the request window (last requested frame and open request count)
//! and decides which frames to fetch next. Requests are issued strictly in
//! frame order starting right after the last requested frame, never more
//! than the concurrency limit at once, and never at or past the sequence
//! bound.

use std::ops::Range;

use meshseq_core::{defaults, FrameIndex, ReadyState};

/// Request window bookkeeping plus the top-up policy.
#[derive(Debug, Clone)]
pub struct PrefetchScheduler {
    frames_to_buffer: u64,
    concurrency_limit: usize,
    last_requested: Option<FrameIndex>,
    open_requests: usize,
}

impl PrefetchScheduler {
    pub fn new(frames_to_buffer: u64, concurrency_limit: usize) -> Self {
        Self {
            frames_to_buffer,
            concurrency_limit: concurrency_limit.max(1),
            last_requested: None,
            open_requests: 0,
        }
    }

    /// Last frame a request was issued for; `None` before the first one.
    pub fn last_requested(&self) -> Option<FrameIndex> {
        self.last_requested
    }

    /// Fetches issued and not yet completed.
    pub fn open_requests(&self) -> usize {
        self.open_requests
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    pub fn frames_to_buffer(&self) -> u64 {
        self.frames_to_buffer
    }

    /// First frame the next request would be issued for.
    #[inline]
    pub fn next_frame(&self) -> FrameIndex {
        self.last_requested.map_or(0, |f| f + 1)
    }

    /// Free request slots.
    #[inline]
    pub fn deficit(&self) -> usize {
        self.concurrency_limit.saturating_sub(self.open_requests)
    }

    /// How far requests run ahead of `current` (negative when behind).
    pub fn lookahead(&self, current: FrameIndex) -> i64 {
        self.last_requested.map_or(-1, |f| f as i64) - current as i64
    }

    /// Frames to request now.
    ///
    /// Tops up whenever fewer than three frames are buffered at the playhead,
    /// or when the video can show the current frame and requests run less
    /// than `frames_to_buffer` ahead of it.
    pub fn plan(
        &self,
        current: FrameIndex,
        buffered: u64,
        video_ready: ReadyState,
        max_frames: FrameIndex,
    ) -> Range<FrameIndex> {
        let starving = buffered < defaults::FUTURE_DATA_FRAMES;
        let behind = video_ready >= ReadyState::CurrentData
            && self.lookahead(current) < i64::try_from(self.frames_to_buffer).unwrap_or(i64::MAX);
        if !(starving || behind) {
            return 0..0;
        }

        let start = self.next_frame();
        let end = start.saturating_add(self.deficit() as u64).min(max_frames);
        if start >= end {
            return 0..0;
        }
        tracing::debug!("requesting {} more meshes from frame {}", end - start, start);
        start..end
    }

    /// Record that a request for `frame` was handed to the loader.
    pub fn mark_issued(&mut self, frame: FrameIndex) {
        debug_assert!(self.open_requests < self.concurrency_limit);
        self.last_requested = Some(frame);
        self.open_requests += 1;
    }

    /// Record a completion (success or failure) for the current clip.
    pub fn mark_completed(&mut self) {
        self.open_requests = self.open_requests.saturating_sub(1);
    }

    /// Move the window up to the playhead after the clock jumped ahead of it.
    ///
    /// Returns `true` if the window moved.
    pub fn catch_up(&mut self, current: FrameIndex) -> bool {
        if self.lookahead(current) >= 0 {
            return false;
        }
        let target = current.checked_sub(1);
        let moved = self.last_requested != target;
        self.last_requested = target;
        moved
    }

    /// Restart requests from frame 0 (loop or backward seek).
    pub fn rewind(&mut self) {
        self.last_requested = None;
    }

    /// Forget all requests (clip change).
    pub fn reset(&mut self) {
        self.last_requested = None;
        self.open_requests = 0;
    }
}
