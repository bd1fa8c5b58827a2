//! Frame geometry store.
//!
//! Owns every decoded mesh between fetch completion and eviction. Keys are
//! frame indices; completions may arrive in any order. The active frame is
//! the one the renderer currently borrows, and it is only ever replaced by
//! `activate`.

use std::collections::BTreeMap;
use std::fmt;

use meshseq_core::FrameIndex;

use crate::resource::{dispose, GeometryResource};

/// Identifies which clip load a fetch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

impl Generation {
    #[inline]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}

/// What happened to a resource handed to `FrameStore::insert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Stored under a previously empty key.
    Inserted,
    /// Stored; the resource previously held for the frame was released.
    Replaced,
    /// Released: the fetch belongs to an earlier clip load.
    Stale,
    /// Released: the frame lies beyond the known sequence length.
    OutOfRange,
}

impl InsertOutcome {
    pub fn is_stored(self) -> bool {
        matches!(self, Self::Inserted | Self::Replaced)
    }
}

/// Mapping from frame index to decoded geometry, with forward eviction.
pub struct FrameStore<R: GeometryResource> {
    frames: BTreeMap<FrameIndex, R>,
    active: Option<FrameIndex>,
    generation: Generation,
}

impl<R: GeometryResource> FrameStore<R> {
    /// Create an empty store at generation 0.
    pub fn new() -> Self {
        Self {
            frames: BTreeMap::new(),
            active: None,
            generation: Generation::default(),
        }
    }

    /// Generation that fresh fetches must carry to be accepted.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Invalidate every fetch issued so far.
    pub fn advance_generation(&mut self) -> Generation {
        self.generation = self.generation.next();
        self.generation
    }

    /// Store `resource` for `frame`.
    ///
    /// Stale or out-of-range resources are released instead of stored.
    pub fn insert(
        &mut self,
        frame: FrameIndex,
        generation: Generation,
        resource: R,
        max_frames: FrameIndex,
    ) -> InsertOutcome {
        if generation != self.generation {
            dispose(resource);
            return InsertOutcome::Stale;
        }
        if frame >= max_frames {
            dispose(resource);
            return InsertOutcome::OutOfRange;
        }

        match self.frames.insert(frame, resource) {
            Some(previous) => {
                dispose(previous);
                InsertOutcome::Replaced
            }
            None => InsertOutcome::Inserted,
        }
    }

    /// Make `frame` the active geometry and release everything before it.
    ///
    /// Returns `false` (and changes nothing) if `frame` is not buffered.
    pub fn activate(&mut self, frame: FrameIndex) -> bool {
        if !self.frames.contains_key(&frame) {
            return false;
        }
        self.active = Some(frame);

        let kept = self.frames.split_off(&frame);
        let evicted = std::mem::replace(&mut self.frames, kept);
        let count = evicted.len();
        evicted.into_values().for_each(dispose);
        if count > 0 {
            tracing::trace!("evicted {} frames before {}", count, frame);
        }
        true
    }

    /// Release every frame at or beyond `max_frames`.
    pub fn truncate(&mut self, max_frames: FrameIndex) {
        let beyond = self.frames.split_off(&max_frames);
        if beyond.is_empty() {
            return;
        }
        if self.active.is_some_and(|f| f >= max_frames) {
            self.active = None;
        }
        tracing::debug!(
            "released {} frames beyond sequence end {}",
            beyond.len(),
            max_frames
        );
        beyond.into_values().for_each(dispose);
    }

    /// Number of consecutive buffered frames starting at `from`.
    pub fn contiguous_count(&self, from: FrameIndex) -> u64 {
        let mut expected = from;
        for &frame in self.frames.range(from..).map(|(k, _)| k) {
            if frame != expected {
                break;
            }
            expected += 1;
        }
        expected - from
    }

    /// True if every frame in `[from, from + size)` below `max_frames` is buffered.
    pub fn has_window(&self, from: FrameIndex, size: u64, max_frames: FrameIndex) -> bool {
        let end = from.saturating_add(size).min(max_frames);
        (from..end).all(|frame| self.frames.contains_key(&frame))
    }

    /// Release every entry and clear the active geometry.
    pub fn reset_all(&mut self) {
        let frames = std::mem::take(&mut self.frames);
        if !frames.is_empty() {
            tracing::debug!("releasing {} buffered frames", frames.len());
        }
        frames.into_values().for_each(dispose);
        self.active = None;
    }

    /// Geometry the renderer should draw this pass.
    pub fn active(&self) -> Option<&R> {
        self.active.and_then(|frame| self.frames.get(&frame))
    }

    pub fn active_frame(&self) -> Option<FrameIndex> {
        self.active
    }

    pub fn get(&self, frame: FrameIndex) -> Option<&R> {
        self.frames.get(&frame)
    }

    pub fn contains(&self, frame: FrameIndex) -> bool {
        self.frames.contains_key(&frame)
    }

    /// Buffered frame indices in ascending order.
    pub fn frames(&self) -> impl Iterator<Item = FrameIndex> + '_ {
        self.frames.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl<R: GeometryResource> Default for FrameStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: GeometryResource> Drop for FrameStore<R> {
    fn drop(&mut self) {
        self.reset_all();
    }
}
