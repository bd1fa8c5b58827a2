//! Readiness state machine.
//!
//! Combines the clock source's own readiness with a mesh readiness tier
//! derived from the contiguous buffered run at the playhead, and tracks
//! buffering episodes: intervals where playback is held while meshes catch
//! up.

use meshseq_core::{defaults, FrameIndex, ReadyState};

/// Readiness observed after a recomputation that changed something.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessChange {
    /// `min(mesh, video)`.
    pub ready_state: ReadyState,
    pub mesh_ready_state: ReadyState,
    pub video_ready_state: ReadyState,
}

/// What the player must do to the clock after a recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferingAction {
    None,
    /// A buffering episode began; pause the clock if it was playing.
    Pause { was_playing: bool },
    /// The episode ended; resume the clock if it was playing before.
    Resume { was_playing: bool },
}

/// Mesh readiness tier for `buffered` contiguous frames at `current`.
///
/// Near the end of a bounded sequence a short run counts as full lookahead.
pub fn mesh_ready_state(
    buffered: u64,
    current: FrameIndex,
    max_frames: FrameIndex,
    meshes_per_second: f64,
) -> ReadyState {
    let remaining = max_frames as i64 - current as i64;
    let near_end = remaining <= buffered as i64;

    let mut state = ReadyState::Nothing;
    if buffered >= 1 {
        state = ReadyState::CurrentData;
    }
    if buffered >= defaults::FUTURE_DATA_FRAMES || near_end {
        state = ReadyState::FutureData;
    }
    if meshes_per_second > defaults::ENOUGH_DATA_MESHES_PER_SECOND
        && (buffered >= defaults::ENOUGH_DATA_FRAMES || near_end)
    {
        state = ReadyState::EnoughData;
    }
    state
}

/// Combined readiness plus buffering episode bookkeeping.
#[derive(Debug, Clone)]
pub struct ReadinessTracker {
    ready_state: ReadyState,
    mesh_ready_state: ReadyState,
    video_ready_state: ReadyState,
    buffering: bool,
    was_playing: bool,
}

impl ReadinessTracker {
    pub fn new() -> Self {
        Self {
            ready_state: ReadyState::Nothing,
            mesh_ready_state: ReadyState::Nothing,
            video_ready_state: ReadyState::Nothing,
            buffering: false,
            was_playing: false,
        }
    }

    /// Combined readiness, always `min(mesh, video)`.
    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    pub fn mesh_ready_state(&self) -> ReadyState {
        self.mesh_ready_state
    }

    pub fn video_ready_state(&self) -> ReadyState {
        self.video_ready_state
    }

    /// True while playback is held for meshes.
    pub fn is_buffering(&self) -> bool {
        self.buffering
    }

    /// Whether the clock was playing when the current episode began.
    pub fn was_playing(&self) -> bool {
        self.was_playing
    }

    /// Store new sub-states. Returns the change if the combined state or the
    /// mesh state differs from before.
    pub fn update(&mut self, mesh: ReadyState, video: ReadyState) -> Option<ReadinessChange> {
        let combined = mesh.combine(video);
        let changed = combined != self.ready_state || mesh != self.mesh_ready_state;

        self.mesh_ready_state = mesh;
        self.video_ready_state = video;
        self.ready_state = combined;

        if !changed {
            return None;
        }
        tracing::debug!(
            "new readyState: {} = min(meshReadyState={}, videoReadyState={})",
            combined,
            mesh,
            video
        );
        Some(ReadinessChange {
            ready_state: combined,
            mesh_ready_state: mesh,
            video_ready_state: video,
        })
    }

    /// Enter or leave a buffering episode based on the mesh tier.
    pub fn buffering_transition(&mut self, clock_playing: bool) -> BufferingAction {
        let can_play = self.mesh_ready_state.can_play();
        if !self.buffering && !can_play {
            self.buffering = true;
            self.was_playing = clock_playing;
            BufferingAction::Pause {
                was_playing: clock_playing,
            }
        } else if self.buffering && can_play {
            self.buffering = false;
            BufferingAction::Resume {
                was_playing: self.was_playing,
            }
        } else {
            BufferingAction::None
        }
    }

    /// Clip change: both tracks drop to nothing and a buffering episode
    /// begins that resumes into playback only if `autoplay` is set.
    pub fn reset(&mut self, autoplay: bool) {
        self.ready_state = ReadyState::Nothing;
        self.mesh_ready_state = ReadyState::Nothing;
        self.video_ready_state = ReadyState::Nothing;
        self.buffering = true;
        self.was_playing = autoplay;
    }
}

impl Default for ReadinessTracker {
    fn default() -> Self {
        Self::new()
    }
}
