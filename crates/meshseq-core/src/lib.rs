//! MeshSeq Core - Foundation types for mesh sequence playback
//!
//! This crate provides the fundamental types used throughout MeshSeq:
//! - Frame indices and nominal frame rates
//! - Ordinal ready states shared by the video and mesh tracks
//! - Validated player configuration and clip file naming
//! - The common error type

pub mod config;
pub mod error;
pub mod ready_state;
pub mod time;

pub use config::{
    ClipLocator, ClipSpec, FrameNaming, PlayerConfig, PlayerOptions, ResolvedClip, SequenceLength,
};
pub use error::{MeshSeqError, Result};
pub use ready_state::ReadyState;
pub use time::{FrameIndex, FrameRate};

/// Default tuning constants for the streaming engine.
pub mod defaults {
    /// Frames to keep requested ahead of the playhead.
    pub const FRAMES_TO_BUFFER: u64 = 30;

    /// Upper bound on outstanding mesh fetches.
    pub const MAX_CONCURRENT_REQUESTS: usize = 15;

    /// Sequence bound used until a fetch failure reveals the real length.
    pub const UNKNOWN_SEQUENCE_LENGTH: u64 = 999_999;

    /// Number of transfer samples averaged by the rate estimator.
    pub const TRANSFER_WINDOW: usize = 30;

    /// Contiguous buffered frames needed for FUTURE_DATA.
    pub const FUTURE_DATA_FRAMES: u64 = 3;

    /// Contiguous buffered frames needed for ENOUGH_DATA.
    pub const ENOUGH_DATA_FRAMES: u64 = 30;

    /// Estimated meshes per second that must be exceeded for ENOUGH_DATA.
    pub const ENOUGH_DATA_MESHES_PER_SECOND: f64 = 1.25;

    /// Default mesh file prefix.
    pub const MESH_FILE_PREFIX: &str = "mesh-f";

    /// Default mesh file suffix.
    pub const MESH_FILE_SUFFIX: &str = ".drc";

    /// Default zero-padding width for mesh file numbers.
    pub const MESH_ZERO_PADDING: usize = 5;

    /// Default number added to a frame index to form its file number.
    pub const MESH_START_FRAME: u64 = 1;

    /// Video container extension used by convention-based clip naming.
    pub const VIDEO_EXTENSION: &str = ".mp4";
}
