//! MeshSeq Stream - Buffering and synchronization engine
//!
//! Plays a sequence of per-frame meshes in lockstep with a video clock:
//! - Frame store keyed by frame index with eager eviction
//! - Prefetch scheduling under a concurrency limit
//! - Sequence length discovery from fetch failures
//! - Transfer rate estimation and readiness tiers
//! - Buffering episodes that pause and resume the clock

pub mod bound;
pub mod clock;
pub mod frame_store;
pub mod loader;
pub mod manual;
pub mod player;
pub mod readiness;
pub mod resource;
pub mod scheduler;
pub mod transfer;

pub use bound::SequenceBound;
pub use clock::{FrameNotification, FrameStep, PlaybackClock, PlaybackPosition, PlaybackSettings};
pub use frame_store::{FrameStore, Generation, InsertOutcome};
pub use loader::{CompletionSender, FetchCompletion, FetchOutcome, FetchRequest, MeshLoader};
pub use manual::{ManualClock, PendingFetch, RecordingLoader};
pub use player::{MeshSequencePlayer, ReadinessObserver};
pub use readiness::{mesh_ready_state, BufferingAction, ReadinessChange, ReadinessTracker};
pub use resource::GeometryResource;
pub use scheduler::PrefetchScheduler;
pub use transfer::{SampleWindow, TransferRateEstimator};
