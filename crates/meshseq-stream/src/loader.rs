//! Resource loader interface.
//!
//! The engine hands each fetch to a `MeshLoader` together with a channel
//! sender. The loader must send exactly one `FetchCompletion` per request,
//! from any thread, at any later time. Completions are processed on the
//! engine's own control flow when the host polls for them.

use std::time::Duration;

use meshseq_core::FrameIndex;

use crate::frame_store::Generation;
use crate::resource::GeometryResource;

/// A single mesh fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub frame: FrameIndex,
    pub url: String,
    /// Clip load the request was issued under.
    pub generation: Generation,
}

/// Result of a fetch.
#[derive(Debug)]
pub enum FetchOutcome<R> {
    Loaded {
        resource: R,
        /// Total bytes transferred.
        bytes: u64,
        /// Time from issue to completion.
        elapsed: Duration,
    },
    /// The mesh could not be fetched or decoded. Past the end of a sequence
    /// this is the expected outcome.
    Failed { reason: String },
}

/// Completion message sent back by a loader.
#[derive(Debug)]
pub struct FetchCompletion<R> {
    pub frame: FrameIndex,
    pub generation: Generation,
    pub outcome: FetchOutcome<R>,
}

impl<R> FetchCompletion<R> {
    pub fn loaded(request: &FetchRequest, resource: R, bytes: u64, elapsed: Duration) -> Self {
        Self {
            frame: request.frame,
            generation: request.generation,
            outcome: FetchOutcome::Loaded {
                resource,
                bytes,
                elapsed,
            },
        }
    }

    pub fn failed(request: &FetchRequest, reason: impl Into<String>) -> Self {
        Self {
            frame: request.frame,
            generation: request.generation,
            outcome: FetchOutcome::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.outcome, FetchOutcome::Loaded { .. })
    }
}

/// Channel end a loader reports completions on.
pub type CompletionSender<R> = crossbeam_channel::Sender<FetchCompletion<R>>;

/// Fetches and decodes mesh frames.
pub trait MeshLoader {
    type Resource: GeometryResource;

    /// Start fetching `request`; report exactly once on `completions`.
    fn load(&mut self, request: FetchRequest, completions: CompletionSender<Self::Resource>);
}
