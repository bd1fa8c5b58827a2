//! Mesh sequence player: the synchronization engine.
//!
//! Driven from a single control flow by two kinds of events: a clock
//! notification once per displayed video frame (`on_video_frame`) and fetch
//! completions (`poll_completions` / `handle_completion`). Each event
//! updates the playhead or the frame store, recomputes readiness (pausing
//! or resuming the clock around buffering episodes), and tops up the
//! request window.

use crossbeam_channel::Receiver;
use tracing::{debug, info, trace, warn};

use meshseq_core::{
    ClipLocator, FrameIndex, MeshSeqError, PlayerConfig, ReadyState, ResolvedClip, Result,
};

use crate::bound::SequenceBound;
use crate::clock::{FrameNotification, FrameStep, PlaybackClock, PlaybackPosition, PlaybackSettings};
use crate::frame_store::{FrameStore, Generation};
use crate::loader::{CompletionSender, FetchCompletion, FetchOutcome, FetchRequest, MeshLoader};
use crate::readiness::{mesh_ready_state, BufferingAction, ReadinessChange, ReadinessTracker};
use crate::resource::dispose;
use crate::scheduler::PrefetchScheduler;
use crate::transfer::TransferRateEstimator;

/// Callback invoked once per readiness change.
pub type ReadinessObserver = Box<dyn FnMut(ReadinessChange)>;

/// Plays a streamed mesh sequence in lockstep with a video clock.
pub struct MeshSequencePlayer<C: PlaybackClock, L: MeshLoader> {
    config: PlayerConfig,
    clock: C,
    loader: L,
    clip: Option<ResolvedClip>,
    store: FrameStore<L::Resource>,
    bound: SequenceBound,
    scheduler: PrefetchScheduler,
    readiness: ReadinessTracker,
    transfer: TransferRateEstimator,
    position: PlaybackPosition,
    completions_tx: CompletionSender<L::Resource>,
    completions_rx: Receiver<FetchCompletion<L::Resource>>,
    observer: Option<ReadinessObserver>,
}

impl<C: PlaybackClock, L: MeshLoader> MeshSequencePlayer<C, L> {
    /// Create a player and, if the config names a clip, start loading it.
    ///
    /// Fails with `UnsupportedPlatform` if the clock cannot notify once per
    /// displayed frame.
    pub fn new(config: PlayerConfig, mut clock: C, loader: L) -> Result<Self> {
        if !clock.supports_frame_notifications() {
            return Err(MeshSeqError::UnsupportedPlatform(
                "per-frame video notifications are not available on this host; consider a polyfill"
                    .to_string(),
            ));
        }

        clock.apply_settings(PlaybackSettings {
            looping: config.looping,
            autoplay: config.autoplay,
            muted: config.muted,
        });

        let (completions_tx, completions_rx) = crossbeam_channel::unbounded();
        let mut player = Self {
            bound: SequenceBound::new(config.length),
            scheduler: PrefetchScheduler::new(config.frames_to_buffer, config.max_concurrent_requests),
            position: PlaybackPosition::new(config.frame_rate),
            readiness: ReadinessTracker::new(),
            transfer: TransferRateEstimator::default(),
            store: FrameStore::new(),
            clip: None,
            config,
            clock,
            loader,
            completions_tx,
            completions_rx,
            observer: None,
        };

        player.clock.request_frame_notification();

        if let Some(clip) = player.config.clip.clone() {
            player.start_clip(clip);
        }
        Ok(player)
    }

    /// Register the readiness observer, replacing any previous one.
    pub fn set_observer(&mut self, observer: impl FnMut(ReadinessChange) + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// Builder form of `set_observer`.
    pub fn with_observer(mut self, observer: impl FnMut(ReadinessChange) + 'static) -> Self {
        self.set_observer(observer);
        self
    }

    /// Switch to another clip. In-flight fetches for the old clip are
    /// discarded when they complete.
    pub fn load_clip(&mut self, locator: &ClipLocator) -> Result<()> {
        let clip = locator.resolve()?;
        self.start_clip(clip);
        Ok(())
    }

    fn start_clip(&mut self, clip: ResolvedClip) {
        if !self.clock.is_paused() {
            self.clock.pause();
        }
        if let Some(src) = &clip.video_src {
            self.clock.load_source(src);
        }

        let generation = self.store.advance_generation();
        self.store.reset_all();
        self.position.reset();
        self.scheduler.reset();
        self.bound.reset();
        self.readiness.reset(self.config.autoplay);

        // Hold playback until the first meshes arrive.
        if !self.clock.is_paused() {
            self.clock.pause();
        }

        info!(
            generation = %generation,
            meshes = %clip.naming.directory,
            video = ?clip.video_src,
            "Loading clip"
        );
        self.clip = Some(clip);

        self.update_ready_state();
        self.load_more_meshes();
    }

    /// Clock notification for a newly displayed video frame.
    pub fn on_video_frame(&mut self, notification: FrameNotification) {
        match self.position.advance(notification.media_time) {
            FrameStep::Duplicate => {
                trace!(frame = self.position.current(), "duplicate video frame");
            }
            step => {
                let current = self.position.current();
                if self.store.contains(current) {
                    self.store.activate(current);
                }
                self.update_ready_state();

                if self.scheduler.catch_up(current) {
                    debug!(frame = current, "request window behind playhead, catching up");
                }
                if step == FrameStep::Backward {
                    debug!(
                        from = ?self.position.previous(),
                        to = current,
                        "looped or seeked backwards"
                    );
                    self.scheduler.rewind();
                }

                self.load_more_meshes();
            }
        }

        self.clock.request_frame_notification();
    }

    /// The clock finished loading media data.
    pub fn on_video_data_loaded(&mut self) {
        self.update_ready_state();
    }

    /// Process every completion reported so far. Returns how many were handled.
    pub fn poll_completions(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.handle_completion(completion);
            handled += 1;
        }
        handled
    }

    /// Process a single fetch completion.
    pub fn handle_completion(&mut self, completion: FetchCompletion<L::Resource>) {
        let FetchCompletion {
            frame,
            generation,
            outcome,
        } = completion;

        if generation != self.store.generation() {
            debug!(frame, stale = %generation, "discarding mesh from a previous clip");
            if let FetchOutcome::Loaded { resource, .. } = outcome {
                dispose(resource);
            }
            return;
        }

        self.scheduler.mark_completed();

        match outcome {
            FetchOutcome::Loaded {
                resource,
                bytes,
                elapsed,
            } => {
                let stored = self
                    .store
                    .insert(frame, generation, resource, self.bound.max_frames());
                if !stored.is_stored() {
                    warn!(frame, outcome = ?stored, "mesh rejected by frame store");
                }
                self.transfer.record(bytes, elapsed);
            }
            FetchOutcome::Failed { reason } => {
                debug!(frame, %reason, "mesh fetch failed");
                if self.bound.on_fetch_failed(frame) {
                    self.store.truncate(self.bound.max_frames());
                }
            }
        }

        self.update_ready_state();
        self.load_more_meshes();
    }

    /// Recompute readiness, notify the observer on change, and pause or
    /// resume the clock around buffering episodes.
    pub fn update_ready_state(&mut self) {
        let current = self.position.current();
        let buffered = self.store.contiguous_count(current);
        let mesh = mesh_ready_state(
            buffered,
            current,
            self.bound.max_frames(),
            self.transfer.meshes_per_second(),
        );
        let video = self.clock.ready_state();
        trace!(buffered, frame = current, "buffered meshes");

        if let Some(change) = self.readiness.update(mesh, video) {
            if let Some(observer) = self.observer.as_mut() {
                observer(change);
            }
        }

        match self.readiness.buffering_transition(!self.clock.is_paused()) {
            BufferingAction::Pause { was_playing } => {
                info!(frame = current, buffered, "not enough meshes buffered, pausing while meshes load");
                if was_playing {
                    self.clock.pause();
                }
            }
            BufferingAction::Resume { was_playing } => {
                if self.store.contains(current) {
                    self.store.activate(current);
                }
                if was_playing && self.clock.is_paused() {
                    info!(frame = current, "buffering finished, resuming playback");
                    self.clock.play();
                }
            }
            BufferingAction::None => {}
        }
    }

    fn load_more_meshes(&mut self) {
        let Some(clip) = self.clip.as_ref() else {
            return;
        };
        let current = self.position.current();
        let frames = self.scheduler.plan(
            current,
            self.store.contiguous_count(current),
            self.clock.ready_state(),
            self.bound.max_frames(),
        );

        let generation = self.store.generation();
        for frame in frames {
            let request = FetchRequest {
                frame,
                url: clip.naming.url_for(frame),
                generation,
            };
            self.scheduler.mark_issued(frame);
            self.loader.load(request, self.completions_tx.clone());
        }
    }

    /// Combined readiness: `min(mesh, video)`.
    pub fn ready_state(&self) -> ReadyState {
        self.readiness.ready_state()
    }

    pub fn mesh_ready_state(&self) -> ReadyState {
        self.readiness.mesh_ready_state()
    }

    pub fn video_ready_state(&self) -> ReadyState {
        self.readiness.video_ready_state()
    }

    /// True while playback is held for meshes.
    pub fn is_buffering(&self) -> bool {
        self.readiness.is_buffering()
    }

    /// Geometry to draw this render pass. Do not cache across passes.
    pub fn active_geometry(&self) -> Option<&L::Resource> {
        self.store.active()
    }

    pub fn active_frame(&self) -> Option<FrameIndex> {
        self.store.active_frame()
    }

    pub fn current_frame(&self) -> FrameIndex {
        self.position.current()
    }

    pub fn previous_frame(&self) -> Option<FrameIndex> {
        self.position.previous()
    }

    pub fn last_requested_frame(&self) -> Option<FrameIndex> {
        self.scheduler.last_requested()
    }

    pub fn open_requests(&self) -> usize {
        self.scheduler.open_requests()
    }

    /// Exclusive bound on valid frame indices.
    pub fn max_frames(&self) -> FrameIndex {
        self.bound.max_frames()
    }

    pub fn generation(&self) -> Generation {
        self.store.generation()
    }

    /// Buffered frame indices in ascending order.
    pub fn buffered_frames(&self) -> impl Iterator<Item = FrameIndex> + '_ {
        self.store.frames()
    }

    /// Consecutive buffered frames starting at the playhead.
    pub fn contiguous_buffered(&self) -> u64 {
        self.store.contiguous_count(self.position.current())
    }

    /// True if `size` frames from the playhead (within the sequence) are buffered.
    pub fn has_buffered_window(&self, size: u64) -> bool {
        self.store
            .has_window(self.position.current(), size, self.bound.max_frames())
    }

    pub fn transfer(&self) -> &TransferRateEstimator {
        &self.transfer
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn clip(&self) -> Option<&ResolvedClip> {
        self.clip.as_ref()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }
}
