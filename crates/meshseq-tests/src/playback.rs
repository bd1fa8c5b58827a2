//! Integration tests for the synchronization engine.
//!
//! Drives `MeshSequencePlayer` with a manual clock and a recording loader,
//! resolving fetches in explicit order.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use meshseq_core::{ClipLocator, FrameIndex, PlayerConfig, PlayerOptions, ReadyState};
use meshseq_stream::{
    FetchRequest, FrameNotification, GeometryResource, Generation, ManualClock,
    MeshSequencePlayer, PlaybackClock, ReadinessChange, RecordingLoader,
};
use proptest::prelude::*;

// ── Helpers ────────────────────────────────────────────────────

type ReleaseLog = Rc<RefCell<Vec<(Generation, FrameIndex)>>>;

struct TestMesh {
    frame: FrameIndex,
    generation: Generation,
    released: bool,
    log: ReleaseLog,
}

impl TestMesh {
    fn for_request(request: &FetchRequest, log: &ReleaseLog) -> Self {
        Self {
            frame: request.frame,
            generation: request.generation,
            released: false,
            log: Rc::clone(log),
        }
    }
}

impl GeometryResource for TestMesh {
    fn release(&mut self) {
        assert!(!self.released, "frame {} released twice", self.frame);
        self.released = true;
        self.log.borrow_mut().push((self.generation, self.frame));
    }
}

type Player = MeshSequencePlayer<ManualClock, RecordingLoader<TestMesh>>;

struct Harness {
    player: Player,
    released: ReleaseLog,
    changes: Rc<RefCell<Vec<ReadinessChange>>>,
}

impl Harness {
    fn new(mut options: PlayerOptions) -> Self {
        if options.clip.is_none() {
            options.clip = Some(ClipLocator::from("clips/alpha"));
        }
        let config = options.validate().unwrap();
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&changes);
        let player = Player::new(config, ManualClock::new(), RecordingLoader::new())
            .unwrap()
            .with_observer(move |change| sink.borrow_mut().push(change));
        Self {
            player,
            released: Rc::new(RefCell::new(Vec::new())),
            changes,
        }
    }

    fn with_limit(limit: usize) -> Self {
        Self::new(PlayerOptions {
            max_concurrent_requests: Some(limit),
            ..Default::default()
        })
    }

    fn deliver(&mut self, frames: impl IntoIterator<Item = FrameIndex>) {
        for frame in frames {
            let fetch = self
                .player
                .loader_mut()
                .take(frame)
                .unwrap_or_else(|| panic!("no pending fetch for frame {frame}"));
            let mesh = TestMesh::for_request(&fetch.request, &self.released);
            fetch.succeed(mesh, 40_000, Duration::from_millis(5));
            self.player.poll_completions();
        }
    }

    /// Resolve every pending fetch, including the ones each completion
    /// triggers, until nothing is left in flight.
    fn deliver_all(&mut self) {
        for _ in 0..1000 {
            let frames: Vec<_> = self.player.loader().pending().map(|r| r.frame).collect();
            if frames.is_empty() {
                return;
            }
            self.deliver(frames);
        }
        panic!("request window never drained");
    }

    fn fail(&mut self, frame: FrameIndex) {
        assert!(self.player.loader_mut().fail(frame), "no pending fetch for frame {frame}");
        self.player.poll_completions();
    }

    fn fail_pending(&mut self) {
        for fetch in self.player.loader_mut().take_pending() {
            fetch.fail("not found");
        }
        self.player.poll_completions();
    }

    fn tick(&mut self, frame: FrameIndex) {
        let media_time = self.player.config().frame_rate.media_time_of(frame);
        self.player
            .on_video_frame(FrameNotification::at_media_time(media_time));
    }

    fn request_count(&self) -> usize {
        self.player.loader().history().len()
    }

    fn requested_since(&self, mark: usize) -> Vec<FrameIndex> {
        self.player.loader().history()[mark..]
            .iter()
            .map(|r| r.frame)
            .collect()
    }

    fn buffered(&self) -> Vec<FrameIndex> {
        self.player.buffered_frames().collect()
    }
}

// ── Construction ───────────────────────────────────────────────

#[test]
fn clock_without_frame_notifications_is_rejected() {
    let result = MeshSequencePlayer::new(
        PlayerConfig::default(),
        ManualClock::without_frame_notifications(),
        RecordingLoader::<TestMesh>::new(),
    );
    assert!(result.err().unwrap().is_unsupported_platform());
}

#[test]
fn construction_without_clip_requests_nothing() {
    let player = Player::new(PlayerConfig::default(), ManualClock::new(), RecordingLoader::new()).unwrap();
    assert_eq!(player.loader().history().len(), 0);
    assert!(player.clock().is_armed());
    assert!(player.clip().is_none());
}

#[test]
fn clip_load_requests_window_in_frame_order() {
    let h = Harness::with_limit(15);
    assert_eq!(h.requested_since(0), (0..15).collect::<Vec<_>>());
    assert_eq!(h.player.loader().history()[3].url, "clips/alpha/mesh-f00004.drc");
    assert_eq!(h.player.max_frames(), 999_999);
}

// ── Sequence length discovery ──────────────────────────────────

#[test]
fn ten_frame_sequence_is_discovered_from_first_failure() {
    let mut h = Harness::with_limit(15);
    h.deliver(0..10);
    h.fail(10);
    assert_eq!(h.player.max_frames(), 10);

    let mark = h.request_count();
    h.fail_pending();
    for frame in 1..10 {
        h.tick(frame);
    }

    assert_eq!(h.player.max_frames(), 10);
    assert!(h.requested_since(mark).iter().all(|&f| f < 10));
    assert!(h.buffered().iter().all(|&f| f < 10));
    assert_eq!(h.player.open_requests(), 0);
    // One frame left and the network is fast: the end counts as full lookahead.
    assert_eq!(h.player.mesh_ready_state(), ReadyState::EnoughData);
}

#[test]
fn later_failure_does_not_widen_bound() {
    let mut h = Harness::with_limit(15);
    h.fail(12);
    h.fail(7);
    h.fail(9);
    assert_eq!(h.player.max_frames(), 7);
}

#[test]
fn narrowed_bound_releases_frames_beyond_it() {
    let mut h = Harness::with_limit(15);
    h.deliver([8, 9]);
    h.fail(6);
    assert!(h.buffered().is_empty());
    let released: Vec<_> = h.released.borrow().iter().map(|&(_, f)| f).collect();
    assert_eq!(released, vec![8, 9]);
}

#[test]
fn fixed_length_ignores_failures() {
    let mut h = Harness::new(PlayerOptions {
        max_frames: Some(12),
        ..Default::default()
    });
    assert_eq!(h.request_count(), 12);
    h.fail(4);
    assert_eq!(h.player.max_frames(), 12);
    h.deliver_all();
    assert!(h.requested_since(0).iter().all(|&f| f < 12));
}

// ── Looping ────────────────────────────────────────────────────

#[test]
fn loop_to_start_rewinds_request_window() {
    let mut h = Harness::new(PlayerOptions {
        max_frames: Some(110),
        ..Default::default()
    });
    h.tick(99);
    h.deliver_all();
    assert_eq!(h.player.last_requested_frame(), Some(109));
    assert_eq!(h.player.active_frame(), Some(99));

    let mark = h.request_count();
    h.tick(0);

    assert_eq!(h.player.previous_frame(), Some(99));
    assert_eq!(h.requested_since(mark), (0..15).collect::<Vec<_>>());
    // The tail of the previous pass is still cached.
    assert!(h.buffered().contains(&99));
    assert!(h.player.is_buffering());
}

#[test]
fn loop_in_discovered_sequence_stays_within_bound() {
    let mut h = Harness::with_limit(4);
    h.deliver(0..4);
    h.fail_pending();
    let bound = h.player.max_frames();
    assert!(bound < 999_999);

    for frame in 1..bound {
        h.tick(frame);
    }
    let mark = h.request_count();
    h.tick(0);
    assert!(!h.requested_since(mark).is_empty());
    assert!(h.requested_since(mark).iter().all(|&f| f < bound));
}

// ── Concurrency ────────────────────────────────────────────────

#[test]
fn saturated_window_issues_nothing_until_a_completion() {
    let mut h = Harness::with_limit(5);
    assert_eq!(h.request_count(), 5);
    assert_eq!(h.player.open_requests(), 5);

    h.tick(1);
    h.tick(2);
    assert_eq!(h.request_count(), 5);

    h.deliver([2]);
    assert_eq!(h.request_count(), 6);
    assert_eq!(h.player.last_requested_frame(), Some(5));
    assert_eq!(h.player.open_requests(), 5);
}

#[test]
fn playhead_ahead_of_requests_catches_up() {
    let mut h = Harness::with_limit(3);
    h.tick(40);
    assert_eq!(h.player.last_requested_frame(), Some(39));
    h.deliver([0]);
    assert_eq!(h.player.loader().history().last().unwrap().frame, 40);
}

// ── Clip reload ────────────────────────────────────────────────

#[test]
fn reload_discards_and_releases_stale_completions() {
    let mut h = Harness::with_limit(15);
    h.deliver(0..3);
    h.tick(1);
    let old = h.player.generation();
    let stale: Vec<_> = h.player.loader().pending().map(|r| r.frame).collect();

    h.player.load_clip(&ClipLocator::from("clips/beta")).unwrap();
    let new = h.player.generation();
    assert_ne!(old, new);
    assert!(h.buffered().is_empty());
    assert!(h.player.active_geometry().is_none());
    assert_eq!(h.player.open_requests(), 15);
    assert_eq!(h.player.current_frame(), 0);

    // Old fetches were issued first, so `take` resolves them before new ones.
    h.deliver(stale.iter().copied());
    assert!(h.buffered().is_empty());
    assert_eq!(h.player.open_requests(), 15);
    for frame in &stale {
        assert!(h.released.borrow().contains(&(old, *frame)));
    }

    h.deliver(0..3);
    let active = h.player.active_geometry().unwrap();
    assert_eq!(active.generation, new);
    assert!(h
        .player
        .loader()
        .history()
        .iter()
        .filter(|r| r.generation == new)
        .all(|r| r.url.starts_with("clips/beta/")));
}

#[test]
fn stale_failure_does_not_narrow_new_clip() {
    let mut h = Harness::with_limit(15);
    h.player.load_clip(&ClipLocator::from("clips/beta")).unwrap();
    h.fail(5);
    assert_eq!(h.player.max_frames(), 999_999);
}

#[test]
fn reload_resets_discovered_bound() {
    let mut h = Harness::with_limit(15);
    h.fail(3);
    assert_eq!(h.player.max_frames(), 3);
    h.player.load_clip(&ClipLocator::from("clips/beta")).unwrap();
    assert_eq!(h.player.max_frames(), 999_999);
    assert_eq!(h.player.last_requested_frame(), Some(14));
}

// ── Store and readiness ────────────────────────────────────────

#[test]
fn out_of_order_completions_are_keyed_by_frame() {
    let mut h = Harness::with_limit(15);
    h.deliver([5, 3, 7, 0, 1, 2, 4, 6]);
    assert_eq!(h.buffered(), (0..8).collect::<Vec<_>>());
    assert_eq!(h.player.contiguous_buffered(), 8);
}

#[test]
fn activation_evicts_only_earlier_frames() {
    let mut h = Harness::with_limit(15);
    h.deliver(0..8);
    h.tick(4);
    assert_eq!(h.player.active_frame(), Some(4));
    assert_eq!(h.buffered(), (4..8).collect::<Vec<_>>());

    let mut released: Vec<_> = h.released.borrow().iter().map(|&(_, f)| f).collect();
    released.sort_unstable();
    assert_eq!(released, vec![0, 1, 2, 3]);
}

#[test]
fn duplicate_notification_is_silent() {
    let mut h = Harness::with_limit(15);
    h.deliver(0..5);
    h.tick(2);
    let requests = h.request_count();
    let changes = h.changes.borrow().len();

    h.tick(2);
    assert_eq!(h.request_count(), requests);
    assert_eq!(h.changes.borrow().len(), changes);
}

#[test]
fn observer_sees_each_change_once() {
    let mut h = Harness::with_limit(15);
    h.deliver(0..5);
    let changes = h.changes.borrow().clone();
    let tiers: Vec<_> = changes.iter().map(|c| c.mesh_ready_state).collect();
    assert_eq!(tiers, vec![ReadyState::CurrentData, ReadyState::FutureData]);
    for change in &changes {
        assert_eq!(
            change.ready_state,
            change.mesh_ready_state.combine(change.video_ready_state)
        );
    }
}

#[test]
fn video_readiness_caps_combined_state() {
    let mut h = Harness::with_limit(15);
    h.deliver(0..5);
    h.player.clock_mut().set_ready_state(ReadyState::CurrentData);
    h.player.on_video_data_loaded();

    assert_eq!(h.player.ready_state(), ReadyState::CurrentData);
    let last = *h.changes.borrow().last().unwrap();
    assert_eq!(last.video_ready_state, ReadyState::CurrentData);
    assert_eq!(last.ready_state, ReadyState::CurrentData);
}

#[test]
fn underrun_pauses_and_refill_resumes_playback() {
    let mut h = Harness::new(PlayerOptions {
        autoplay: true,
        ..Default::default()
    });
    assert!(h.player.config().muted);
    assert!(h.player.clock().is_paused());

    h.deliver(0..4);
    assert!(!h.player.clock().is_paused());
    assert!(!h.player.is_buffering());

    h.tick(3);
    assert!(h.player.is_buffering());
    assert!(h.player.clock().is_paused());

    h.deliver([4, 5]);
    assert!(!h.player.is_buffering());
    assert!(!h.player.clock().is_paused());
    assert_eq!(h.player.active_frame(), Some(3));
}

#[test]
fn buffering_without_autoplay_stays_paused() {
    let mut h = Harness::with_limit(15);
    let plays = h.player.clock().play_calls();
    h.deliver(0..5);
    assert!(!h.player.is_buffering());
    assert!(h.player.clock().is_paused());
    assert_eq!(h.player.clock().play_calls(), plays);
}

#[test]
fn stale_completion_keeps_open_count() {
    let mut h = Harness::with_limit(15);
    h.player.load_clip(&ClipLocator::from("clips/beta")).unwrap();
    assert_eq!(h.player.open_requests(), 15);
    h.deliver([0]);
    assert_eq!(h.player.open_requests(), 15);
    assert!(h.buffered().is_empty());
}

// ── Randomized interleavings ───────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Tick(u64),
    Jump(u64),
    Deliver(usize),
    Fail(usize),
    Reload,
    Video(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u64..4).prop_map(Op::Tick),
        1 => (0u64..80).prop_map(Op::Jump),
        6 => any::<usize>().prop_map(Op::Deliver),
        1 => any::<usize>().prop_map(Op::Fail),
        1 => Just(Op::Reload),
        1 => (0u8..4).prop_map(Op::Video),
    ]
}

fn ready_state(level: u8) -> ReadyState {
    match level {
        0 => ReadyState::Nothing,
        1 => ReadyState::CurrentData,
        2 => ReadyState::FutureData,
        _ => ReadyState::EnoughData,
    }
}

fn pick_pending(h: &Harness, index: usize) -> Option<FrameIndex> {
    let pending: Vec<_> = h.player.loader().pending().map(|r| r.frame).collect();
    (!pending.is_empty()).then(|| pending[index % pending.len()])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn invariants_hold_under_any_interleaving(ops in prop::collection::vec(op(), 1..120)) {
        let limit = 6;
        let mut h = Harness::with_limit(limit);
        let mut reloads = 0u32;

        for op in ops {
            let before = h.player.last_requested_frame();
            let current = h.player.current_frame();
            let mut may_rewind = false;

            match op {
                Op::Tick(step) => h.tick(current + step),
                Op::Jump(frame) => {
                    may_rewind = frame < current;
                    h.tick(frame);
                }
                Op::Deliver(index) => {
                    if let Some(frame) = pick_pending(&h, index) {
                        h.deliver([frame]);
                    }
                }
                Op::Fail(index) => {
                    if let Some(frame) = pick_pending(&h, index) {
                        h.fail(frame);
                    }
                }
                Op::Reload => {
                    reloads += 1;
                    may_rewind = true;
                    let clip = if reloads % 2 == 0 { "clips/alpha" } else { "clips/beta" };
                    h.player.load_clip(&ClipLocator::from(clip)).unwrap();
                }
                Op::Video(level) => {
                    h.player.clock_mut().set_ready_state(ready_state(level));
                    h.player.on_video_data_loaded();
                }
            }

            let p = &h.player;
            prop_assert!(p.open_requests() <= limit);
            prop_assert_eq!(
                p.ready_state(),
                p.mesh_ready_state().combine(p.video_ready_state())
            );
            prop_assert!(p.buffered_frames().all(|f| f < p.max_frames()));
            if !may_rewind {
                prop_assert!(p.last_requested_frame() >= before);
            }
            if let Some(active) = p.active_geometry() {
                prop_assert_eq!(active.generation, p.generation());
                prop_assert_eq!(Some(active.frame), p.active_frame());
            }
        }
    }
}
