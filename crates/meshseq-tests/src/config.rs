//! Integration tests for configuration flowing into the player.

use std::time::Duration;

use meshseq_core::{FrameRate, MeshSeqError, PlayerOptions};
use meshseq_stream::{FrameNotification, GeometryResource, ManualClock, MeshSequencePlayer, RecordingLoader};

struct Blank;

impl GeometryResource for Blank {
    fn release(&mut self) {}
}

type Player = MeshSequencePlayer<ManualClock, RecordingLoader<Blank>>;

fn player_from_json(json: &str) -> Player {
    let config = PlayerOptions::from_json(json).unwrap().validate().unwrap();
    Player::new(config, ManualClock::new(), RecordingLoader::new()).unwrap()
}

#[test]
fn explicit_clip_record_controls_request_urls() {
    let player = player_from_json(
        r#"{
            "clip": {
                "mesh_sequence_path": "seq/hero",
                "file_prefix": "hero_",
                "file_suffix": ".mesh",
                "zero_padding": 4,
                "start_frame": 0
            },
            "max_concurrent_requests": 3,
            "loop": true
        }"#,
    );

    let urls: Vec<_> = player.loader().history().iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        urls,
        vec!["seq/hero/hero_0000.mesh", "seq/hero/hero_0001.mesh", "seq/hero/hero_0002.mesh"]
    );
    assert!(player.clock().settings().looping);
    assert_eq!(player.clock().source(), None);
}

#[test]
fn base_path_loads_video_and_mesh_directory() {
    let player = player_from_json(r#"{ "clip": "static/3T02", "autoplay": true }"#);
    assert_eq!(player.clock().source(), Some("static/3T02.mp4"));
    assert_eq!(player.loader().history()[0].url, "static/3T02/mesh-f00001.drc");

    let settings = player.clock().settings();
    assert!(settings.autoplay);
    assert!(settings.muted);
}

#[test]
fn frame_rate_maps_media_time_to_frames() {
    let mut player = player_from_json(
        r#"{ "clip": "c", "frame_rate": { "numerator": 24, "denominator": 1 } }"#,
    );
    assert_eq!(player.config().frame_rate, FrameRate::FPS_24);

    player.on_video_frame(FrameNotification::at_media_time(1.0));
    assert_eq!(player.current_frame(), 24);
}

#[test]
fn frames_to_buffer_limits_lookahead() {
    let mut player = player_from_json(r#"{ "clip": "c", "frames_to_buffer": 5, "max_concurrent_requests": 8 }"#);
    assert_eq!(player.loader().history().len(), 8);

    for frame in 0..8 {
        player
            .loader_mut()
            .complete(frame, Blank, 1_000, Duration::from_millis(2));
    }
    player.poll_completions();
    // The first two completions leave fewer than three frames buffered and
    // top up; after that requests already run five frames ahead.
    assert_eq!(player.last_requested_frame(), Some(9));
    assert_eq!(player.open_requests(), 2);

    player.on_video_frame(FrameNotification::at_media_time(5.0 / 30.0));
    assert_eq!(player.last_requested_frame(), Some(15));
    assert_eq!(player.open_requests(), 8);
}

#[test]
fn contradictory_length_settings_are_rejected() {
    let err = PlayerOptions::from_json(r#"{ "max_frames": 100, "discover_length": true }"#)
        .unwrap()
        .validate()
        .unwrap_err();
    assert!(matches!(err, MeshSeqError::InvalidConfig(_)));
}

#[test]
fn unknown_option_is_rejected() {
    assert!(PlayerOptions::from_json(r#"{ "clip": "c", "fps": 30 }"#).is_err());
    assert!(PlayerOptions::from_json(r#"{ "clip": { "path": "c" } }"#).is_err());
}
