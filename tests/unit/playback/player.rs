use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::*;
use crate::assets::decode::DecodedImage;
use crate::assets::loader::LoadedMedia;
use crate::foundation::error::LyrisyncError;
use crate::playback::clock::ManualClock;
use crate::timeline::model::{LyricSegment, MediaRef, VisualAsset};

#[derive(Default)]
struct CountingLoader {
    calls: AtomicUsize,
}

impl MediaLoader for CountingLoader {
    fn load(&self, media: &MediaRef, kind: MediaKind) -> LyrisyncResult<LoadedMedia> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if media.as_str().starts_with("missing") || kind == MediaKind::Video {
            return Err(LyrisyncError::asset("unavailable"));
        }
        Ok(LoadedMedia::Image(Arc::new(DecodedImage {
            width: 2,
            height: 2,
            rgba8_premul: Arc::new(vec![255; 16]),
        })))
    }
}

fn project() -> Project {
    Project {
        title: "Night Drive".into(),
        segments: vec![
            LyricSegment::new(2.0, 4.0, "first line"),
            LyricSegment::new(4.0, 6.0, "second line"),
        ],
        assets: vec![
            VisualAsset::image(0.0, "a.png"),
            VisualAsset::image(3.0, "b.png"),
            VisualAsset::image(5.0, "c.png"),
        ],
        ..Project::default()
    }
}

fn player(loader: Arc<CountingLoader>, preload: bool) -> Player {
    Player::new(
        &project(),
        loader,
        TextLayoutEngine::new(),
        PlayerOpts {
            video_cache_capacity: 4,
            preload,
        },
    )
}

#[test]
fn start_preloads_and_schedules_one_frame() {
    let loader = Arc::new(CountingLoader::default());
    let mut p = player(loader.clone(), true);
    let mut clock = ManualClock::new(10.0);
    p.start(&mut clock);
    assert!(clock.is_playing());
    assert!(p.is_running());
    assert_eq!(p.cache().len(), 3);
}

#[test]
fn lazy_player_requests_active_and_next_asset_only() {
    let loader = Arc::new(CountingLoader::default());
    let mut p = player(loader, false);
    p.plan_at(0.5);
    assert_eq!(p.cache().len(), 2);
    assert!(p.cache().get(&MediaRef::new("a.png")).is_some());
    assert!(p.cache().get(&MediaRef::new("b.png")).is_some());
    assert!(p.cache().get(&MediaRef::new("c.png")).is_none());
}

#[test]
fn before_first_asset_prefetches_the_first_one() {
    let mut proj = project();
    proj.assets = vec![VisualAsset::image(3.0, "late.png")];
    let mut p = Player::new(
        &proj,
        Arc::new(CountingLoader::default()),
        TextLayoutEngine::new(),
        PlayerOpts::default(),
    );
    p.plan_at(0.0);
    assert!(p.cache().get(&MediaRef::new("late.png")).is_some());
}

#[test]
fn frames_keep_coming_while_playing_and_stop_at_end() {
    let mut p = player(Arc::new(CountingLoader::default()), true);
    let mut clock = ManualClock::new(0.5);
    p.start(&mut clock);

    let frame = p.on_frame(&clock).unwrap().expect("scheduled frame");
    assert_eq!((frame.width, frame.height), (1920, 1080));
    assert!(p.is_running());

    clock.advance(1.0);
    assert!(!clock.is_playing());
    assert!(p.on_frame(&clock).unwrap().is_some());
    assert!(!p.is_running());
    assert!(p.on_frame(&clock).unwrap().is_none());
}

#[test]
fn stop_cancels_pending_frame() {
    let mut p = player(Arc::new(CountingLoader::default()), false);
    let mut clock = ManualClock::new(10.0);
    p.start(&mut clock);
    p.stop(&mut clock);
    assert!(!clock.is_playing());
    assert!(!p.is_running());
    assert!(p.on_frame(&clock).unwrap().is_none());
}

#[test]
fn teardown_releases_everything_and_is_idempotent() {
    let mut p = player(Arc::new(CountingLoader::default()), true);
    let mut clock = ManualClock::new(10.0);
    p.start(&mut clock);
    p.teardown();
    p.teardown();
    assert!(!p.is_running());
    assert!(p.cache().is_empty());
    assert!(p.on_frame(&clock).unwrap().is_none());
}

#[test]
fn failed_assets_render_black_and_can_be_retried() {
    let loader = Arc::new(CountingLoader::default());
    let mut proj = project();
    proj.assets = vec![VisualAsset::image(0.0, "missing.png")];
    let mut p = Player::new(&proj, loader.clone(), TextLayoutEngine::new(), PlayerOpts::default());
    p.plan_at(0.0);
    assert!(p.cache_mut().wait_idle(Duration::from_secs(5)));

    let plan = p.plan_at(0.1);
    assert!(plan.background().is_none());
    assert_eq!(loader.calls.load(Ordering::SeqCst), 1);

    assert!(p.cache_mut().retry(&MediaRef::new("missing.png")));
    assert!(p.cache_mut().wait_idle(Duration::from_secs(5)));
    assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn seeking_back_replays_the_intro() {
    let mut p = player(Arc::new(CountingLoader::default()), true);
    let mut clock = ManualClock::new(10.0);
    let late = p.plan_at(3.0);
    assert_eq!(late.state.active_segment, Some(0));
    p.seek(&mut clock, 0.5);
    let early = p.plan_at(clock.current_time());
    assert!(early.state.intro);
    assert_eq!(early.state.active_segment, None);
}

#[test]
fn same_seed_renders_identical_frames() {
    let mut proj = project();
    proj.style = crate::animation::style::AnimationStyle::Glitch;
    proj.seed = 42;
    proj.assets.clear();
    let mk = || {
        Player::new(
            &proj,
            Arc::new(CountingLoader::default()),
            TextLayoutEngine::new(),
            PlayerOpts::default(),
        )
    };
    let (mut a, mut b) = (mk(), mk());
    for i in 0..20 {
        let t = 2.0 + f64::from(i) * 0.1;
        assert_eq!(a.plan_at(t), b.plan_at(t));
    }
}
