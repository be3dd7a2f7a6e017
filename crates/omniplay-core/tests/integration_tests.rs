//! Integration tests for Omniplay Core
//!
//! Every test drives a [`MediaElement`] over the scripted backends in
//! `omniplay_core::sim`.

use omniplay_core::{
    backend::{ElementEvent, HlsEvent, VimeoEvent},
    sim::{SimBackends, SimScript},
    BackendKind, CanPlay, Error, ErrorKind, EventHub, EventType, Listener, MediaConfig,
    MediaElement, MediaEvent, NativeLevel, NetworkState, Quality, ReadyState, SessionPhase,
};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::broadcast;
use tokio_test::{assert_err, assert_ok};

// ============================================================================
// Helpers
// ============================================================================

fn element(sim: &SimBackends) -> MediaElement {
    MediaElement::with_hub(MediaConfig::default(), sim.activator(), Arc::new(EventHub::new()))
}

fn drain(rx: &mut broadcast::Receiver<MediaEvent>) -> Vec<MediaEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn types(rx: &mut broadcast::Receiver<MediaEvent>) -> Vec<EventType> {
    drain(rx).into_iter().map(|e| e.event).collect()
}

fn count(events: &[EventType], event: EventType) -> usize {
    events.iter().filter(|e| **e == event).count()
}

async fn loaded(sim: &SimBackends, src: &str) -> MediaElement {
    let el = element(sim);
    el.set_src(src).await.unwrap();
    el.process_signals().await;
    el
}

// ============================================================================
// Resolution and fallback
// ============================================================================

#[tokio::test]
async fn test_fallback_walks_to_native() {
    let sim = SimBackends::new();
    sim.fail_playback(BackendKind::Dash, "27");
    sim.fail_playback(BackendKind::Hls, "networkError");

    let el = element(&sim);
    let mut rx = el.subscribe().unwrap();
    el.set_src("a.mpd|b.m3u8|c.mp4").await.unwrap();
    el.process_signals().await;

    assert_eq!(el.active_backend(), Some(BackendKind::Native));
    assert_eq!(el.current_src(), "c.mp4");
    assert!(el.error().is_none());
    assert_eq!(el.ready_state(), ReadyState::HaveEnoughData);

    let attempts = el.attempts();
    let backends: Vec<_> = attempts.iter().map(|a| a.backend).collect();
    assert_eq!(
        backends,
        vec![BackendKind::Dash, BackendKind::Hls, BackendKind::Native]
    );
    assert_eq!(attempts[0].failure, Some(ErrorKind::NetworkError));
    assert_eq!(attempts[1].failure, Some(ErrorKind::NetworkError));
    assert_eq!(attempts[2].failure, None);

    let events = types(&mut rx);
    assert_eq!(count(&events, EventType::Error), 0);
    assert_eq!(count(&events, EventType::LoadedMetadata), 1);
}

#[tokio::test]
async fn test_exhausted_plan_reports_source_not_supported() {
    let sim = SimBackends::new();
    sim.fail_playback(BackendKind::Dash, "27");
    sim.fail_playback(BackendKind::Native, "2");

    let el = element(&sim);
    let mut rx = el.subscribe().unwrap();
    el.set_src("a.mpd|c.mp4").await.unwrap();
    el.process_signals().await;

    let error = el.error().expect("terminal error");
    assert_eq!(error.kind, ErrorKind::SourceNotSupported);
    assert_eq!(error.code(), 4);
    assert_eq!(el.phase(), SessionPhase::Errored);
    assert_eq!(el.network_state(), NetworkState::NoSource);
    assert_eq!(el.active_backend(), None);

    let events = types(&mut rx);
    assert_eq!(count(&events, EventType::Error), 1);
    assert!(matches!(el.play(), Err(Error::InvalidState(_))));
}

#[tokio::test]
async fn test_every_backend_failing_ends_in_one_error() {
    let sim = SimBackends::new();
    sim.fail_playback(BackendKind::Dash, "27");
    sim.fail_playback(BackendKind::Hls, "networkError");
    sim.fail_playback(BackendKind::Native, "2");

    let el = element(&sim);
    let mut rx = el.subscribe().unwrap();
    el.set_src("a.mpd|b.m3u8|c.mp4").await.unwrap();
    el.process_signals().await;

    assert_eq!(el.error().map(|e| e.kind), Some(ErrorKind::SourceNotSupported));
    assert_eq!(el.phase(), SessionPhase::Errored);

    let attempts = el.attempts();
    let backends: Vec<_> = attempts.iter().map(|a| a.backend).collect();
    assert_eq!(
        backends,
        vec![BackendKind::Dash, BackendKind::Hls, BackendKind::Native]
    );
    assert!(attempts.iter().all(|a| a.failure == Some(ErrorKind::NetworkError)));
    for kind in [BackendKind::Dash, BackendKind::Hls, BackendKind::Native] {
        assert_eq!(sim.load_count(kind), 1, "{} runtime", kind);
    }

    let events = types(&mut rx);
    assert_eq!(count(&events, EventType::Error), 1);
    assert_eq!(events.last(), Some(&EventType::Error));
}

#[tokio::test]
async fn test_audio_element_classifies_audio_candidates() {
    let sim = SimBackends::new();
    let el = MediaElement::with_hub(MediaConfig::audio(), sim.activator(), Arc::new(EventHub::new()));

    el.set_src("song.mp3|clip.mp4").await.unwrap();
    el.process_signals().await;

    assert_eq!(el.active_backend(), Some(BackendKind::Native));
    assert_eq!(el.current_src(), "song.mp3");
}

#[tokio::test]
async fn test_unsupported_source_fails_without_loading() {
    let sim = SimBackends::new();
    let el = element(&sim);
    let mut rx = el.subscribe().unwrap();

    el.set_src("notes.txt|readme").await.unwrap();

    assert_eq!(el.error().map(|e| e.kind), Some(ErrorKind::SourceNotSupported));
    assert_eq!(types(&mut rx), vec![EventType::Error]);
    for kind in BackendKind::ALL {
        assert_eq!(sim.load_count(kind), 0);
    }
}

#[tokio::test]
async fn test_runtime_load_failure_falls_back() {
    let sim = SimBackends::new();
    sim.fail_load(BackendKind::Dash);

    let el = loaded(&sim, "a.mpd|a.mp4").await;

    assert_eq!(el.active_backend(), Some(BackendKind::Native));
    assert_eq!(el.attempts()[0].failure, Some(ErrorKind::NetworkError));
}

#[tokio::test]
async fn test_unregistered_backend_is_skipped() {
    let sim = SimBackends::new();
    let activator = sim.activator_for(&[BackendKind::Native]);
    let el = MediaElement::with_hub(MediaConfig::default(), activator, Arc::new(EventHub::new()));

    el.set_src("a.mpd|a.mp4").await.unwrap();
    el.process_signals().await;

    assert_eq!(el.active_backend(), Some(BackendKind::Native));
    assert_eq!(el.attempts().len(), 1);
    assert_eq!(sim.load_count(BackendKind::Dash), 0);
}

#[tokio::test]
async fn test_native_hls_path() {
    let sim = SimBackends::new();
    sim.set_unsupported(BackendKind::Hls);
    sim.set_native_hls(true);

    let el = loaded(&sim, "live.m3u8").await;

    assert_eq!(el.active_backend(), Some(BackendKind::Native));
    assert_eq!(el.current_src(), "live.m3u8");
    assert!(sim
        .calls_for(BackendKind::Native)
        .contains(&"set_src(live.m3u8, application/vnd.apple.mpegurl)".to_string()));
    assert!(el.qualities().is_empty());
}

#[tokio::test]
async fn test_hls_without_any_runtime_fails() {
    let sim = SimBackends::new();
    sim.set_unsupported(BackendKind::Hls);

    let el = loaded(&sim, "live.m3u8").await;

    assert_eq!(el.error().map(|e| e.kind), Some(ErrorKind::SourceNotSupported));
    assert_eq!(el.active_backend(), None);
}

#[tokio::test]
async fn test_mount_point_is_reused_across_attempts() {
    let sim = SimBackends::new();
    sim.fail_playback(BackendKind::Dash, "27");

    let el = loaded(&sim, "a.mpd|a.mp4").await;

    let creates: Vec<_> = sim
        .calls()
        .into_iter()
        .filter(|c| c.call.starts_with("create("))
        .map(|c| c.call)
        .collect();
    assert_eq!(creates.len(), 2);
    assert_eq!(creates[0], creates[1]);
    assert_eq!(creates[0], format!("create({})", el.mount_id()));
    assert!(sim.calls_for(BackendKind::Dash).contains(&"reset".to_string()));
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn test_stale_activation_is_dropped() {
    let sim = SimBackends::new();
    sim.hold(BackendKind::Dash);

    let el = Arc::new(element(&sim));
    let first = tokio::spawn({
        let el = el.clone();
        async move { el.set_src("a.mpd").await }
    });
    while sim.load_count(BackendKind::Dash) == 0 {
        tokio::task::yield_now().await;
    }

    el.set_src("b.mp4").await.unwrap();
    el.process_signals().await;
    sim.release(BackendKind::Dash);
    first.await.unwrap().unwrap();
    el.process_signals().await;

    assert_eq!(el.active_backend(), Some(BackendKind::Native));
    assert_eq!(el.current_src(), "b.mp4");
    assert_eq!(el.src(), "b.mp4");
    assert!(sim.calls_for(BackendKind::Dash).is_empty());
    assert_eq!(el.ready_state(), ReadyState::HaveEnoughData);
}

#[tokio::test]
async fn test_shared_activator_loads_once() {
    let sim = SimBackends::new();
    let activator = sim.activator();
    let a = MediaElement::with_hub(MediaConfig::default(), activator.clone(), Arc::new(EventHub::new()));
    let b = MediaElement::with_hub(MediaConfig::default(), activator, Arc::new(EventHub::new()));

    let (ra, rb) = tokio::join!(a.set_src("a.mpd"), b.set_src("b.mpd"));
    ra.unwrap();
    rb.unwrap();
    a.process_signals().await;
    b.process_signals().await;

    assert_eq!(sim.load_count(BackendKind::Dash), 1);
    assert_eq!(a.active_backend(), Some(BackendKind::Dash));
    assert_eq!(b.active_backend(), Some(BackendKind::Dash));
    assert_ne!(a.mount_id(), b.mount_id());
}

#[tokio::test]
async fn test_signals_from_replaced_session_are_ignored() {
    let sim = SimBackends::with_script(SimScript::manual());
    let el = element(&sim);

    el.set_src("a.mp4").await.unwrap();
    el.set_src("https://vimeo.com/1").await.unwrap();
    let mut rx = el.subscribe().unwrap();

    assert!(sim.inject(BackendKind::Native, ElementEvent::Ended));
    assert_eq!(el.process_signals().await, 1);

    assert!(!el.ended());
    assert!(types(&mut rx).is_empty());
    assert!(sim.calls_for(BackendKind::Native).contains(&"remove".to_string()));
}

// ============================================================================
// Readiness and events
// ============================================================================

#[tokio::test]
async fn test_ready_sequence_is_canonical() {
    let sim = SimBackends::new();
    let el = element(&sim);
    let mut rx = el.subscribe().unwrap();

    el.set_src("only.mp4").await.unwrap();
    el.process_signals().await;

    let events = drain(&mut rx);
    let kinds: Vec<_> = events.iter().map(|e| e.event).collect();
    assert_eq!(
        kinds,
        vec![
            EventType::LoadStart,
            EventType::DurationChange,
            EventType::LoadedMetadata,
            EventType::LoadedData,
            EventType::CanPlay,
            EventType::CanPlayThrough,
            EventType::Progress,
        ]
    );

    let metadata = &events[2];
    assert_eq!(metadata.state.ready_state, ReadyState::HaveMetadata);
    assert_eq!(metadata.state.duration, 60.0);
    assert!(events.windows(2).all(|w| w[0].sequence < w[1].sequence));
    assert_eq!(el.phase(), SessionPhase::Playable);
}

#[tokio::test]
async fn test_readiness_waits_for_duration() {
    let sim = SimBackends::with_script(SimScript::manual());
    let el = element(&sim);
    el.set_src("a.mp4").await.unwrap();
    let mut rx = el.subscribe().unwrap();

    sim.inject(BackendKind::Native, ElementEvent::CanPlay);
    el.process_signals().await;
    assert_eq!(el.ready_state(), ReadyState::HaveNothing);
    assert!(types(&mut rx).is_empty());

    sim.inject(BackendKind::Native, ElementEvent::LoadedMetadata { duration: 30.0 });
    el.process_signals().await;
    assert_eq!(
        types(&mut rx),
        vec![
            EventType::DurationChange,
            EventType::LoadedMetadata,
            EventType::LoadedData,
            EventType::CanPlay,
        ]
    );
    assert_eq!(el.ready_state(), ReadyState::HaveFutureData);
}

#[tokio::test]
async fn test_listener_reentry_keeps_order() {
    let sim = SimBackends::new();
    let el = Arc::new(element(&sim));
    let weak: Weak<MediaElement> = Arc::downgrade(&el);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let on_canplay: Listener = {
        let seen = seen.clone();
        Arc::new(move |event: &MediaEvent| {
            seen.lock().unwrap().push(event.event);
            if let Some(el) = weak.upgrade() {
                assert!(el.ready_state() >= ReadyState::HaveFutureData);
                el.play().unwrap();
            }
        })
    };
    let on_play: Listener = {
        let seen = seen.clone();
        Arc::new(move |event: &MediaEvent| seen.lock().unwrap().push(event.event))
    };
    assert!(el.add_event_listener(EventType::CanPlay, on_canplay.clone()));
    assert!(!el.add_event_listener(EventType::CanPlay, on_canplay.clone()));
    assert!(el.add_event_listener(EventType::Play, on_play));

    el.set_src("only.mp4").await.unwrap();
    el.process_signals().await;

    assert!(!el.paused());
    assert_eq!(el.phase(), SessionPhase::Playing);
    assert_eq!(*seen.lock().unwrap(), vec![EventType::CanPlay, EventType::Play]);

    assert!(el.remove_event_listener(EventType::CanPlay, &on_canplay));
    assert!(!el.remove_event_listener(EventType::CanPlay, &on_canplay));
}

#[tokio::test]
async fn test_namespaces_are_isolated() {
    let sim = SimBackends::new();
    let hub = Arc::new(EventHub::new());
    let a = MediaElement::with_hub(MediaConfig::default(), sim.activator(), hub.clone());
    let b = MediaElement::with_hub(MediaConfig::default(), sim.activator(), hub);
    assert_ne!(a.namespace(), b.namespace());

    let mut rx_b = b.subscribe().unwrap();
    a.set_src("only.mp4").await.unwrap();
    a.process_signals().await;

    assert!(types(&mut rx_b).is_empty());
}

// ============================================================================
// Playback
// ============================================================================

#[tokio::test]
async fn test_play_before_playable_is_deferred() {
    let sim = SimBackends::new();
    let el = element(&sim);

    el.set_src("only.mp4").await.unwrap();
    el.play().unwrap();
    assert!(el.paused());

    el.process_signals().await;
    assert!(!el.paused());
    assert_eq!(el.phase(), SessionPhase::Playing);
    assert_eq!(count_calls(&sim, BackendKind::Native, "play"), 1);
}

fn count_calls(sim: &SimBackends, kind: BackendKind, call: &str) -> usize {
    sim.calls_for(kind).iter().filter(|c| *c == call).count()
}

#[tokio::test]
async fn test_autoplay_starts_when_playable() {
    let sim = SimBackends::new();
    let config = MediaConfig {
        autoplay: true,
        ..Default::default()
    };
    let el = MediaElement::with_hub(config, sim.activator(), Arc::new(EventHub::new()));
    let mut rx = el.subscribe().unwrap();

    el.set_src("a.mpd").await.unwrap();
    el.process_signals().await;

    let events = types(&mut rx);
    let canplay = events.iter().position(|e| *e == EventType::CanPlay).unwrap();
    let play = events.iter().position(|e| *e == EventType::Play).unwrap();
    assert!(canplay < play);
    assert_eq!(count(&events, EventType::Playing), 1);
    assert!(!el.paused());
}

#[tokio::test]
async fn test_pause_acknowledged_by_backend() {
    let sim = SimBackends::new();
    let el = loaded(&sim, "only.mp4").await;

    el.play().unwrap();
    el.process_signals().await;
    el.pause().unwrap();
    assert!(!el.paused());

    el.process_signals().await;
    assert!(el.paused());
    assert_eq!(el.phase(), SessionPhase::Paused);
}

#[tokio::test]
async fn test_seek_sequence() {
    let sim = SimBackends::new();
    let el = loaded(&sim, "only.mp4").await;
    let mut rx = el.subscribe().unwrap();

    el.set_current_time(10.0).unwrap();
    assert!(el.seeking());
    el.process_signals().await;

    assert_eq!(
        types(&mut rx),
        vec![
            EventType::Seeking,
            EventType::TimeUpdate,
            EventType::Seeked,
            EventType::CanPlay,
            EventType::CanPlayThrough,
        ]
    );
    assert!(!el.seeking());
    assert_eq!(el.current_time(), 10.0);
}

#[tokio::test]
async fn test_second_seek_supersedes_the_first() {
    let sim = SimBackends::new();
    let el = loaded(&sim, "only.mp4").await;
    let mut rx = el.subscribe().unwrap();

    el.set_current_time(10.0).unwrap();
    el.set_current_time(20.0).unwrap();
    assert!(el.seeking());
    el.process_signals().await;

    assert_eq!(
        types(&mut rx),
        vec![
            EventType::Seeking,
            EventType::TimeUpdate,
            EventType::Seeked,
            EventType::CanPlay,
            EventType::CanPlayThrough,
        ]
    );
    assert!(!el.seeking());
    assert_eq!(el.current_time(), 20.0);
}

#[tokio::test]
async fn test_buffered_index_out_of_range() {
    let sim = SimBackends::new();
    let idle = element(&sim);
    assert!(matches!(
        idle.buffered().start(0),
        Err(Error::IndexSize { index: 0, length: 0 })
    ));

    let el = loaded(&sim, "only.mp4").await;
    let ranges = el.buffered();
    assert_eq!(ranges.len(), 1);
    assert_eq!(assert_ok!(ranges.end(0)), 60.0);
    assert!(matches!(ranges.start(1), Err(Error::IndexSize { index: 1, length: 1 })));
    assert!(matches!(ranges.end(3), Err(Error::IndexSize { index: 3, length: 1 })));
}

#[tokio::test]
async fn test_seek_arguments_are_validated() {
    let sim = SimBackends::new();
    let el = element(&sim);
    assert!(matches!(el.set_current_time(5.0), Err(Error::InvalidState(_))));

    el.set_src("only.mp4").await.unwrap();
    el.process_signals().await;
    assert!(matches!(el.set_current_time(f64::NAN), Err(Error::InvalidArgument(_))));
    assert!(matches!(el.set_current_time(-1.0), Err(Error::InvalidArgument(_))));

    el.set_current_time(500.0).unwrap();
    el.process_signals().await;
    assert_eq!(el.current_time(), 60.0);
}

#[tokio::test]
async fn test_start_offset_applied_to_streams() {
    let sim = SimBackends::new();
    let el = loaded(&sim, "stream.m3u8#t=12").await;

    let calls = sim.calls_for(BackendKind::Hls);
    assert!(calls.contains(&"load_source(stream.m3u8)".to_string()));
    assert!(calls.contains(&"set_current_time(12)".to_string()));
    assert_eq!(el.current_time(), 12.0);
    assert_eq!(el.current_src(), "stream.m3u8#t=12");
}

#[tokio::test]
async fn test_abort_while_paused_is_ignored() {
    let sim = SimBackends::with_script(SimScript::manual());
    let el = element(&sim);
    el.set_src("a.mp4").await.unwrap();

    sim.inject(BackendKind::Native, ElementEvent::LoadedMetadata { duration: 30.0 });
    sim.inject(BackendKind::Native, ElementEvent::CanPlayThrough);
    el.process_signals().await;

    let abort = || ElementEvent::Error {
        code: 1,
        message: "aborted".into(),
    };
    sim.inject(BackendKind::Native, abort());
    el.process_signals().await;
    assert!(el.error().is_none());

    el.play().unwrap();
    sim.inject(BackendKind::Native, ElementEvent::Play);
    sim.inject(BackendKind::Native, ElementEvent::Playing);
    el.process_signals().await;
    assert!(!el.paused());

    sim.inject(BackendKind::Native, abort());
    el.process_signals().await;
    assert_eq!(el.error().map(|e| e.kind), Some(ErrorKind::PlaybackAborted));
    assert_eq!(el.phase(), SessionPhase::Errored);
}

#[tokio::test]
async fn test_vr360_play_is_optimistic() {
    let sim = SimBackends::new();
    let el = loaded(&sim, "vr360://cdn.example.com/tour.mp4").await;

    assert_eq!(el.active_backend(), Some(BackendKind::Vr360));
    assert!(sim
        .calls_for(BackendKind::Vr360)
        .contains(&"load(https://cdn.example.com/tour.mp4)".to_string()));

    el.play().unwrap();
    assert!(!el.paused());
    el.set_current_time(20.0).unwrap();
    assert!(!el.seeking());
    assert_eq!(el.current_time(), 20.0);
}

// ============================================================================
// Vimeo
// ============================================================================

#[tokio::test]
async fn test_vimeo_query_autoplay() {
    let sim = SimBackends::new();
    let el = loaded(&sim, "https://player.vimeo.com/video/42?autoplay=1").await;

    assert!(el.autoplay());
    assert!(!el.paused());
    assert!(sim.calls_for(BackendKind::Vimeo).contains(&"load_video(42)".to_string()));
}

#[tokio::test]
async fn test_vimeo_loop_restarts_on_end() {
    let sim = SimBackends::new();
    let config = MediaConfig {
        looping: true,
        ..Default::default()
    };
    let el = MediaElement::with_hub(config, sim.activator(), Arc::new(EventHub::new()));
    el.set_src("https://vimeo.com/76979871").await.unwrap();
    el.process_signals().await;
    el.play().unwrap();
    el.process_signals().await;
    let mut rx = el.subscribe().unwrap();

    sim.inject(BackendKind::Vimeo, VimeoEvent::Ended);
    el.process_signals().await;

    let events = types(&mut rx);
    assert_eq!(count(&events, EventType::Ended), 0);
    assert!(!el.ended());
    assert_eq!(el.current_time(), 0.0);
}

// ============================================================================
// Volume
// ============================================================================

#[tokio::test]
async fn test_out_of_range_volume_is_rejected() {
    let sim = SimBackends::new();
    let el = loaded(&sim, "only.mp4").await;
    assert_ok!(el.set_volume(0.5));
    let mut rx = el.subscribe().unwrap();

    assert!(matches!(el.set_volume(1.5), Err(Error::InvalidArgument(_))));
    assert_err!(el.set_volume(-0.1));
    assert_err!(el.set_volume(f64::NAN));
    el.process_signals().await;

    assert_eq!(el.volume(), 0.5);
    assert!(types(&mut rx).is_empty());
}

#[tokio::test]
async fn test_vimeo_mute_round_trip_keeps_volume() {
    let sim = SimBackends::new();
    let el = loaded(&sim, "https://vimeo.com/76979871").await;

    el.set_volume(0.37).unwrap();
    el.set_muted(true).unwrap();
    el.process_signals().await;
    assert!(el.muted());
    assert_eq!(el.volume(), 0.37);

    el.set_muted(false).unwrap();
    el.process_signals().await;
    assert!(!el.muted());
    assert_eq!(el.volume(), 0.37);

    let calls = sim.calls_for(BackendKind::Vimeo);
    assert_eq!(calls.last().map(String::as_str), Some("set_volume(0.37)"));
    assert!(calls.contains(&"set_volume(0)".to_string()));
}

#[tokio::test]
async fn test_vimeo_late_echoes_do_not_reach_host() {
    let sim = SimBackends::new();
    let el = loaded(&sim, "https://vimeo.com/76979871").await;
    let mut rx = el.subscribe().unwrap();

    el.set_volume(0.37).unwrap();
    el.set_muted(true).unwrap();
    el.set_muted(false).unwrap();
    el.process_signals().await;

    let changes: Vec<(f64, bool)> = drain(&mut rx)
        .into_iter()
        .filter(|e| e.event == EventType::VolumeChange)
        .map(|e| (e.state.volume, e.state.muted))
        .collect();
    assert_eq!(changes, vec![(0.37, false), (0.37, true), (0.37, false)]);
    assert_eq!(el.volume(), 0.37);
    assert!(!el.muted());
}

#[tokio::test]
async fn test_volume_survives_source_change() {
    let sim = SimBackends::new();
    let el = loaded(&sim, "only.mp4").await;
    el.set_volume(0.25).unwrap();
    el.set_muted(true).unwrap();

    el.set_src("a.mpd").await.unwrap();
    el.process_signals().await;

    assert_eq!(el.volume(), 0.25);
    assert!(el.muted());
}

// ============================================================================
// Quality
// ============================================================================

#[tokio::test]
async fn test_hls_quality_table() {
    let sim = SimBackends::new();
    let el = element(&sim);
    let mut rx = el.subscribe().unwrap();
    el.set_src("stream.m3u8").await.unwrap();
    el.process_signals().await;

    let events = types(&mut rx);
    let metadata = events.iter().position(|e| *e == EventType::LoadedMetadata).unwrap();
    let bitrates = events.iter().position(|e| *e == EventType::BitrateLoaded).unwrap();
    assert!(metadata < bitrates);
    assert_eq!(count(&events, EventType::BitrateLoaded), 1);

    let table = el.qualities();
    let labels: Vec<_> = table.levels().iter().map(|l| l.label.as_str()).collect();
    assert_eq!(labels, vec!["360p", "720p", "1080p", "auto"]);
    assert_eq!(el.quality(), Quality::Auto);

    el.set_quality(Quality::Level(2)).unwrap();
    assert_eq!(el.quality(), Quality::Level(2));
    el.set_quality(Quality::Auto).unwrap();
    assert!(matches!(el.set_quality(Quality::Level(9)), Err(Error::InvalidArgument(_))));

    let calls = sim.calls_for(BackendKind::Hls);
    assert!(calls.contains(&"set_current_level(2)".to_string()));
    assert_eq!(calls.last().map(String::as_str), Some("set_current_level(-1)"));
}

#[tokio::test]
async fn test_dash_quality_selection() {
    let sim = SimBackends::new();
    let el = loaded(&sim, "a.mpd").await;
    assert_eq!(el.qualities().len(), 4);

    sim.clear_calls();
    el.set_quality(Quality::Level(1)).unwrap();
    el.set_quality(Quality::Auto).unwrap();

    assert_eq!(
        sim.calls_for(BackendKind::Dash),
        vec![
            "set_auto_switch_quality(false)".to_string(),
            "set_quality_for(1)".to_string(),
            "set_auto_switch_quality(true)".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_withdrawn_level_returns_to_auto() {
    let sim = SimBackends::new();
    let el = loaded(&sim, "a.m3u8").await;
    el.set_quality(Quality::Level(2)).unwrap();
    el.process_signals().await;
    let mut rx = el.subscribe().unwrap();
    sim.clear_calls();

    let levels = vec![
        NativeLevel::new(0).with_resolution(640, 360).with_bitrate(800_000),
        NativeLevel::new(1).with_resolution(1280, 720).with_bitrate(2_500_000),
    ];
    assert!(sim.inject(BackendKind::Hls, HlsEvent::ManifestParsed { levels }));
    assert!(sim.inject(
        BackendKind::Hls,
        HlsEvent::Media(ElementEvent::TimeUpdate { current_time: 1.0 })
    ));
    el.process_signals().await;

    let table = el.qualities();
    let labels: Vec<_> = table.levels().iter().map(|l| l.label.as_str()).collect();
    assert_eq!(labels, vec!["360p", "720p", "auto"]);
    assert_eq!(el.quality(), Quality::Auto);
    assert!(table.contains(el.quality()));
    assert_eq!(
        sim.calls_for(BackendKind::Hls),
        vec!["set_current_level(-1)".to_string()]
    );
    assert_eq!(count(&types(&mut rx), EventType::BitrateLoaded), 1);
}

#[tokio::test]
async fn test_native_has_no_quality_levels() {
    let sim = SimBackends::new();
    let el = loaded(&sim, "only.mp4").await;

    assert!(el.qualities().is_empty());
    el.set_quality(Quality::Level(3)).unwrap();
    assert_eq!(el.quality(), Quality::Auto);
}

// ============================================================================
// Probing and lifecycle
// ============================================================================

#[tokio::test]
async fn test_can_play_src_is_side_effect_free() {
    let sim = SimBackends::new();
    let el = element(&sim);
    let mut rx = el.subscribe().unwrap();

    for _ in 0..3 {
        assert_eq!(el.can_play_src("a.mpd|x.txt"), CanPlay::Probably);
        assert_eq!(el.can_play_src("x.txt|y"), CanPlay::No);
    }

    assert_eq!(el.src(), "");
    assert_eq!(el.phase(), SessionPhase::Empty);
    assert!(types(&mut rx).is_empty());
    assert!(sim.calls().is_empty());
}

#[tokio::test]
async fn test_empty_src_clears_session() {
    let sim = SimBackends::new();
    let el = loaded(&sim, "only.mp4").await;

    el.set_src("").await.unwrap();

    assert_eq!(el.active_backend(), None);
    assert_eq!(el.phase(), SessionPhase::Empty);
    assert!(el.error().is_none());
    assert!(el.duration().is_nan());
}

#[tokio::test]
async fn test_dispose_releases_everything() {
    let sim = SimBackends::new();
    let el = loaded(&sim, "only.mp4").await;

    el.dispose();
    el.dispose();

    assert!(el.is_disposed());
    assert!(el.subscribe().is_none());
    assert!(matches!(el.set_src("a.mp4").await, Err(Error::InvalidState(_))));
    assert_eq!(count_calls(&sim, BackendKind::Native, "remove"), 1);
}

#[tokio::test]
async fn test_phase_watch_follows_session() {
    let sim = SimBackends::new();
    let el = element(&sim);
    let phase = el.subscribe_phase();

    el.set_src("only.mp4").await.unwrap();
    el.process_signals().await;

    assert_eq!(*phase.borrow(), SessionPhase::Playable);
}
