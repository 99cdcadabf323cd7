use std::time::Duration;

use tokio::time::{sleep, sleep_until, Instant};

use crate::config::CrossfadeConfig;
use crate::crossfade::tests::mock::MockFactory;
use crate::crossfade::PlaybackSession;
use crate::error::{AudioError, SessionError};
use crate::logging::AudioEventType;
use crate::models::SlotRole;

fn factory() -> MockFactory {
    let factory = MockFactory::new();
    factory.add_track("a.flac", Duration::from_millis(12_000));
    factory.add_track("b.flac", Duration::from_millis(20_000));
    factory
}

fn session(factory: &MockFactory) -> PlaybackSession<MockFactory> {
    PlaybackSession::new(factory.clone(), CrossfadeConfig::default()).unwrap()
}

async fn at(origin: Instant, millis: u64) {
    sleep_until(origin + Duration::from_millis(millis)).await;
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let config = CrossfadeConfig {
        fade_step_interval_ms: 0,
        ..Default::default()
    };
    assert!(PlaybackSession::new(factory(), config).is_err());
}

#[tokio::test]
async fn test_blank_track_is_invalid_input() {
    let factory = factory();
    let mut session = session(&factory);

    match session.start("a.flac", "  ").await {
        Err(SessionError::InvalidInput { slot, .. }) => assert_eq!(slot, SlotRole::Secondary),
        other => panic!("Expected InvalidInput, got {:?}", other),
    }
    assert_eq!(factory.created_count(), 0);
    assert!(!session.is_active());
    assert!(session.status().await.is_none());
}

#[tokio::test]
async fn test_missing_track_is_invalid_input_and_releases_players() {
    let factory = factory();
    let mut session = session(&factory);

    match session.start("a.flac", "missing.flac").await {
        Err(SessionError::InvalidInput { slot, reason }) => {
            assert_eq!(slot, SlotRole::Secondary);
            assert!(reason.contains("missing.flac"));
        }
        other => panic!("Expected InvalidInput, got {:?}", other),
    }

    assert_eq!(factory.created_count(), 2);
    for player in factory.players() {
        assert_eq!(player.release_calls(), 1);
        assert_eq!(player.start_calls(), 0);
    }
    assert!(!session.is_active());
}

#[tokio::test]
async fn test_undecodable_track_is_decoder_error() {
    let factory = factory();
    factory.add_corrupt_track("bad.flac");
    let mut session = session(&factory);

    match session.start("bad.flac", "b.flac").await {
        Err(SessionError::Decoder { slot, source }) => {
            assert_eq!(slot, SlotRole::Primary);
            assert!(matches!(source, AudioError::Decode(_)));
        }
        other => panic!("Expected Decoder error, got {:?}", other),
    }

    assert_eq!(factory.created_count(), 1);
    assert_eq!(factory.player(0).release_calls(), 1);
    assert!(session.status().await.is_none());
}

#[tokio::test]
async fn test_player_creation_failure_releases_earlier_players() {
    let factory = factory();
    factory.fail_create(Some(SlotRole::Secondary));
    let mut session = session(&factory);

    let result = session.start("a.flac", "b.flac").await;

    assert!(matches!(
        result,
        Err(SessionError::Decoder {
            slot: SlotRole::Secondary,
            source: AudioError::InitializationFailed(_)
        })
    ));
    assert_eq!(factory.created_count(), 1);
    assert_eq!(factory.player(0).release_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_start_plays_primary_and_silences_secondary() {
    let factory = factory();
    let mut session = session(&factory);

    session.start("a.flac", "b.flac").await.unwrap();

    let a = factory.player(0);
    let b = factory.player(1);
    assert_eq!(a.role(), Some(SlotRole::Primary));
    assert_eq!(a.track().unwrap().locator(), "a.flac");
    assert_eq!(a.volumes(), vec![(1.0, 1.0)]);
    assert_eq!(a.start_calls(), 1);
    assert_eq!(b.volumes(), vec![(0.0, 0.0)]);
    assert_eq!(b.start_calls(), 0);

    let status = session.status().await.unwrap();
    assert!(session.is_active());
    assert!(!status.is_fading());
    assert_eq!(status.audible().unwrap().role, SlotRole::Primary);
    assert_eq!(status.slot(SlotRole::Secondary).unwrap().volume, (0.0, 0.0));

    let events = session.logger().get_recent_events(10);
    let loaded = events
        .iter()
        .filter(|e| e.event_type == AudioEventType::TrackLoaded)
        .count();
    assert_eq!(loaded, 2);
    assert_eq!(events.last().unwrap().event_type, AudioEventType::SessionStarted);
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_crossfade_on_default_config() {
    let factory = factory();
    let mut session = session(&factory);
    let origin = Instant::now();
    session.start("a.flac", "b.flac").await.unwrap();
    let a = factory.player(0);
    let b = factory.player(1);

    at(origin, 1_999).await;
    assert!(!session.status().await.unwrap().is_fading());
    assert_eq!(b.start_calls(), 0);

    at(origin, 2_001).await;
    let fade = session.status().await.unwrap().fade.unwrap();
    assert_eq!(fade.fade_out, SlotRole::Primary);
    assert_eq!(fade.fade_in, SlotRole::Secondary);
    assert_eq!(fade.steps_taken, 0);
    assert_eq!(fade.step_count, 40);
    assert_eq!(b.start_calls(), 1);
    assert!(b.is_playing());

    // Last step is due at 2 000 + 40 * 250
    at(origin, 11_999).await;
    assert_eq!(session.status().await.unwrap().fade.unwrap().steps_taken, 39);

    at(origin, 12_001).await;
    let status = session.status().await.unwrap();
    assert!(b.is_playing());
    // B reaches its own window at 12 000, so the next fade may already be pending
    if let Some(next) = status.fade {
        assert_eq!(next.fade_in, SlotRole::Primary);
        assert_eq!(next.steps_taken, 0);
    }

    // Setup write, trigger write, one write per step, clamped end write
    let b_volumes = b.volumes();
    assert_eq!(b_volumes.len(), 2 + 40 + 1);
    assert_eq!(b_volumes[2], (0.0, 0.0));
    assert_eq!(*b_volumes.last().unwrap(), (1.0, 1.0));
    assert_eq!(a.last_volume(), Some((0.0, 0.0)));

    let fade_writes = &b_volumes[2..];
    for pair in fade_writes.windows(2) {
        assert!(pair[1].0 >= pair[0].0);
    }

    let stats = session.logger().get_event_statistics();
    assert_eq!(stats.completed_fades, 1);
    let completed = session
        .logger()
        .get_recent_events(50)
        .into_iter()
        .find(|e| e.event_type == AudioEventType::FadeCompleted)
        .unwrap();
    assert!(completed.details.contains("after 40 steps"));

    session.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_crossfade_cycles_back_to_primary() {
    let factory = factory();
    let mut session = session(&factory);
    let origin = Instant::now();
    session.start("a.flac", "b.flac").await.unwrap();

    // B started at 2 000 and reaches its window at 12 000; the poll at that
    // instant may still see the first fade, the next one cannot
    at(origin, 13_001).await;

    let a = factory.player(0);
    assert_eq!(a.start_calls(), 2);
    assert!(a.is_playing());
    let fade = session.status().await.unwrap().fade.unwrap();
    assert_eq!(fade.fade_out, SlotRole::Secondary);
    assert_eq!(fade.fade_in, SlotRole::Primary);
    assert_eq!(session.logger().get_event_statistics().crossfades, 2);
}

#[tokio::test(start_paused = true)]
async fn test_restart_releases_previous_players_exactly_once() {
    let factory = factory();
    let mut session = session(&factory);

    session.start("a.flac", "b.flac").await.unwrap();
    sleep(Duration::from_millis(2_500)).await;
    session.start("b.flac", "a.flac").await.unwrap();

    assert_eq!(factory.created_count(), 4);
    assert_eq!(factory.player(0).release_calls(), 1);
    assert_eq!(factory.player(1).release_calls(), 1);
    assert_eq!(factory.player(2).release_calls(), 0);
    assert_eq!(factory.player(3).release_calls(), 0);

    let status = session.status().await.unwrap();
    assert!(!status.is_fading());
    assert_eq!(status.slot(SlotRole::Primary).unwrap().track.locator(), "b.flac");

    session.stop().await;
    for player in factory.players() {
        assert_eq!(player.release_calls(), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_invalid_restart_keeps_running_session() {
    let factory = factory();
    let mut session = session(&factory);
    session.start("a.flac", "b.flac").await.unwrap();

    assert!(session.start("", "b.flac").await.is_err());

    assert!(session.is_active());
    assert_eq!(factory.created_count(), 2);
    assert_eq!(factory.player(0).release_calls(), 0);
    assert!(session.status().await.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_stop_twice_is_noop() {
    let factory = factory();
    let mut session = session(&factory);
    session.start("a.flac", "b.flac").await.unwrap();

    session.stop().await;
    session.stop().await;

    assert!(!session.is_active());
    assert!(session.status().await.is_none());
    for player in factory.players() {
        assert_eq!(player.release_calls(), 1);
    }
    assert_eq!(
        session
            .logger()
            .get_recent_events(50)
            .iter()
            .filter(|e| e.event_type == AudioEventType::SessionStopped)
            .count(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_fade_cancels_timer() {
    let factory = factory();
    let mut session = session(&factory);
    let origin = Instant::now();
    session.start("a.flac", "b.flac").await.unwrap();

    at(origin, 3_001).await;
    assert!(session.status().await.unwrap().is_fading());
    session.stop().await;
    let writes = factory.player(1).volumes().len();

    sleep(Duration::from_secs(30)).await;

    assert_eq!(factory.player(1).volumes().len(), writes);
    assert_eq!(factory.player(0).release_calls(), 1);
    assert_eq!(factory.player(1).release_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_fade_in_start_keeps_primary_playing() {
    let factory = factory();
    let mut session = session(&factory);
    session.start("a.flac", "b.flac").await.unwrap();
    factory.player(1).fail_start(true);

    sleep(Duration::from_millis(5_000)).await;

    let status = session.status().await.unwrap();
    assert!(!status.is_fading());
    assert!(status.slot(SlotRole::Secondary).unwrap().faulted);
    assert_eq!(factory.player(0).volumes(), vec![(1.0, 1.0)]);
    assert!(factory.player(0).is_playing());
    assert_eq!(session.logger().get_event_statistics().decode_errors, 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_active_session_releases_players() {
    let factory = factory();
    let mut session = session(&factory);
    session.start("a.flac", "b.flac").await.unwrap();

    drop(session);
    sleep(Duration::from_millis(1)).await;

    for player in factory.players() {
        assert_eq!(player.release_calls(), 1);
    }
}
