use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU32, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use openster::error::{ApiError, AuthError, PlaybackError};
use openster::management::{ClientCredentials, TokenSession};
use openster::playback::*;
use openster::spotify::{PlaybackApi, auth::TokenEndpoint};
use openster::types::{Device, PlaybackIntent, PlaybackSnapshot, Token, TokenGrant};
use reqwest::StatusCode;
use tokio::{sync::mpsc, time::Instant};

const TRACK: &str = "4uLU6hMCjMI75M1A2tKUQC";
const OTHER_TRACK: &str = "7GhIk7Il098yCjg4BQjzvb";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    ListDevices,
    Transfer(String, bool),
    Play(String, Option<String>),
    Pause,
    Resume,
}

// Scripted device lists (None = failed poll), then `fallback` forever
#[derive(Default)]
struct FakePlayer {
    scripted: Mutex<VecDeque<Option<Vec<Device>>>>,
    fallback: Mutex<Vec<Device>>,
    calls: Mutex<Vec<Call>>,
    list_delay: Mutex<Duration>,
    fail_play: AtomicBool,
    fail_pause: AtomicBool,
}

impl FakePlayer {
    fn with_devices(devices: Vec<Device>) -> Arc<Self> {
        let player = Self::default();
        *player.fallback.lock().unwrap() = devices;
        Arc::new(player)
    }

    fn script(&self, polls: Vec<Option<Vec<Device>>>) {
        *self.scripted.lock().unwrap() = polls.into();
    }

    fn set_devices(&self, devices: Vec<Device>) {
        *self.fallback.lock().unwrap() = devices;
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn unavailable() -> ApiError {
    ApiError::Status {
        status: StatusCode::SERVICE_UNAVAILABLE,
        message: "Service unavailable".to_string(),
    }
}

#[async_trait]
impl PlaybackApi for FakePlayer {
    async fn list_devices(&self, _token: &str) -> Result<Vec<Device>, ApiError> {
        self.record(Call::ListDevices);
        let delay = *self.list_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let next = self.scripted.lock().unwrap().pop_front();
        match next {
            Some(Some(devices)) => Ok(devices),
            Some(None) => Err(unavailable()),
            None => Ok(self.fallback.lock().unwrap().clone()),
        }
    }

    async fn transfer_playback(
        &self,
        _token: &str,
        device_id: &str,
        play: bool,
    ) -> Result<(), ApiError> {
        self.record(Call::Transfer(device_id.to_string(), play));
        Ok(())
    }

    async fn start_playback(
        &self,
        _token: &str,
        track_id: &str,
        device_id: Option<&str>,
    ) -> Result<(), ApiError> {
        self.record(Call::Play(
            track_id.to_string(),
            device_id.map(str::to_string),
        ));
        if self.fail_play.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }

    async fn pause(&self, _token: &str) -> Result<(), ApiError> {
        self.record(Call::Pause);
        if self.fail_pause.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }

    async fn resume(&self, _token: &str) -> Result<(), ApiError> {
        self.record(Call::Resume);
        Ok(())
    }

    async fn playback_state(&self, _token: &str) -> Result<Option<PlaybackSnapshot>, ApiError> {
        Ok(Some(PlaybackSnapshot {
            track_id: Some(TRACK.to_string()),
            track_name: Some("Yesterday".to_string()),
            artists: vec!["The Beatles".to_string()],
            position_ms: 12_000,
            duration_ms: 125_000,
            is_playing: true,
            device_name: Some("Phone".to_string()),
        }))
    }
}

#[derive(Default)]
struct FakeLauncher {
    wakes: AtomicU32,
    broken: bool,
}

impl CompanionLauncher for FakeLauncher {
    fn wake(&self) -> Result<(), String> {
        self.wakes.fetch_add(1, Ordering::SeqCst);
        if self.broken {
            return Err("no handler for spotify: links".to_string());
        }
        Ok(())
    }
}

struct NoRefresh;

#[async_trait]
impl TokenEndpoint for NoRefresh {
    async fn exchange_code(
        &self,
        _credentials: &ClientCredentials,
        _code: &str,
        _redirect_uri: &str,
        _code_verifier: &str,
    ) -> Result<TokenGrant, AuthError> {
        Err(AuthError::Exchange("not used".to_string()))
    }

    async fn refresh(
        &self,
        _credentials: &ClientCredentials,
        _refresh_token: &str,
    ) -> Result<TokenGrant, AuthError> {
        Err(AuthError::AuthRequired)
    }
}

fn device(id: &str, name: &str) -> Device {
    Device {
        id: Some(id.to_string()),
        name: name.to_string(),
        is_active: false,
        device_type: "Smartphone".to_string(),
    }
}

fn session(expires_in: i64) -> Arc<TokenSession> {
    let session = TokenSession::new(
        ClientCredentials {
            client_id: "client".to_string(),
            client_secret: None,
        },
        Arc::new(NoRefresh),
    )
    .with_token(Token {
        access_token: "access".to_string(),
        refresh_token: None,
        scope: String::new(),
        expires_at: Utc::now().timestamp() + expires_in,
    });
    Arc::new(session)
}

fn orchestrator(
    player: &Arc<FakePlayer>,
    launcher: &Arc<FakeLauncher>,
    auto_stop: AutoStopConfig,
) -> Arc<PlaybackOrchestrator> {
    Arc::new(PlaybackOrchestrator::new(
        player.clone(),
        session(3600),
        launcher.clone(),
        auto_stop,
    ))
}

// The paused clock lands on timer deadlines, give or take timer-wheel rounding
fn assert_close(elapsed: Duration, expected: Duration) {
    assert!(
        elapsed >= expected && elapsed < expected + Duration::from_millis(50),
        "elapsed {:?}, expected {:?}",
        elapsed,
        expected
    );
}

fn auto_stop_after(secs: u64) -> AutoStopConfig {
    AutoStopConfig {
        enabled: true,
        duration: Duration::from_secs(secs),
    }
}

#[tokio::test(start_paused = true)]
async fn test_plays_directly_on_first_device() {
    let player = FakePlayer::with_devices(vec![device("phone", "Phone"), device("tv", "TV")]);
    let launcher = Arc::new(FakeLauncher::default());
    let orchestrator = orchestrator(&player, &launcher, AutoStopConfig::default());

    let outcome = orchestrator.play_track(TRACK).await.unwrap();

    assert_eq!(
        outcome,
        PlayOutcome::Started {
            device: "Phone".to_string()
        }
    );
    assert_eq!(
        player.calls(),
        vec![
            Call::ListDevices,
            Call::Transfer("phone".to_string(), false),
            Call::Play(TRACK.to_string(), Some("phone".to_string())),
        ]
    );
    assert_eq!(orchestrator.state(), PlaybackState::Playing);
    assert!(orchestrator.is_playing());
    assert_eq!(launcher.wakes.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_no_device_wakes_app_then_plays_original_track() {
    let player = FakePlayer::with_devices(Vec::new());
    let launcher = Arc::new(FakeLauncher::default());
    let orchestrator = orchestrator(&player, &launcher, AutoStopConfig::default());

    let outcome = orchestrator.play_track(TRACK).await.unwrap();

    assert_eq!(outcome, PlayOutcome::AwaitingWake);
    assert_eq!(launcher.wakes.load(Ordering::SeqCst), 1);
    assert_eq!(
        orchestrator.pending_intent(),
        Some(PlaybackIntent {
            track_id: TRACK.to_string(),
            awaiting_return: true,
        })
    );
    assert_eq!(orchestrator.state(), PlaybackState::AwaitingWake);
    assert_eq!(player.count(&Call::ListDevices), 1);

    // Spotify needs two polls to show up
    player.script(vec![Some(Vec::new()), Some(Vec::new())]);
    player.set_devices(vec![device("phone", "Phone")]);

    let resumed = orchestrator.on_app_foregrounded().await.unwrap();

    assert_eq!(
        resumed,
        ResumeOutcome::Started {
            device: "Phone".to_string()
        }
    );
    let calls = player.calls();
    assert_eq!(
        &calls[calls.len() - 2..],
        &[
            Call::Transfer("phone".to_string(), true),
            Call::Play(TRACK.to_string(), Some("phone".to_string())),
        ]
    );
    assert_eq!(player.count(&Call::ListDevices), 4);
    assert_eq!(launcher.wakes.load(Ordering::SeqCst), 1);
    assert_eq!(orchestrator.pending_intent(), None);
    assert_eq!(orchestrator.state(), PlaybackState::Playing);

    // a second foreground event has nothing left to do
    assert_eq!(
        orchestrator.on_app_foregrounded().await.unwrap(),
        ResumeOutcome::NoPendingIntent
    );
    assert_eq!(player.count(&Call::ListDevices), 4);
}

#[tokio::test(start_paused = true)]
async fn test_foreground_without_intent_is_noop() {
    let player = FakePlayer::with_devices(vec![device("phone", "Phone")]);
    let launcher = Arc::new(FakeLauncher::default());
    let orchestrator = orchestrator(&player, &launcher, AutoStopConfig::default());

    assert_eq!(
        orchestrator.on_app_foregrounded().await.unwrap(),
        ResumeOutcome::NoPendingIntent
    );
    assert!(player.calls().is_empty());
    assert_eq!(orchestrator.state(), PlaybackState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_device_never_appears() {
    let player = FakePlayer::with_devices(Vec::new());
    let launcher = Arc::new(FakeLauncher::default());
    let orchestrator = orchestrator(&player, &launcher, AutoStopConfig::default());

    orchestrator.play_track(TRACK).await.unwrap();
    let start = Instant::now();

    let result = orchestrator.on_app_foregrounded().await;

    assert!(matches!(result, Err(PlaybackError::DeviceUnavailable)));
    // settle delay plus four gaps between five polls, no sleep after the last
    assert_close(start.elapsed(), Duration::from_millis(500 + 4 * 800));
    assert_eq!(player.count(&Call::ListDevices), 1 + 5);
    assert_eq!(orchestrator.pending_intent(), None);
    assert_eq!(orchestrator.state(), PlaybackState::Idle);
    assert!(!player.calls().iter().any(|c| matches!(c, Call::Play(..))));
}

#[tokio::test(start_paused = true)]
async fn test_restricted_device_counts_as_none() {
    let restricted = Device {
        id: None,
        name: "Work laptop".to_string(),
        is_active: false,
        device_type: "Computer".to_string(),
    };
    let player = FakePlayer::with_devices(vec![restricted]);
    let launcher = Arc::new(FakeLauncher::default());
    let orchestrator = orchestrator(&player, &launcher, AutoStopConfig::default());

    let outcome = orchestrator.play_track(TRACK).await.unwrap();

    assert_eq!(outcome, PlayOutcome::AwaitingWake);
    assert_eq!(launcher.wakes.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_newer_scan_replaces_pending_intent() {
    let player = FakePlayer::with_devices(Vec::new());
    let launcher = Arc::new(FakeLauncher::default());
    let orchestrator = orchestrator(&player, &launcher, AutoStopConfig::default());

    orchestrator.play_track(TRACK).await.unwrap();
    orchestrator.play_track(OTHER_TRACK).await.unwrap();

    assert_eq!(
        orchestrator.pending_intent().map(|i| i.track_id),
        Some(OTHER_TRACK.to_string())
    );

    player.set_devices(vec![device("phone", "Phone")]);
    orchestrator.on_app_foregrounded().await.unwrap();

    assert_eq!(
        player.count(&Call::Play(
            OTHER_TRACK.to_string(),
            Some("phone".to_string())
        )),
        1
    );
    assert!(
        !player
            .calls()
            .contains(&Call::Play(TRACK.to_string(), Some("phone".to_string())))
    );
}

#[tokio::test(start_paused = true)]
async fn test_direct_play_drops_older_pending_intent() {
    let player = FakePlayer::with_devices(Vec::new());
    let launcher = Arc::new(FakeLauncher::default());
    let orchestrator = orchestrator(&player, &launcher, AutoStopConfig::default());

    assert_eq!(
        orchestrator.play_track(TRACK).await.unwrap(),
        PlayOutcome::AwaitingWake
    );

    // the device shows up before the user returns and the next card plays directly
    player.set_devices(vec![device("phone", "Phone")]);
    assert_eq!(
        orchestrator.play_track(OTHER_TRACK).await.unwrap(),
        PlayOutcome::Started {
            device: "Phone".to_string()
        }
    );
    assert_eq!(orchestrator.pending_intent(), None);

    assert_eq!(
        orchestrator.on_app_foregrounded().await.unwrap(),
        ResumeOutcome::NoPendingIntent
    );
    let plays: Vec<Call> = player
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Play(..)))
        .collect();
    assert_eq!(
        plays,
        vec![Call::Play(OTHER_TRACK.to_string(), Some("phone".to_string()))]
    );
    assert_eq!(orchestrator.state(), PlaybackState::Playing);
}

#[tokio::test(start_paused = true)]
async fn test_wake_failure_clears_intent() {
    let player = FakePlayer::with_devices(Vec::new());
    let launcher = Arc::new(FakeLauncher {
        broken: true,
        ..Default::default()
    });
    let orchestrator = orchestrator(&player, &launcher, AutoStopConfig::default());

    let result = orchestrator.play_track(TRACK).await;

    assert!(matches!(result, Err(PlaybackError::CompanionUnavailable(_))));
    assert_eq!(orchestrator.pending_intent(), None);
    assert_eq!(orchestrator.state(), PlaybackState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_scan_is_ignored() {
    let player = FakePlayer::with_devices(vec![device("phone", "Phone")]);
    *player.list_delay.lock().unwrap() = Duration::from_millis(300);
    let launcher = Arc::new(FakeLauncher::default());
    let orchestrator = orchestrator(&player, &launcher, AutoStopConfig::default());

    let (first, second) = tokio::join!(
        orchestrator.play_track(TRACK),
        orchestrator.play_track(OTHER_TRACK)
    );

    assert!(matches!(first, Ok(PlayOutcome::Started { .. })));
    assert_eq!(second.unwrap(), PlayOutcome::Busy);
    assert_eq!(player.count(&Call::ListDevices), 1);
    let plays: Vec<Call> = player
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Play(..)))
        .collect();
    assert_eq!(
        plays,
        vec![Call::Play(TRACK.to_string(), Some("phone".to_string()))]
    );

    // the latch is released once the first scan is done
    assert!(matches!(
        orchestrator.play_track(OTHER_TRACK).await,
        Ok(PlayOutcome::Started { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_play_failure_returns_to_idle() {
    let player = FakePlayer::with_devices(vec![device("phone", "Phone")]);
    player.fail_play.store(true, Ordering::SeqCst);
    let launcher = Arc::new(FakeLauncher::default());
    let orchestrator = orchestrator(&player, &launcher, AutoStopConfig::default());

    let result = orchestrator.play_track(TRACK).await;

    assert!(matches!(result, Err(PlaybackError::PlaybackFailed(_))));
    assert_eq!(orchestrator.state(), PlaybackState::Idle);
    assert!(!orchestrator.is_playing());
}

#[tokio::test(start_paused = true)]
async fn test_expired_session_never_plays() {
    let player = FakePlayer::with_devices(vec![device("phone", "Phone")]);
    let launcher = Arc::new(FakeLauncher::default());
    let orchestrator = PlaybackOrchestrator::new(
        player.clone(),
        session(-60),
        launcher.clone(),
        AutoStopConfig::default(),
    );

    let result = orchestrator.play_track(TRACK).await;

    assert!(matches!(
        result,
        Err(PlaybackError::Auth(AuthError::AuthRequired))
    ));
    assert!(player.calls().is_empty());
    assert_eq!(orchestrator.state(), PlaybackState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_auto_stop_pauses_after_duration() {
    let player = FakePlayer::with_devices(vec![device("phone", "Phone")]);
    let launcher = Arc::new(FakeLauncher::default());
    let orchestrator = orchestrator(&player, &launcher, auto_stop_after(30));

    orchestrator.play_track(TRACK).await.unwrap();

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert_eq!(player.count(&Call::Pause), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(player.count(&Call::Pause), 1);
    assert!(!orchestrator.is_playing());
    assert_eq!(orchestrator.state(), PlaybackState::Paused);
}

#[tokio::test(start_paused = true)]
async fn test_new_track_rearms_auto_stop() {
    let player = FakePlayer::with_devices(vec![device("phone", "Phone")]);
    let launcher = Arc::new(FakeLauncher::default());
    let orchestrator = orchestrator(&player, &launcher, auto_stop_after(30));

    orchestrator.play_track(TRACK).await.unwrap();
    tokio::time::sleep(Duration::from_secs(20)).await;
    orchestrator.play_track(OTHER_TRACK).await.unwrap();

    // the first timer would have fired at 30s
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(player.count(&Call::Pause), 0);

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(player.count(&Call::Pause), 1);
}

#[tokio::test(start_paused = true)]
async fn test_new_scan_cancels_auto_stop_while_awaiting_wake() {
    let player = FakePlayer::with_devices(vec![device("phone", "Phone")]);
    let launcher = Arc::new(FakeLauncher::default());
    let orchestrator = orchestrator(&player, &launcher, auto_stop_after(5));

    orchestrator.play_track(TRACK).await.unwrap();
    player.set_devices(Vec::new());
    assert_eq!(
        orchestrator.play_track(OTHER_TRACK).await.unwrap(),
        PlayOutcome::AwaitingWake
    );

    tokio::time::sleep(Duration::from_secs(6)).await;

    assert_eq!(player.count(&Call::Pause), 0);
    assert_eq!(orchestrator.state(), PlaybackState::AwaitingWake);
    assert_eq!(
        orchestrator.pending_intent(),
        Some(PlaybackIntent {
            track_id: OTHER_TRACK.to_string(),
            awaiting_return: true,
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_auto_stop_after_wake_belongs_to_new_track() {
    let player = FakePlayer::with_devices(vec![device("phone", "Phone")]);
    let launcher = Arc::new(FakeLauncher::default());
    let orchestrator = orchestrator(&player, &launcher, auto_stop_after(5));

    orchestrator.play_track(TRACK).await.unwrap();
    player.set_devices(Vec::new());
    tokio::time::sleep(Duration::from_secs(3)).await;
    orchestrator.play_track(OTHER_TRACK).await.unwrap();

    player.set_devices(vec![device("phone", "Phone")]);
    let resumed_at = Instant::now();
    orchestrator.on_app_foregrounded().await.unwrap();
    let started_after = resumed_at.elapsed();

    // the first timer would have fired 5s after the first track started
    tokio::time::sleep(Duration::from_secs(4) - started_after).await;
    assert_eq!(player.count(&Call::Pause), 0);
    assert_eq!(orchestrator.state(), PlaybackState::Playing);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(player.count(&Call::Pause), 1);
    assert_eq!(orchestrator.state(), PlaybackState::Paused);
}

#[tokio::test(start_paused = true)]
async fn test_explicit_pause_cancels_auto_stop() {
    let player = FakePlayer::with_devices(vec![device("phone", "Phone")]);
    let launcher = Arc::new(FakeLauncher::default());
    let orchestrator = orchestrator(&player, &launcher, auto_stop_after(30));

    orchestrator.play_track(TRACK).await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(orchestrator.pause().await.unwrap(), ControlOutcome::Done);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(orchestrator.resume().await.unwrap(), ControlOutcome::Done);

    tokio::time::sleep(Duration::from_secs(120)).await;
    // only the explicit pause, the timer is gone and resume did not re-arm it
    assert_eq!(player.count(&Call::Pause), 1);
    assert!(orchestrator.is_playing());
}

#[tokio::test(start_paused = true)]
async fn test_auto_stop_disabled() {
    let player = FakePlayer::with_devices(vec![device("phone", "Phone")]);
    let launcher = Arc::new(FakeLauncher::default());
    let orchestrator = orchestrator(
        &player,
        &launcher,
        AutoStopConfig {
            enabled: false,
            duration: Duration::from_secs(1),
        },
    );

    orchestrator.play_track(TRACK).await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(player.count(&Call::Pause), 0);
    assert!(orchestrator.is_playing());
}

#[tokio::test(start_paused = true)]
async fn test_control_cooldown_suppresses_rapid_calls() {
    let player = FakePlayer::with_devices(vec![device("phone", "Phone")]);
    let launcher = Arc::new(FakeLauncher::default());
    let orchestrator = orchestrator(&player, &launcher, AutoStopConfig::default());
    orchestrator.play_track(TRACK).await.unwrap();

    assert_eq!(orchestrator.pause().await.unwrap(), ControlOutcome::Done);
    assert_eq!(
        orchestrator.resume().await.unwrap(),
        ControlOutcome::Suppressed
    );
    assert!(!orchestrator.is_playing());

    tokio::time::sleep(Duration::from_millis(900)).await;
    assert_eq!(orchestrator.resume().await.unwrap(), ControlOutcome::Done);
    assert!(orchestrator.is_playing());

    assert_eq!(player.count(&Call::Pause), 1);
    assert_eq!(player.count(&Call::Resume), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_pause_rolls_back() {
    let player = FakePlayer::with_devices(vec![device("phone", "Phone")]);
    let launcher = Arc::new(FakeLauncher::default());
    let orchestrator = orchestrator(&player, &launcher, AutoStopConfig::default());
    orchestrator.play_track(TRACK).await.unwrap();
    player.fail_pause.store(true, Ordering::SeqCst);

    let result = orchestrator.pause().await;

    assert!(matches!(result, Err(PlaybackError::Api(_))));
    assert!(orchestrator.is_playing());
    assert_eq!(orchestrator.state(), PlaybackState::Playing);
}

#[tokio::test(start_paused = true)]
async fn test_playback_snapshot() {
    let player = FakePlayer::with_devices(Vec::new());
    let launcher = Arc::new(FakeLauncher::default());
    let orchestrator = orchestrator(&player, &launcher, AutoStopConfig::default());

    let snapshot = orchestrator.playback_snapshot().await.unwrap().unwrap();

    assert_eq!(snapshot.track_id.as_deref(), Some(TRACK));
    assert_eq!(snapshot.device_name.as_deref(), Some("Phone"));
    assert!(snapshot.is_playing);
}

#[tokio::test(start_paused = true)]
async fn test_abandon_drops_pending_intent() {
    let player = FakePlayer::with_devices(Vec::new());
    let launcher = Arc::new(FakeLauncher::default());
    let orchestrator = orchestrator(&player, &launcher, AutoStopConfig::default());

    orchestrator.play_track(TRACK).await.unwrap();
    orchestrator.abandon();

    assert_eq!(orchestrator.pending_intent(), None);
    assert_eq!(orchestrator.state(), PlaybackState::Idle);
    assert!(!orchestrator.is_playing());
    assert_eq!(
        orchestrator.on_app_foregrounded().await.unwrap(),
        ResumeOutcome::NoPendingIntent
    );
}

#[tokio::test(start_paused = true)]
async fn test_foreground_events_are_dispatched() {
    let player = FakePlayer::with_devices(Vec::new());
    let launcher = Arc::new(FakeLauncher::default());
    let orchestrator = orchestrator(&player, &launcher, AutoStopConfig::default());
    let (events, receiver) = mpsc::channel(4);
    let subscription = orchestrator.watch_foreground(receiver);
    assert!(subscription.is_active());

    orchestrator.play_track(TRACK).await.unwrap();
    player.set_devices(vec![device("phone", "Phone")]);
    events.send(AppEvent::Foregrounded).await.unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(
        player.count(&Call::Play(TRACK.to_string(), Some("phone".to_string()))),
        1
    );
    assert_eq!(orchestrator.state(), PlaybackState::Playing);

    subscription.unsubscribe();
    let closed = tokio::time::timeout(Duration::from_secs(1), events.closed()).await;
    assert!(closed.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_dropping_subscription_stops_listener() {
    let player = FakePlayer::with_devices(Vec::new());
    let launcher = Arc::new(FakeLauncher::default());
    let orchestrator = orchestrator(&player, &launcher, AutoStopConfig::default());
    let (events, receiver) = mpsc::channel(4);

    drop(orchestrator.watch_foreground(receiver));

    let closed = tokio::time::timeout(Duration::from_secs(1), events.closed()).await;
    assert!(closed.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_device_treats_failed_poll_as_empty() {
    let player = FakePlayer::with_devices(vec![device("tv", "TV")]);
    player.script(vec![None, Some(Vec::new())]);
    let registry = DeviceRegistry::new(player.clone(), session(3600));
    let start = Instant::now();

    let devices = registry
        .wait_for_device(5, Duration::from_millis(800))
        .await
        .unwrap();

    assert_eq!(devices, vec![device("tv", "TV")]);
    assert_eq!(player.count(&Call::ListDevices), 3);
    assert_close(start.elapsed(), Duration::from_millis(1600));
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_device_gives_up() {
    let player = FakePlayer::with_devices(Vec::new());
    let registry = DeviceRegistry::new(player.clone(), session(3600));
    let start = Instant::now();

    let devices = registry
        .wait_for_device(3, Duration::from_millis(500))
        .await
        .unwrap();

    assert!(devices.is_empty());
    assert_eq!(player.count(&Call::ListDevices), 3);
    assert_close(start.elapsed(), Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_device_stops_on_auth_required() {
    let player = FakePlayer::with_devices(Vec::new());
    let registry = DeviceRegistry::new(player.clone(), session(-60));

    let result = registry.wait_for_device(5, Duration::from_millis(800)).await;

    assert!(matches!(
        result,
        Err(PlaybackError::Auth(AuthError::AuthRequired))
    ));
    assert!(player.calls().is_empty());
}

#[test]
fn test_default_timing() {
    let timing = OrchestratorTiming::default();
    assert_eq!(timing.settle_delay, Duration::from_millis(500));
    assert_eq!(timing.wake_attempts, 5);
    assert_eq!(timing.wake_poll_delay, Duration::from_millis(800));
    assert_eq!(timing.control_cooldown, Duration::from_millis(900));
}
