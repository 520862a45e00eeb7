use std::{
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Instant, sleep},
};

use crate::{
    error::PlaybackError,
    info,
    management::TokenSession,
    spotify::PlaybackApi,
    types::{Device, PlaybackIntent, PlaybackSnapshot},
    warning,
};

use super::{AutoStopConfig, CompanionLauncher, DeviceRegistry};

/// Delays used by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorTiming {
    /// Pause after the app came back before the first device poll.
    pub settle_delay: Duration,
    pub wake_attempts: u32,
    pub wake_poll_delay: Duration,
    /// Minimum spacing between two pause/resume calls.
    pub control_cooldown: Duration,
}

impl Default for OrchestratorTiming {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(500),
            wake_attempts: 5,
            wake_poll_delay: Duration::from_millis(800),
            control_cooldown: Duration::from_millis(900),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    ResolvingDevice,
    DirectPlay,
    AwaitingWake,
    ResumingAfterWake,
    Playing,
    Paused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Playback runs on the named device.
    Started { device: String },
    /// No device was available. The Spotify app was opened and the track
    /// plays once the host reports [`AppEvent::Foregrounded`].
    AwaitingWake,
    /// Another scan is still being handled; this one was ignored.
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    NoPendingIntent,
    Started { device: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    Done,
    /// Dropped because the previous control call was too recent.
    Suppressed,
}

/// Lifecycle events of the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// The user is back in OpenSter, typically after the Spotify app was opened.
    Foregrounded,
}

struct Inner {
    state: PlaybackState,
    intent: Option<PlaybackIntent>,
    is_playing: bool,
    last_control: Option<Instant>,
    auto_stop: Option<JoinHandle<()>>,
    /// Bumped whenever a timer is armed or cancelled. A timer only touches
    /// the state while its generation is still current.
    auto_stop_generation: u64,
}

impl Inner {
    fn cancel_auto_stop(&mut self) {
        self.auto_stop_generation += 1;
        if let Some(handle) = self.auto_stop.take() {
            handle.abort();
        }
    }
}

/// Releases the scan latch when dropped.
struct ScanGuard<'a>(&'a AtomicBool);

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Turns scanned track ids into playback.
///
/// ```text
/// Idle → ResolvingDevice → DirectPlay ─────────────────────────→ Playing ⇄ Paused
///                        ↘ AwaitingWake → ResumingAfterWake ──↗
/// ```
///
/// Any failure or [`abandon`](Self::abandon) leads back to `Idle`. The state
/// mutex is never held across an await.
pub struct PlaybackOrchestrator {
    api: Arc<dyn PlaybackApi>,
    session: Arc<TokenSession>,
    devices: DeviceRegistry,
    launcher: Arc<dyn CompanionLauncher>,
    auto_stop: AutoStopConfig,
    timing: OrchestratorTiming,
    scanning: AtomicBool,
    inner: Arc<Mutex<Inner>>,
}

impl PlaybackOrchestrator {
    pub fn new(
        api: Arc<dyn PlaybackApi>,
        session: Arc<TokenSession>,
        launcher: Arc<dyn CompanionLauncher>,
        auto_stop: AutoStopConfig,
    ) -> Self {
        Self {
            devices: DeviceRegistry::new(Arc::clone(&api), Arc::clone(&session)),
            api,
            session,
            launcher,
            auto_stop,
            timing: OrchestratorTiming::default(),
            scanning: AtomicBool::new(false),
            inner: Arc::new(Mutex::new(Inner {
                state: PlaybackState::Idle,
                intent: None,
                is_playing: false,
                last_control: None,
                auto_stop: None,
                auto_stop_generation: 0,
            })),
        }
    }

    pub fn with_timing(mut self, timing: OrchestratorTiming) -> Self {
        self.timing = timing;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: PlaybackState) {
        self.lock().state = state;
    }

    fn try_latch(&self) -> Option<ScanGuard<'_>> {
        self.scanning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ScanGuard(&self.scanning))
    }

    pub fn state(&self) -> PlaybackState {
        self.lock().state
    }

    pub fn is_playing(&self) -> bool {
        self.lock().is_playing
    }

    pub fn pending_intent(&self) -> Option<PlaybackIntent> {
        self.lock().intent.clone()
    }

    /// Plays `track_id` on the first available device.
    ///
    /// Without a device the scan is remembered, the Spotify app is opened and
    /// [`PlayOutcome::AwaitingWake`] returned right away.
    pub async fn play_track(&self, track_id: &str) -> Result<PlayOutcome, PlaybackError> {
        let Some(_guard) = self.try_latch() else {
            info!("Still handling the previous card, ignoring {}", track_id);
            return Ok(PlayOutcome::Busy);
        };

        {
            // The newest scan owns the intent slot and the timer.
            let mut inner = self.lock();
            inner.cancel_auto_stop();
            if let Some(previous) = inner.intent.take() {
                info!("Replacing pending card {} with {}", previous.track_id, track_id);
            }
            inner.state = PlaybackState::ResolvingDevice;
        }

        let result = self.play_or_wake(track_id).await;
        if result.is_err() {
            self.set_state(PlaybackState::Idle);
        }
        result
    }

    async fn play_or_wake(&self, track_id: &str) -> Result<PlayOutcome, PlaybackError> {
        let devices = self.devices.list_devices().await?;

        if let Some((device_id, name)) = first_target(&devices) {
            self.set_state(PlaybackState::DirectPlay);
            self.start_on(&device_id, track_id, false).await?;
            return Ok(PlayOutcome::Started { device: name });
        }

        {
            let mut inner = self.lock();
            inner.intent = Some(PlaybackIntent {
                track_id: track_id.to_string(),
                awaiting_return: true,
            });
            inner.state = PlaybackState::AwaitingWake;
        }

        if let Err(e) = self.launcher.wake() {
            self.lock().intent = None;
            return Err(PlaybackError::CompanionUnavailable(e));
        }

        info!("No Spotify device found. Opening Spotify, the card plays when you come back");
        Ok(PlayOutcome::AwaitingWake)
    }

    /// Finishes a scan that had to wake the Spotify app first.
    ///
    /// One attempt per event: the pending intent is gone afterwards, whether
    /// playback started or not.
    pub async fn on_app_foregrounded(&self) -> Result<ResumeOutcome, PlaybackError> {
        let Some(_guard) = self.try_latch() else {
            return Ok(ResumeOutcome::NoPendingIntent);
        };

        let track_id = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            match inner.intent.as_mut() {
                Some(intent) if intent.awaiting_return => {
                    intent.awaiting_return = false;
                    inner.state = PlaybackState::ResumingAfterWake;
                    intent.track_id.clone()
                }
                _ => return Ok(ResumeOutcome::NoPendingIntent),
            }
        };

        let result = self.resume_after_wake(&track_id).await;
        {
            let mut inner = self.lock();
            inner.intent = None;
            if result.is_err() {
                inner.state = PlaybackState::Idle;
            }
        }
        result
    }

    async fn resume_after_wake(&self, track_id: &str) -> Result<ResumeOutcome, PlaybackError> {
        sleep(self.timing.settle_delay).await;
        let devices = self
            .devices
            .wait_for_device(self.timing.wake_attempts, self.timing.wake_poll_delay)
            .await?;

        let Some((device_id, name)) = first_target(&devices) else {
            return Err(PlaybackError::DeviceUnavailable);
        };

        self.start_on(&device_id, track_id, true).await?;
        Ok(ResumeOutcome::Started { device: name })
    }

    /// Transfers to `device_id` (best effort) and plays the track there.
    async fn start_on(
        &self,
        device_id: &str,
        track_id: &str,
        play_on_transfer: bool,
    ) -> Result<(), PlaybackError> {
        let token = self.session.get_valid_access_token().await?;

        if let Err(e) = self
            .api
            .transfer_playback(&token, device_id, play_on_transfer)
            .await
        {
            warning!("Transfer to device failed, playing anyway: {}", e);
        }

        self.api
            .start_playback(&token, track_id, Some(device_id))
            .await
            .map_err(PlaybackError::PlaybackFailed)?;

        let mut inner = self.lock();
        inner.state = PlaybackState::Playing;
        inner.is_playing = true;
        self.arm_auto_stop(&mut inner);
        Ok(())
    }

    fn arm_auto_stop(&self, inner: &mut Inner) {
        inner.cancel_auto_stop();
        if !self.auto_stop.enabled {
            return;
        }

        let api = Arc::clone(&self.api);
        let session = Arc::clone(&self.session);
        let shared = Arc::clone(&self.inner);
        let duration = self.auto_stop.duration;
        let generation = inner.auto_stop_generation;

        inner.auto_stop = Some(tokio::spawn(async move {
            sleep(duration).await;

            let paused = match session.get_valid_access_token().await {
                Ok(token) => api.pause(&token).await.map_err(PlaybackError::from),
                Err(e) => Err(e.into()),
            };

            match paused {
                Ok(()) => {
                    let mut inner = shared.lock().unwrap_or_else(|e| e.into_inner());
                    if inner.auto_stop_generation != generation {
                        return;
                    }
                    inner.is_playing = false;
                    inner.state = PlaybackState::Paused;
                    inner.auto_stop = None;
                    info!("Auto-stop: paused after {} seconds", duration.as_secs());
                }
                Err(e) => warning!("Auto-stop could not pause playback: {}", e),
            }
        }));
    }

    pub async fn pause(&self) -> Result<ControlOutcome, PlaybackError> {
        self.control(false).await
    }

    pub async fn resume(&self) -> Result<ControlOutcome, PlaybackError> {
        self.control(true).await
    }

    /// Optimistic pause/resume: the local state flips first and is rolled back
    /// when the call fails. Either one cancels a running auto-stop timer.
    async fn control(&self, play: bool) -> Result<ControlOutcome, PlaybackError> {
        let previous = {
            let mut inner = self.lock();
            let now = Instant::now();
            if let Some(last) = inner.last_control {
                if now.duration_since(last) < self.timing.control_cooldown {
                    return Ok(ControlOutcome::Suppressed);
                }
            }
            inner.last_control = Some(now);
            inner.cancel_auto_stop();

            let previous = (inner.is_playing, inner.state);
            inner.is_playing = play;
            inner.state = if play {
                PlaybackState::Playing
            } else {
                PlaybackState::Paused
            };
            previous
        };

        let result = self.send_control(play).await;
        if let Err(e) = result {
            let mut inner = self.lock();
            inner.is_playing = previous.0;
            inner.state = previous.1;
            return Err(e);
        }

        Ok(ControlOutcome::Done)
    }

    async fn send_control(&self, play: bool) -> Result<(), PlaybackError> {
        let token = self.session.get_valid_access_token().await?;
        if play {
            self.api.resume(&token).await?;
        } else {
            self.api.pause(&token).await?;
        }
        Ok(())
    }

    /// What Spotify is playing right now, on any device.
    pub async fn playback_snapshot(&self) -> Result<Option<PlaybackSnapshot>, PlaybackError> {
        let token = self.session.get_valid_access_token().await?;
        Ok(self.api.playback_state(&token).await?)
    }

    /// Drops any pending scan and timer and resets the local state to idle,
    /// e.g. when the jukebox is closed. Spotify is not told to stop, so the
    /// device may keep playing; `is_playing` only reflects this orchestrator.
    pub fn abandon(&self) {
        let mut inner = self.lock();
        inner.intent = None;
        inner.cancel_auto_stop();
        inner.is_playing = false;
        inner.state = PlaybackState::Idle;
    }

    /// Dispatches host lifecycle events until the subscription is dropped.
    pub fn watch_foreground(
        self: &Arc<Self>,
        mut events: mpsc::Receiver<AppEvent>,
    ) -> ForegroundSubscription {
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    AppEvent::Foregrounded => match this.on_app_foregrounded().await {
                        Ok(ResumeOutcome::Started { device }) => {
                            info!("Playing on {}", device)
                        }
                        Ok(ResumeOutcome::NoPendingIntent) => {}
                        Err(e) => warning!("Could not start the pending card: {}", e),
                    },
                }
            }
        });

        ForegroundSubscription {
            handle: Some(handle),
        }
    }
}

impl Drop for PlaybackOrchestrator {
    fn drop(&mut self) {
        self.lock().cancel_auto_stop();
    }
}

/// Keeps the foreground listener alive. Dropping it stops the listener.
pub struct ForegroundSubscription {
    handle: Option<JoinHandle<()>>,
}

impl ForegroundSubscription {
    pub fn unsubscribe(mut self) {
        self.stop();
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for ForegroundSubscription {
    fn drop(&mut self) {
        self.stop();
    }
}

/// First device that can be targeted. Restricted devices come without an id.
fn first_target(devices: &[Device]) -> Option<(String, String)> {
    devices
        .iter()
        .find_map(|d| d.id.clone().map(|id| (id, d.name.clone())))
}
