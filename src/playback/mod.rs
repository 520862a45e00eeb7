//! Playback of scanned cards on the user's Spotify devices.
//!
//! [`DeviceRegistry`] answers "which devices are there right now", and
//! [`PlaybackOrchestrator`] turns a scanned track id into audible playback.
//! When no device exists it wakes the Spotify app, remembers the scan and
//! finishes the job once the host reports that the user came back.

mod devices;
mod launcher;
mod orchestrator;

use std::time::Duration;

pub use devices::DeviceRegistry;
pub use launcher::{CompanionLauncher, SILENT_TRACK_ID, SpotifyAppLauncher};
pub use orchestrator::{
    AppEvent, ControlOutcome, ForegroundSubscription, OrchestratorTiming, PlayOutcome,
    PlaybackOrchestrator, PlaybackState, ResumeOutcome,
};

/// Pause playback automatically some time after it started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoStopConfig {
    pub enabled: bool,
    pub duration: Duration,
}

impl Default for AutoStopConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            duration: Duration::from_secs(30),
        }
    }
}
