/// A silent track used to bring the Spotify app to the foreground.
///
/// Opening any track URI starts the app, and with it a playback device. The
/// silent one keeps that from audibly playing anything before the real card.
pub const SILENT_TRACK_ID: &str = "5XSKC4d0y0DfcGbvDOiL93";

/// Brings the companion player app up so that a playback device appears.
///
/// Fire and forget: success only means the request to open the app was
/// handed off, not that a device exists yet.
pub trait CompanionLauncher: Send + Sync {
    fn wake(&self) -> Result<(), String>;
}

/// Opens the Spotify app through the system URL handler.
#[derive(Debug, Default, Clone)]
pub struct SpotifyAppLauncher;

impl CompanionLauncher for SpotifyAppLauncher {
    fn wake(&self) -> Result<(), String> {
        let app_uri = format!("spotify:track:{}", SILENT_TRACK_ID);
        if webbrowser::open(&app_uri).is_ok() {
            return Ok(());
        }

        // No handler for the spotify: scheme, try the web link instead.
        let web_url = format!("https://open.spotify.com/track/{}", SILENT_TRACK_ID);
        webbrowser::open(&web_url).map_err(|e| e.to_string())
    }
}
