//! Configuration management for OpenSter.
//!
//! Values come from environment variables, optionally seeded from a `.env` file
//! in the local data directory. Lookup order:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Defaults for everything that has a sensible one
//!
//! Components never read the environment themselves. The getters here are used
//! by the CLI layer to build the explicit settings structs each component takes.

use std::{env, path::PathBuf, time::Duration};

use crate::{musicbrainz::RateLimitConfig, playback::AutoStopConfig};

const DEFAULT_SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
const DEFAULT_SPOTIFY_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const DEFAULT_SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const DEFAULT_SPOTIFY_SCOPE: &str = "user-read-playback-state user-modify-playback-state user-read-currently-playing streaming app-remote-control playlist-read-private";
const DEFAULT_MUSICBRAINZ_API_URL: &str = "https://musicbrainz.org/ws/2";
const DEFAULT_MUSICBRAINZ_USER_AGENT: &str =
    concat!("OpenSter/", env!("CARGO_PKG_VERSION"), " (contact@openster.app)");
const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8888";
const DEFAULT_AUTO_STOP_SECS: u64 = 30;

/// Loads environment variables from `openster/.env` in the local data directory.
///
/// The directory is created when missing. A missing `.env` file is not an
/// error: every required value can also come from the process environment.
///
/// # Directory Structure
///
/// - Linux: `~/.local/share/openster/.env`
/// - macOS: `~/Library/Application Support/openster/.env`
/// - Windows: `%LOCALAPPDATA%/openster/.env`
pub async fn load_env() -> Result<(), String> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    match dotenv::from_path(&path) {
        Ok(()) => Ok(()),
        Err(dotenv::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(format!("Failed to load {}: {}", path.display(), e)),
    }
}

/// Root of everything OpenSter writes to disk.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("openster");
    path
}

fn required(name: &str) -> Result<String, String> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(format!(
            "{} must be set (environment or {})",
            name,
            data_dir().join(".env").display()
        )),
    }
}

fn optional(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Address the local OAuth callback server binds to, e.g. `127.0.0.1:8888`.
pub fn server_addr() -> String {
    optional("SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS)
}

/// Client id of the registered Spotify application (`SPOTIFY_API_AUTH_CLIENT_ID`).
pub fn spotify_client_id() -> Result<String, String> {
    required("SPOTIFY_API_AUTH_CLIENT_ID")
}

/// Client secret (`SPOTIFY_API_AUTH_CLIENT_SECRET`).
///
/// Optional: without it, token requests fall back to the PKCE public-client
/// form. Never print the returned value.
pub fn spotify_client_secret() -> Option<String> {
    env::var("SPOTIFY_API_AUTH_CLIENT_SECRET")
        .ok()
        .filter(|v| !v.trim().is_empty())
}

/// Redirect URI registered in the Spotify dashboard. Must point at
/// [`server_addr`] with the `/callback` path.
pub fn spotify_redirect_uri() -> String {
    optional(
        "SPOTIFY_API_REDIRECT_URI",
        &format!("http://{}/callback", server_addr()),
    )
}

pub fn spotify_scope() -> String {
    optional("SPOTIFY_API_AUTH_SCOPE", DEFAULT_SPOTIFY_SCOPE)
}

pub fn spotify_apiauth_url() -> String {
    optional("SPOTIFY_API_AUTH_URL", DEFAULT_SPOTIFY_AUTH_URL)
}

pub fn spotify_apiurl() -> String {
    optional("SPOTIFY_API_URL", DEFAULT_SPOTIFY_API_URL)
}

pub fn spotify_apitoken_url() -> String {
    optional("SPOTIFY_API_TOKEN_URL", DEFAULT_SPOTIFY_TOKEN_URL)
}

pub fn musicbrainz_apiurl() -> String {
    optional("MUSICBRAINZ_API_URL", DEFAULT_MUSICBRAINZ_API_URL)
}

/// MusicBrainz rejects anonymous clients, so a descriptive agent is always sent.
pub fn musicbrainz_user_agent() -> String {
    optional("MUSICBRAINZ_USER_AGENT", DEFAULT_MUSICBRAINZ_USER_AGENT)
}

/// Pacing for MusicBrainz requests.
///
/// MusicBrainz blocks clients that send more than one request per second, so
/// the delay can be raised but never lowered below that.
///
/// # Environment Variables
///
/// - `MUSICBRAINZ_MIN_DELAY_MS` - Minimum gap between two requests
///   (default 1100, values below 1000 are clamped)
///
/// # Returns
///
/// A [`RateLimitConfig`] with the default 3 second retry backoff.
pub fn rate_limit_config() -> RateLimitConfig {
    let mut cfg = RateLimitConfig::default();
    if let Some(ms) = env::var("MUSICBRAINZ_MIN_DELAY_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
    {
        cfg.min_delay = Duration::from_millis(ms.max(1000));
    }
    cfg
}

/// Auto-stop timer for jukebox playback.
///
/// `OPENSTER_AUTO_STOP_ENABLED` accepts `1`/`true`/`yes`; the duration comes
/// from `OPENSTER_AUTO_STOP_SECS` (default 30).
pub fn auto_stop_config() -> AutoStopConfig {
    let enabled = env::var("OPENSTER_AUTO_STOP_ENABLED")
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);
    let secs = env::var("OPENSTER_AUTO_STOP_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_AUTO_STOP_SECS);

    AutoStopConfig {
        enabled,
        duration: Duration::from_secs(secs),
    }
}
