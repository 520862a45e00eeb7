//! Error types shared by the enrichment and playback components.
//!
//! Metadata lookups never surface here as failures: a missing year is `None`,
//! not an error. What remains are the conditions a caller has to react to
//! differently, e.g. prompting a new login versus offering "try again".

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single Spotify Web API call.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Spotify API returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// The session has expired and cannot be refreshed. A new login is needed.
    #[error("Spotify session expired. Please run openster auth again")]
    AuthRequired,

    #[error("Not logged in. Please run openster auth first")]
    NotLoggedIn,

    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("authorization code exchange failed: {0}")]
    Exchange(String),

    #[error("credential store error: {0}")]
    Store(String),
}

impl AuthError {
    /// True when the only way forward is a fresh interactive login.
    pub fn requires_login(&self) -> bool {
        matches!(self, AuthError::AuthRequired | AuthError::NotLoggedIn)
    }
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// No device showed up, even after waking the Spotify app.
    #[error("could not start playback: no Spotify device available")]
    DeviceUnavailable,

    #[error("could not start playback: {0}")]
    PlaybackFailed(ApiError),

    #[error("could not open the Spotify app: {0}")]
    CompanionUnavailable(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Malformed user input, rejected before any network call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("input is empty")]
    EmptyInput,

    #[error("'{0}' is not a Spotify playlist link or id")]
    InvalidPlaylistUrl(String),

    #[error("'{0}' is not an OpenSter card code")]
    InvalidCardCode(String),
}

/// Failure of one MusicBrainz search request.
///
/// Only the rate-limited client looks at these; the resolver sees `None`.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The service answered 502/503 and asked us to back off.
    #[error("MusicBrainz unavailable ({0})")]
    Transient(StatusCode),

    #[error("MusicBrainz rejected the request ({0})")]
    Rejected(StatusCode),

    #[error("MusicBrainz request failed: {0}")]
    Network(#[from] reqwest::Error),
}

impl SearchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SearchError::Transient(_))
    }
}
