//! # CLI Module
//!
//! Command implementations behind the `openster` binary. The CLI stands in for
//! the mobile app: it wires the library components together from configuration
//! and reports progress on the terminal.
//!
//! ## Commands
//!
//! - [`auth`] / [`logout`] - Spotify login (OAuth 2.0 with PKCE) and sign-out
//! - [`import`] - Reads a playlist, resolves original years and writes the card deck as JSON
//! - [`set_year`] - Corrects the year of one track in an imported deck
//! - [`play`] - Plays one scanned card code
//! - [`jukebox`] - Reads card codes from stdin (barcode scanners type like a keyboard)
//!   and plays each one
//! - [`pause`] / [`resume`] / [`status`] - Playback control
//!
//! ## Error Handling
//!
//! Commands never return errors. Anything fatal is reported through the
//! crate's `error!` macro, which prints and exits with status 1. Recoverable
//! problems are printed as warnings and the command carries on.

mod auth;
mod import;
mod jukebox;

use std::sync::Arc;

pub use auth::{auth, logout};
pub use import::{import, set_year};
pub use jukebox::{jukebox, pause, play, resume, status};

use crate::{
    config, error,
    management::{ClientCredentials, FileCredentialStore, TokenSession},
    playback::{PlaybackOrchestrator, SpotifyAppLauncher},
    spotify::{SpotifyPlayer, auth::SpotifyAccounts},
};

/// Builds the token session from configuration, without loading any token.
pub(crate) fn new_session() -> TokenSession {
    let client_id = match config::spotify_client_id() {
        Ok(id) => id,
        Err(e) => {
            error!("{}", e);
        }
    };

    let accounts = match SpotifyAccounts::new(config::spotify_apitoken_url()) {
        Ok(accounts) => accounts,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
        }
    };

    TokenSession::new(
        ClientCredentials {
            client_id,
            client_secret: config::spotify_client_secret(),
        },
        Arc::new(accounts),
    )
    .with_store(Arc::new(FileCredentialStore::default_location()))
}

/// The session with the persisted token loaded. Exits when nobody is logged in.
pub(crate) async fn load_session() -> Arc<TokenSession> {
    let session = new_session();
    match session.restore().await {
        Ok(true) => Arc::new(session),
        Ok(false) => {
            error!("Not logged in. Please run openster auth first");
        }
        Err(e) => {
            error!("Failed to load token. Please run openster auth\n Error: {}", e);
        }
    }
}

pub(crate) async fn load_orchestrator() -> Arc<PlaybackOrchestrator> {
    let session = load_session().await;
    let player = match SpotifyPlayer::new(config::spotify_apiurl()) {
        Ok(player) => player,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
        }
    };

    Arc::new(PlaybackOrchestrator::new(
        Arc::new(player),
        session,
        Arc::new(SpotifyAppLauncher),
        config::auto_stop_config(),
    ))
}
