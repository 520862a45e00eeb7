//! # Spotify Integration Module
//!
//! HTTP clients for the parts of the Spotify Web API OpenSter uses.
//!
//! ## Modules
//!
//! - [`auth`] - OAuth 2.0 authorization-code flow with PKCE, the local callback
//!   login and the token endpoint used by [`TokenSession`](crate::management::TokenSession)
//! - [`player`] - Device listing, transfer, play/pause/resume and the current
//!   playback state, behind the [`player::PlaybackApi`] trait
//! - [`playlist`] - Paginated playlist reads (100 items per page)
//! - [`tracks`] - Batch track lookups (50 ids per request) that yield the album
//!   release date of each track
//!
//! ## Conventions
//!
//! - Every client is built once with a 30 second request timeout and reused
//! - Access tokens are passed per call; no client holds a session
//! - Failures surface as [`ApiError`](crate::error::ApiError) with the HTTP
//!   status and Spotify's error message when there is one
//!
//! ```text
//! cli (import, play, jukebox)
//!      ↓
//! TokenSession ── spotify::auth ── accounts.spotify.com
//!      ↓
//! spotify::{player, playlist, tracks} ── api.spotify.com/v1
//! ```

pub mod auth;
pub mod player;
pub mod playlist;
pub mod tracks;

pub use player::{PlaybackApi, SpotifyPlayer};
pub use playlist::SpotifyCatalog;
