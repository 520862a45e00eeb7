//! # API Module
//!
//! Endpoints served by the short-lived local HTTP server that exists only
//! while `openster auth` is running.
//!
//! - [`callback`] receives the OAuth redirect from Spotify, checks the `state`
//!   parameter and hands the authorization code to the waiting login flow.
//! - [`health`] answers with the service name and version.
//!
//! ```rust,ignore
//! use axum::{Router, routing::get};
//! use openster::api::{callback, health};
//!
//! let app = Router::new()
//!     .route("/callback", get(callback))
//!     .route("/health", get(health));
//! ```

mod callback;
mod health;

pub use callback::callback;
pub use health::health;
