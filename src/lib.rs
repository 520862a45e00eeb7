//! OpenSter companion library
//!
//! This library backs the OpenSter card game companion. It imports Spotify
//! playlists, resolves the original release year of every track (Spotify first,
//! MusicBrainz as a fallback) and drives playback of scanned cards on a connected
//! Spotify device.
//!
//! # Modules
//!
//! - `api` - HTTP API endpoints for the local OAuth callback server
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `enrich` - Per-track original year resolution across a playlist
//! - `error` - Error types shared by the components
//! - `management` - Token session and credential persistence
//! - `musicbrainz` - Rate-limited MusicBrainz client and year resolver
//! - `playback` - Device registry and the playback state machine
//! - `server` - Local HTTP server for OAuth callbacks
//! - `spotify` - Spotify Web API client implementation
//! - `types` - Data structures and type definitions
//! - `utils` - Input parsing and helpers
//!
//! # Example
//!
//! ```no_run
//! use openster::config;
//!
//! #[tokio::main]
//! async fn main() -> openster::Res<()> {
//!     config::load_env().await?;
//!     // Use CLI functions...
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod enrich;
pub mod error;
pub mod management;
pub mod musicbrainz;
pub mod playback;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

/// Result alias used at the application edge.
///
/// Component code returns its own error enums from [`error`]; commands and the
/// binary collapse them into this boxed form. The `Send + Sync` bounds keep it
/// usable across spawned tokio tasks.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints a status line prefixed with a blue `o`.
///
/// Takes the same arguments as `println!`.
///
/// ```ignore
/// info!("Importing playlist {}", playlist_id);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a confirmation line prefixed with a green check mark.
///
/// ```ignore
/// success!("Resolved {} of {} years", resolved, total);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a red `!` line and terminates the process with exit code 1.
///
/// Only command implementations in [`cli`] and the binary may use this. Library
/// components report failures through their return values instead.
///
/// ```ignore
/// error!("Not logged in. Run openster auth first.");
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a recoverable problem prefixed with a yellow `!`.
///
/// Best-effort lookups (MusicBrainz misses, failed transfers) are reported
/// through this macro and then swallowed by the caller.
///
/// ```ignore
/// warning!("Transfer to {} failed, playing directly", device);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
