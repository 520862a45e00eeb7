//! # MusicBrainz Module
//!
//! Cross-references tracks against MusicBrainz to find the year a recording
//! was first released. Spotify reports the date of the album a track sits on,
//! which for compilations and remasters can be decades late.
//!
//! ```text
//! TrackEnricher
//!      ↓
//! MetadataResolver   (normalization, primary + title-only query, earliest wins)
//!      ↓
//! RateLimitedClient  (1 req/s pacing, one retry on 502/503)
//!      ↓
//! RecordingSearch    (HTTP: /ws/2/recording)
//! ```
//!
//! Every lookup is best effort. Failures end up as `None` and a warning, never
//! as an error that could abort an import.

mod client;
mod resolver;
mod search;

pub use client::{RateLimitConfig, RateLimitedClient};
pub use resolver::{
    EarliestYearLookup, MetadataResolver, PRIMARY_LIMIT, TITLE_ONLY_LIMIT, build_query,
    normalize_artist, normalize_title,
};
pub use search::{MusicBrainzSearch, RecordingSearch};
