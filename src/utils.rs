use std::sync::LazyLock;

use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use rand::{Rng, distr::Alphanumeric};
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::error::InputError;

/// Prefix of the payload printed on the back of every card.
pub const CARD_CODE_PREFIX: &str = "os:sp:";

static PLAYLIST_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"spotify\.com/(?:intl-[a-z]{2}/)?(?:embed/)?playlist/([A-Za-z0-9]+)",
        r"^spotify:playlist:([A-Za-z0-9]+)$",
        r"^spotify:user:[^:]+:playlist:([A-Za-z0-9]+)$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid playlist pattern"))
    .collect()
});

static TRACK_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^os:sp:([A-Za-z0-9]{22})$",
        r"^spotify:track:([A-Za-z0-9]{22})$",
        r"^https?://open\.spotify\.com/(?:intl-[a-z]{2}/)?track/([A-Za-z0-9]{22})$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid track pattern"))
    .collect()
});

static BARE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{22}$").expect("valid id pattern"));

pub fn generate_code_verifier() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(128)
        .map(char::from)
        .collect()
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Value for an HTTP `Authorization: Basic` header.
pub fn basic_auth_value(client_id: &str, client_secret: &str) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{}:{}", client_id, client_secret))
    )
}

/// Strips the query string and fragment off a pasted link.
fn strip_query(input: &str) -> &str {
    let end = input.find(['?', '#']).unwrap_or(input.len());
    input[..end].trim_end_matches('/')
}

/// Extracts a playlist id from a share link, an embed link, a `spotify:` URI or
/// a bare 22 character id.
pub fn extract_playlist_id(input: &str) -> Result<String, InputError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(InputError::EmptyInput);
    }

    let clean = strip_query(trimmed);
    for pattern in PLAYLIST_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(clean) {
            return Ok(caps[1].to_string());
        }
    }

    if BARE_ID.is_match(clean) {
        return Ok(clean.to_string());
    }

    Err(InputError::InvalidPlaylistUrl(trimmed.to_string()))
}

/// Parses a scanned card payload into a Spotify track id.
///
/// Accepts the native `os:sp:<id>` code as well as plain Spotify track URIs and
/// `open.spotify.com` links, which older card sheets carry.
pub fn parse_card_code(input: &str) -> Result<String, InputError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(InputError::EmptyInput);
    }

    let clean = strip_query(trimmed);
    TRACK_PATTERNS
        .iter()
        .find_map(|p| p.captures(clean).map(|c| c[1].to_string()))
        .ok_or_else(|| InputError::InvalidCardCode(trimmed.to_string()))
}

/// Payload for the back of a card.
pub fn card_code(track_id: &str) -> String {
    format!("{}{}", CARD_CODE_PREFIX, track_id)
}

/// Reads the year off the front of a date string (`1969`, `1969-09`, `1969-09-26`).
pub fn parse_year_prefix(date: &str) -> Option<u32> {
    let prefix = date.trim().get(..4)?;
    if !prefix.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    prefix.parse::<u32>().ok().filter(|y| *y > 0)
}

pub fn track_uri(track_id: &str) -> String {
    format!("spotify:track:{}", track_id)
}
