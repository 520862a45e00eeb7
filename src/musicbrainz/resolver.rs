use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use crate::{
    musicbrainz::{RateLimitedClient, RecordingSearch},
    types::{Recording, YearMatch},
    utils,
};

/// Candidates requested for the artist + title query.
pub const PRIMARY_LIMIT: u32 = 10;
/// Candidates requested for the title-only fallback.
pub const TITLE_ONLY_LIMIT: u32 = 5;

const QUALIFIERS: &str =
    r"remaster|remastered|radio edit|live|remix|version|edit|edition|mono|stereo|single|mix";

// "Yesterday - Remastered 2009", "Hey Jude - Live At ..."
static DASH_QUALIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\s+[-–—]\s+.*\b({})\b.*$", QUALIFIERS))
        .expect("valid qualifier pattern")
});

// "(Remastered 2009)", "[Live]", "(feat. Someone)", "(with Someone)"
static BRACKET_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*[\(\[][^\(\)\[\]]*[\)\]]\s*$").expect("valid bracket pattern")
});

static FEAT_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(feat\.?|ft\.|featuring)\s+.*$").expect("valid feat pattern")
});

static ARTIST_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(?:,|&|\s(?:feat\.?|ft\.?|featuring|with|x)\s)\s*")
        .expect("valid separator pattern")
});

/// Strips release qualifiers so the title matches the original recording.
///
/// Falls back to the trimmed input when nothing would be left.
pub fn normalize_title(title: &str) -> String {
    let mut current = title.trim().to_string();
    loop {
        let mut next = DASH_QUALIFIER.replace(&current, "").into_owned();
        next = BRACKET_SUFFIX.replace(&next, "").into_owned();
        next = FEAT_SUFFIX.replace(&next, "").into_owned();
        let next = next.trim().to_string();
        if next == current {
            break;
        }
        current = next;
    }

    if current.is_empty() {
        title.trim().to_string()
    } else {
        current
    }
}

/// First credited artist of a joined credit line.
pub fn normalize_artist(artist: &str) -> String {
    ARTIST_SEPARATOR
        .split(artist.trim())
        .map(str::trim)
        .find(|a| !a.is_empty())
        .unwrap_or_else(|| artist.trim())
        .to_string()
}

fn escape_term(term: &str) -> String {
    term.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Builds the Lucene query for the recording search.
pub fn build_query(title: &str, artist: Option<&str>) -> String {
    match artist {
        Some(artist) => format!(
            "recording:\"{}\" AND artist:\"{}\"",
            escape_term(title),
            escape_term(artist)
        ),
        None => format!("recording:\"{}\"", escape_term(title)),
    }
}

/// Picks the candidate with the earliest first-release year.
///
/// Candidates without a usable date are skipped; on equal years the earlier
/// candidate in source order wins.
fn earliest(recordings: Vec<Recording>) -> Option<YearMatch> {
    let mut best: Option<(u32, Recording)> = None;
    for recording in recordings {
        let Some(year) = recording
            .first_release_date
            .as_deref()
            .and_then(utils::parse_year_prefix)
        else {
            continue;
        };
        if best.as_ref().is_none_or(|(y, _)| year < *y) {
            best = Some((year, recording));
        }
    }

    best.map(|(year, recording)| YearMatch {
        year,
        release_date: recording.first_release_date.unwrap_or_default(),
        matched_artist: recording.artist_credit.into_iter().next().map(|c| c.name),
        matched_title: recording.title,
        recording_id: recording.id,
    })
}

/// Anything that can answer "when was this song first released".
#[async_trait]
pub trait EarliestYearLookup: Send + Sync {
    async fn resolve_earliest_year(&self, artist: &str, title: &str) -> Option<YearMatch>;
}

/// Resolves original release years from MusicBrainz recordings.
#[derive(Clone)]
pub struct MetadataResolver {
    search: Arc<dyn RecordingSearch>,
    limiter: Arc<RateLimitedClient>,
}

impl MetadataResolver {
    pub fn new(search: Arc<dyn RecordingSearch>, limiter: Arc<RateLimitedClient>) -> Self {
        Self { search, limiter }
    }

    async fn search(&self, query: String, limit: u32) -> Vec<Recording> {
        let search = self.search.as_ref();
        let q = query.as_str();
        self.limiter
            .request(q, move || search.search_recordings(q, limit))
            .await
            .unwrap_or_default()
    }
}

#[async_trait]
impl EarliestYearLookup for MetadataResolver {
    async fn resolve_earliest_year(&self, artist: &str, title: &str) -> Option<YearMatch> {
        let title = normalize_title(title);
        let artist = normalize_artist(artist);

        let mut candidates = if artist.is_empty() {
            Vec::new()
        } else {
            self.search(build_query(&title, Some(&artist)), PRIMARY_LIMIT)
                .await
        };

        // Artist credits differ between services far more often than titles do.
        if candidates.is_empty() {
            candidates = self
                .search(build_query(&title, None), TITLE_ONLY_LIMIT)
                .await;
        }

        earliest(candidates)
    }
}
