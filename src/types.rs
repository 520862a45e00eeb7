use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Token pair as persisted in the credential store.
///
/// `expires_at` is an absolute unix timestamp in seconds.
#[derive(Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub scope: String,
    pub expires_at: i64,
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("scope", &self.scope)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// What the accounts service hands back for a code exchange or a refresh.
///
/// `refresh_token` is only present when the service issued (or rotated) one.
#[derive(Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: String,
    pub expires_in: i64,
}

/// Shared between the login flow and the callback handler.
///
/// The handler fills in `code` (or `denied`) once Spotify redirects back.
#[derive(Debug, Clone)]
pub struct PkceToken {
    pub code_verifier: String,
    pub state: String,
    pub code: Option<String>,
    pub denied: Option<String>,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("scope", &self.scope)
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// A track as read from the source playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub album: String,
    pub album_image: Option<String>,
    pub duration_ms: u64,
}

impl Track {
    pub fn artist_display(&self) -> String {
        self.artists.join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YearSource {
    Streaming,
    Metadata,
    Manual,
    Unknown,
}

/// A [`Track`] plus everything the enrichment pass learned about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedTrack {
    #[serde(flatten)]
    pub track: Track,
    pub original_year: Option<u32>,
    pub original_release_date: Option<String>,
    pub source_recording_id: Option<String>,
    pub year_source: YearSource,
}

impl EnrichedTrack {
    pub fn unresolved(track: Track) -> Self {
        Self {
            track,
            original_year: None,
            original_release_date: None,
            source_recording_id: None,
            year_source: YearSource::Unknown,
        }
    }

    /// Applies a hand-edited year. It wins over anything resolved earlier.
    pub fn set_manual_year(&mut self, year: Option<u32>) {
        self.original_year = year;
        self.year_source = YearSource::Manual;
    }
}

#[derive(Tabled)]
pub struct TrackTableRow {
    pub year: String,
    pub artist: String,
    pub title: String,
    pub source: String,
    pub code: String,
}

impl From<&EnrichedTrack> for TrackTableRow {
    fn from(t: &EnrichedTrack) -> Self {
        TrackTableRow {
            year: t
                .original_year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "?".to_string()),
            artist: t.track.artist_display(),
            title: t.track.name.clone(),
            source: format!("{:?}", t.year_source).to_lowercase(),
            code: crate::utils::card_code(&t.track.id),
        }
    }
}

/// Earliest-release match found by the metadata resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearMatch {
    pub year: u32,
    pub recording_id: String,
    pub release_date: String,
    pub matched_artist: Option<String>,
    pub matched_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSearchResponse {
    #[serde(default)]
    pub recordings: Vec<Recording>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub id: String,
    pub title: String,
    #[serde(rename = "first-release-date")]
    pub first_release_date: Option<String>,
    #[serde(rename = "artist-credit", default)]
    pub artist_credit: Vec<ArtistCredit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistCredit {
    pub name: String,
}

/// A playback device, as a point-in-time snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Restricted devices are listed without an id and cannot be targeted.
    pub id: Option<String>,
    pub name: String,
    pub is_active: bool,
    #[serde(rename = "type", default)]
    pub device_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevicesResponse {
    #[serde(default)]
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackIntent {
    pub track_id: String,
    pub awaiting_return: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub track_id: Option<String>,
    pub track_name: Option<String>,
    pub artists: Vec<String>,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub is_playing: bool,
    pub device_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerStateResponse {
    pub device: Option<Device>,
    pub progress_ms: Option<u64>,
    #[serde(default)]
    pub is_playing: bool,
    pub item: Option<SpotifyTrack>,
}

impl From<PlayerStateResponse> for PlaybackSnapshot {
    fn from(state: PlayerStateResponse) -> Self {
        let item = state.item;
        PlaybackSnapshot {
            track_id: item.as_ref().and_then(|t| t.id.clone()),
            track_name: item.as_ref().map(|t| t.name.clone()),
            artists: item
                .as_ref()
                .map(|t| t.artists.iter().map(|a| a.name.clone()).collect())
                .unwrap_or_default(),
            position_ms: state.progress_ms.unwrap_or(0),
            duration_ms: item.as_ref().map(|t| t.duration_ms).unwrap_or(0),
            is_playing: state.is_playing,
            device_name: state.device.map(|d| d.name),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyTrack {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
    pub album: Option<SpotifyAlbum>,
    #[serde(default)]
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyAlbum {
    pub name: String,
    pub release_date: Option<String>,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
}

impl SpotifyTrack {
    /// Converts into the playlist model. Local files and removed tracks come
    /// back without an id and are skipped.
    pub fn into_track(self) -> Option<Track> {
        let id = self.id?;
        let (album, album_image) = match self.album {
            Some(a) => (a.name, a.images.into_iter().next().map(|i| i.url)),
            None => (String::new(), None),
        };
        Some(Track {
            id,
            name: self.name,
            artists: self.artists.into_iter().map(|a| a.name).collect(),
            album,
            album_image,
            duration_ms: self.duration_ms,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistTracksPage {
    pub items: Vec<PlaylistItem>,
    pub total: u64,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub track: Option<SpotifyTrack>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeveralTracksResponse {
    pub tracks: Vec<Option<SpotifyTrack>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistInfo {
    pub id: String,
    pub name: String,
    pub owner: PlaylistOwner,
    pub tracks: PlaylistTotal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistOwner {
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistTotal {
    pub total: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferPlaybackRequest {
    pub device_ids: Vec<String>,
    pub play: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartPlaybackRequest {
    pub uris: Vec<String>,
}
