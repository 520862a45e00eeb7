use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio::time::sleep;

use crate::{
    error::ApiError,
    types::{PlaylistInfo, PlaylistTracksPage, Track},
    warning,
};

const PAGE_SIZE: u32 = 100;
const BAD_GATEWAY_RETRIES: u32 = 3;
const BAD_GATEWAY_DELAY: Duration = Duration::from_secs(10);

/// Read-only catalog access: playlists and track details.
#[derive(Debug, Clone)]
pub struct SpotifyCatalog {
    client: Client,
    api_url: String,
}

impl SpotifyCatalog {
    pub fn new(api_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub(super) fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Fetches `url` with bearer authentication and decodes the JSON body.
    ///
    /// Spotify's catalog endpoints answer `502 Bad Gateway` now and then,
    /// mostly under load. Those responses are retried after a fixed 10 second
    /// delay, up to three attempts in total. Every other non-success status is
    /// returned on the first try.
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute request URL, usually built with [`Self::url`]
    /// * `token` - A valid access token
    ///
    /// # Returns
    ///
    /// - `Ok(T)` - The decoded response body
    /// - `Err(ApiError::Network)` - Transport failure or a non-success status
    /// - `Err(ApiError::Decode)` - The body did not match `T`
    pub(super) async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        token: &str,
    ) -> Result<T, ApiError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let response = self.client.get(url).bearer_auth(token).send().await?;

            let response = match response.error_for_status() {
                Ok(valid_response) => valid_response,
                Err(err) => {
                    if err.status() == Some(StatusCode::BAD_GATEWAY)
                        && attempt < BAD_GATEWAY_RETRIES
                    {
                        warning!("Spotify returned 502, retrying in 10 seconds");
                        sleep(BAD_GATEWAY_DELAY).await;
                        continue;
                    }
                    return Err(err.into());
                }
            };

            return response
                .json::<T>()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()));
        }
    }

    /// Retrieves name, owner and track count of a playlist.
    ///
    /// Only the fields the import shows are requested (`fields=` filter), so
    /// the response stays small even for huge playlists. The call also serves
    /// as an existence and access check before a long import starts.
    ///
    /// # Arguments
    ///
    /// * `token` - A valid access token with `playlist-read-private`
    /// * `playlist_id` - Bare playlist id, see [`crate::utils::extract_playlist_id`]
    ///
    /// # Returns
    ///
    /// - `Ok(PlaylistInfo)` - Playlist metadata
    /// - `Err(ApiError)` - Unknown or private playlist, or a failed request
    ///
    /// # Example
    ///
    /// ```
    /// let catalog = SpotifyCatalog::new(config::spotify_apiurl())?;
    /// let info = catalog.playlist_info(&token, "37i9dQZF1DXcBWIGoYBM5M").await?;
    /// println!("{} ({} tracks)", info.name, info.tracks.total);
    /// ```
    pub async fn playlist_info(
        &self,
        token: &str,
        playlist_id: &str,
    ) -> Result<PlaylistInfo, ApiError> {
        let url = self.url(&format!(
            "/playlists/{}?fields=id,name,owner(display_name),tracks(total)",
            playlist_id
        ));
        self.get_json(&url, token).await
    }

    /// Retrieves every track of a playlist, in playlist order.
    ///
    /// Pages through `/playlists/{id}/tracks` with 100 items per request until
    /// Spotify reports no `next` page.
    ///
    /// # Arguments
    ///
    /// * `token` - A valid access token
    /// * `playlist_id` - Bare playlist id
    /// * `on_page` - Called with `(fetched, total)` after each page
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<Track>)` - All playable tracks
    /// - `Err(ApiError)` - The first page request that failed
    ///
    /// # Filtering
    ///
    /// Local files and entries Spotify made unavailable carry no track id.
    /// They cannot be played from a card and are dropped, so the result can be
    /// shorter than the playlist's `total`.
    pub async fn playlist_tracks(
        &self,
        token: &str,
        playlist_id: &str,
        mut on_page: impl FnMut(u64, u64),
    ) -> Result<Vec<Track>, ApiError> {
        let mut tracks = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let url = self.url(&format!(
                "/playlists/{}/tracks?limit={}&offset={}",
                playlist_id, PAGE_SIZE, offset
            ));
            let page: PlaylistTracksPage = self.get_json(&url, token).await?;
            let page_len = page.items.len() as u64;

            tracks.extend(
                page.items
                    .into_iter()
                    .filter_map(|item| item.track)
                    .filter_map(|t| t.into_track()),
            );

            offset += page_len;
            on_page(offset.min(page.total), page.total);

            if page.next.is_none() || page_len == 0 {
                break;
            }
        }

        Ok(tracks)
    }
}
