use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tokio::time::sleep;

use crate::{
    error::ApiError,
    types::{
        Device, DevicesResponse, PlaybackSnapshot, PlayerStateResponse, StartPlaybackRequest,
        TransferPlaybackRequest,
    },
    utils, warning,
};

/// Longest `Retry-After` we are willing to sit out inside a playback call.
const MAX_RETRY_AFTER_SECS: u64 = 5;

/// Playback control endpoints of the streaming service.
///
/// Every call takes the access token explicitly; callers obtain it from a
/// [`TokenSession`](crate::management::TokenSession) right before the call.
#[async_trait]
pub trait PlaybackApi: Send + Sync {
    async fn list_devices(&self, token: &str) -> Result<Vec<Device>, ApiError>;

    async fn transfer_playback(
        &self,
        token: &str,
        device_id: &str,
        play: bool,
    ) -> Result<(), ApiError>;

    async fn start_playback(
        &self,
        token: &str,
        track_id: &str,
        device_id: Option<&str>,
    ) -> Result<(), ApiError>;

    async fn pause(&self, token: &str) -> Result<(), ApiError>;

    async fn resume(&self, token: &str) -> Result<(), ApiError>;

    /// `None` when nothing is playing anywhere.
    async fn playback_state(&self, token: &str) -> Result<Option<PlaybackSnapshot>, ApiError>;
}

/// Spotify Web API implementation of [`PlaybackApi`] (`/me/player/...`).
///
/// # Rate Limiting
///
/// Playback calls happen while a player waits for music, so a
/// `429 Too Many Requests` is only sat out when Spotify asks for at most five
/// seconds. Longer waits are returned as an error right away.
///
/// # Errors
///
/// Non-success responses become [`ApiError::Status`] carrying Spotify's own
/// `error.message`, e.g. "Player command failed: No active device found".
///
/// # Example
///
/// ```
/// let player = SpotifyPlayer::new(config::spotify_apiurl())?;
/// let devices = player.list_devices(&token).await?;
/// if let Some(id) = devices.first().and_then(|d| d.id.as_deref()) {
///     player.start_playback(&token, "4uLU6hMCjMI75M1A2tKUQC", Some(id)).await?;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SpotifyPlayer {
    client: Client,
    api_url: String,
}

impl SpotifyPlayer {
    /// Builds the client with a 30 second request timeout.
    ///
    /// # Arguments
    ///
    /// * `api_url` - Base URL of the Web API, e.g. `https://api.spotify.com/v1`
    pub fn new(api_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Sends the request, sitting out one short `429 Too Many Requests`.
    async fn send(&self, build: impl Fn() -> RequestBuilder) -> Result<Response, ApiError> {
        let response = build().send().await?;
        if response.status() != StatusCode::TOO_MANY_REQUESTS {
            return check(response).await;
        }

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1);
        if retry_after > MAX_RETRY_AFTER_SECS {
            warning!("Spotify asked to wait {} seconds, not retrying", retry_after);
            return check(response).await;
        }

        sleep(Duration::from_secs(retry_after)).await;
        check(build().send().await?).await
    }
}

async fn check(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());
    Err(ApiError::Status { status, message })
}

#[async_trait]
impl PlaybackApi for SpotifyPlayer {
    async fn list_devices(&self, token: &str) -> Result<Vec<Device>, ApiError> {
        let url = self.url("/me/player/devices");
        let response = self
            .send(|| self.client.get(&url).bearer_auth(token))
            .await?;
        let json = response
            .json::<DevicesResponse>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(json.devices)
    }

    async fn transfer_playback(
        &self,
        token: &str,
        device_id: &str,
        play: bool,
    ) -> Result<(), ApiError> {
        let url = self.url("/me/player");
        let body = TransferPlaybackRequest {
            device_ids: vec![device_id.to_string()],
            play,
        };
        self.send(|| self.client.put(&url).bearer_auth(token).json(&body))
            .await?;
        Ok(())
    }

    async fn start_playback(
        &self,
        token: &str,
        track_id: &str,
        device_id: Option<&str>,
    ) -> Result<(), ApiError> {
        let url = self.url("/me/player/play");
        let body = StartPlaybackRequest {
            uris: vec![utils::track_uri(track_id)],
        };
        self.send(|| {
            let mut request = self.client.put(&url).bearer_auth(token).json(&body);
            if let Some(id) = device_id {
                request = request.query(&[("device_id", id)]);
            }
            request
        })
        .await?;
        Ok(())
    }

    async fn pause(&self, token: &str) -> Result<(), ApiError> {
        let url = self.url("/me/player/pause");
        self.send(|| {
            self.client
                .put(&url)
                .bearer_auth(token)
                .header(reqwest::header::CONTENT_LENGTH, 0)
        })
        .await?;
        Ok(())
    }

    async fn resume(&self, token: &str) -> Result<(), ApiError> {
        let url = self.url("/me/player/play");
        self.send(|| {
            self.client
                .put(&url)
                .bearer_auth(token)
                .header(reqwest::header::CONTENT_LENGTH, 0)
        })
        .await?;
        Ok(())
    }

    async fn playback_state(&self, token: &str) -> Result<Option<PlaybackSnapshot>, ApiError> {
        let url = self.url("/me/player");
        let response = self
            .send(|| self.client.get(&url).bearer_auth(token))
            .await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let state = response
            .json::<PlayerStateResponse>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(Some(state.into()))
    }
}
