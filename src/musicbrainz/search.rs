use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::{
    error::SearchError,
    types::{Recording, RecordingSearchResponse},
};

/// One structured recording search against the metadata service.
///
/// `query` is a Lucene expression such as `recording:"Let It Be" AND
/// artist:"The Beatles"`.
#[async_trait]
pub trait RecordingSearch: Send + Sync {
    async fn search_recordings(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<Recording>, SearchError>;
}

/// HTTP client for the `/recording` search endpoint of the MusicBrainz web service.
#[derive(Debug, Clone)]
pub struct MusicBrainzSearch {
    client: Client,
    base_url: String,
}

impl MusicBrainzSearch {
    pub fn new(base_url: impl Into<String>, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RecordingSearch for MusicBrainzSearch {
    async fn search_recordings(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<Recording>, SearchError> {
        let api_url = format!("{url}/recording/", url = self.base_url);
        let limit = limit.to_string();

        let response = self
            .client
            .get(&api_url)
            .query(&[("query", query), ("fmt", "json"), ("limit", limit.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::SERVICE_UNAVAILABLE || status == StatusCode::BAD_GATEWAY {
            return Err(SearchError::Transient(status));
        }
        if !status.is_success() {
            return Err(SearchError::Rejected(status));
        }

        let json = response.json::<RecordingSearchResponse>().await?;
        Ok(json.recordings)
    }
}
