use std::collections::HashMap;

use crate::{error::ApiError, types::SeveralTracksResponse};

use super::playlist::SpotifyCatalog;

/// `GET /tracks` accepts at most this many ids.
const TRACK_BATCH: usize = 50;

impl SpotifyCatalog {
    /// Looks up the album release date of each track.
    ///
    /// Ids are sent in batches of 50, the maximum `GET /tracks` accepts. The
    /// date is returned with the precision Spotify reports it ("1965",
    /// "1965-08" or "1965-08-06").
    ///
    /// # Arguments
    ///
    /// * `token` - A valid access token
    /// * `track_ids` - Track ids in any order; duplicates are harmless
    ///
    /// # Returns
    ///
    /// - `Ok(HashMap)` - Track id to release date
    /// - `Err(ApiError)` - The first batch that failed
    ///
    /// # Missing Entries
    ///
    /// Tracks Spotify no longer knows, or whose album carries no date, are
    /// absent from the map. The enricher then falls back to MusicBrainz.
    ///
    /// # Example
    ///
    /// ```
    /// let ids: Vec<String> = tracks.iter().map(|t| t.id.clone()).collect();
    /// let dates = catalog.release_dates(&token, &ids).await?;
    /// ```
    pub async fn release_dates(
        &self,
        token: &str,
        track_ids: &[String],
    ) -> Result<HashMap<String, String>, ApiError> {
        let mut dates = HashMap::new();

        for chunk in track_ids.chunks(TRACK_BATCH) {
            let url = self.url(&format!("/tracks?ids={}", chunk.join(",")));
            let response: SeveralTracksResponse = self.get_json(&url, token).await?;

            for track in response.tracks.into_iter().flatten() {
                let date = track
                    .album
                    .and_then(|a| a.release_date)
                    .filter(|d| !d.trim().is_empty());
                if let (Some(id), Some(date)) = (track.id, date) {
                    dates.insert(id, date);
                }
            }
        }

        Ok(dates)
    }
}
