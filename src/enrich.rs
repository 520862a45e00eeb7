//! Per-track original year resolution across a whole playlist.
//!
//! Spotify's own album release date is used whenever it is present; only the
//! gaps are sent to MusicBrainz. Tracks are processed one after the other since
//! the MusicBrainz client is single-lane anyway.

use std::{collections::HashMap, sync::Arc};

use crate::{
    info,
    musicbrainz::EarliestYearLookup,
    types::{EnrichedTrack, Track, YearSource},
    utils,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct EnrichOptions {
    /// Quick import: never ask the secondary metadata service.
    pub skip_secondary: bool,
}

pub struct TrackEnricher {
    resolver: Arc<dyn EarliestYearLookup>,
}

impl TrackEnricher {
    pub fn new(resolver: Arc<dyn EarliestYearLookup>) -> Self {
        Self { resolver }
    }

    /// Enriches `tracks` in order.
    ///
    /// `release_dates` maps track ids to the streaming service's release date.
    /// `progress` is called with `(done, total)` after every track. The result
    /// always has exactly one entry per input track, in input order.
    pub async fn enrich<P>(
        &self,
        tracks: &[Track],
        release_dates: &HashMap<String, String>,
        options: EnrichOptions,
        mut progress: P,
    ) -> Vec<EnrichedTrack>
    where
        P: FnMut(usize, usize),
    {
        let total = tracks.len();
        let mut enriched = Vec::with_capacity(total);

        for (i, track) in tracks.iter().enumerate() {
            enriched.push(self.enrich_one(track, release_dates, options).await);
            progress(i + 1, total);
        }

        enriched
    }

    async fn enrich_one(
        &self,
        track: &Track,
        release_dates: &HashMap<String, String>,
        options: EnrichOptions,
    ) -> EnrichedTrack {
        let mut result = EnrichedTrack::unresolved(track.clone());

        if let Some(date) = release_dates.get(&track.id) {
            if let Some(year) = utils::parse_year_prefix(date) {
                result.original_year = Some(year);
                result.original_release_date = Some(date.clone());
                result.year_source = YearSource::Streaming;
                return result;
            }
        }

        if options.skip_secondary {
            return result;
        }

        match self
            .resolver
            .resolve_earliest_year(&track.artist_display(), &track.name)
            .await
        {
            Some(found) => {
                result.original_year = Some(found.year);
                result.original_release_date = Some(found.release_date);
                result.source_recording_id = Some(found.recording_id);
                result.year_source = YearSource::Metadata;
            }
            None => info!(
                "No original year found for {} - {}",
                track.artist_display(),
                track.name
            ),
        }

        result
    }
}
