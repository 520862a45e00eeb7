use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use openster::enrich::{EnrichOptions, TrackEnricher};
use openster::musicbrainz::EarliestYearLookup;
use openster::types::{Track, YearMatch, YearSource};

// Answers from a fixed table keyed by title and records every lookup
#[derive(Default)]
struct FakeLookup {
    answers: HashMap<String, u32>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeLookup {
    fn with(answers: &[(&str, u32)]) -> Arc<Self> {
        Arc::new(Self {
            answers: answers.iter().map(|(t, y)| (t.to_string(), *y)).collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EarliestYearLookup for FakeLookup {
    async fn resolve_earliest_year(&self, artist: &str, title: &str) -> Option<YearMatch> {
        self.calls
            .lock()
            .unwrap()
            .push((artist.to_string(), title.to_string()));
        self.answers.get(title).map(|year| YearMatch {
            year: *year,
            recording_id: format!("mb-{}", title),
            release_date: year.to_string(),
            matched_artist: Some(artist.to_string()),
            matched_title: title.to_string(),
        })
    }
}

fn track(id: &str, name: &str, artists: &[&str]) -> Track {
    Track {
        id: id.to_string(),
        name: name.to_string(),
        artists: artists.iter().map(|a| a.to_string()).collect(),
        album: "Album".to_string(),
        album_image: None,
        duration_ms: 200_000,
    }
}

fn dates(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(id, date)| (id.to_string(), date.to_string()))
        .collect()
}

#[tokio::test]
async fn test_all_lookups_failing_keeps_every_track() {
    let lookup = FakeLookup::with(&[]);
    let enricher = TrackEnricher::new(lookup.clone());
    let tracks: Vec<Track> = (0..5)
        .map(|i| track(&format!("t{}", i), &format!("Song {}", i), &["Artist"]))
        .collect();
    let mut progress = Vec::new();

    let enriched = enricher
        .enrich(
            &tracks,
            &HashMap::new(),
            EnrichOptions::default(),
            |done, total| progress.push((done, total)),
        )
        .await;

    assert_eq!(enriched.len(), tracks.len());
    for (out, input) in enriched.iter().zip(&tracks) {
        assert_eq!(&out.track, input);
        assert_eq!(out.original_year, None);
        assert_eq!(out.year_source, YearSource::Unknown);
    }
    assert_eq!(progress, vec![(1, 5), (2, 5), (3, 5), (4, 5), (5, 5)]);
    assert_eq!(lookup.calls().len(), 5);
}

#[tokio::test]
async fn test_streaming_date_first_then_metadata() {
    let lookup = FakeLookup::with(&[("Second", 1988), ("First", 1900), ("Third", 1900)]);
    let enricher = TrackEnricher::new(lookup.clone());
    let tracks = vec![
        track("a", "First", &["Artist A"]),
        track("b", "Second", &["Artist B", "Guest"]),
        track("c", "Third", &["Artist C"]),
    ];
    let release_dates = dates(&[("a", "1971-11-08"), ("c", "2003")]);

    let enriched = enricher
        .enrich(&tracks, &release_dates, EnrichOptions::default(), |_, _| {})
        .await;

    let years: Vec<Option<u32>> = enriched.iter().map(|t| t.original_year).collect();
    assert_eq!(years, vec![Some(1971), Some(1988), Some(2003)]);

    assert_eq!(enriched[0].year_source, YearSource::Streaming);
    assert_eq!(enriched[0].original_release_date.as_deref(), Some("1971-11-08"));
    assert_eq!(enriched[0].source_recording_id, None);

    assert_eq!(enriched[1].year_source, YearSource::Metadata);
    assert_eq!(enriched[1].source_recording_id.as_deref(), Some("mb-Second"));

    assert_eq!(enriched[2].year_source, YearSource::Streaming);

    // only the track without a streaming date was looked up
    assert_eq!(
        lookup.calls(),
        vec![("Artist B, Guest".to_string(), "Second".to_string())]
    );
}

#[tokio::test]
async fn test_unusable_streaming_date_falls_back() {
    let lookup = FakeLookup::with(&[("Song", 1966)]);
    let enricher = TrackEnricher::new(lookup.clone());
    let tracks = vec![track("a", "Song", &["Artist"])];

    let enriched = enricher
        .enrich(
            &tracks,
            &dates(&[("a", "0000")]),
            EnrichOptions::default(),
            |_, _| {},
        )
        .await;

    assert_eq!(enriched[0].original_year, Some(1966));
    assert_eq!(enriched[0].year_source, YearSource::Metadata);
    assert_eq!(lookup.calls().len(), 1);
}

#[tokio::test]
async fn test_skip_secondary_never_calls_lookup() {
    let lookup = FakeLookup::with(&[("Song", 1966)]);
    let enricher = TrackEnricher::new(lookup.clone());
    let tracks = vec![track("a", "Song", &["Artist"]), track("b", "Other", &["X"])];

    let enriched = enricher
        .enrich(
            &tracks,
            &dates(&[("b", "1999-01-01")]),
            EnrichOptions {
                skip_secondary: true,
            },
            |_, _| {},
        )
        .await;

    assert_eq!(enriched[0].original_year, None);
    assert_eq!(enriched[0].year_source, YearSource::Unknown);
    assert_eq!(enriched[1].original_year, Some(1999));
    assert!(lookup.calls().is_empty());
}

#[tokio::test]
async fn test_empty_playlist() {
    let enricher = TrackEnricher::new(FakeLookup::with(&[]));
    let mut calls = 0;

    let enriched = enricher
        .enrich(&[], &HashMap::new(), EnrichOptions::default(), |_, _| {
            calls += 1
        })
        .await;

    assert!(enriched.is_empty());
    assert_eq!(calls, 0);
}
