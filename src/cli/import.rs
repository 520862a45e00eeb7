use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use indicatif::{ProgressBar, ProgressStyle};
use tabled::Table;

use crate::{
    config,
    enrich::{EnrichOptions, TrackEnricher},
    error, info,
    musicbrainz::{MetadataResolver, MusicBrainzSearch, RateLimitedClient},
    spotify::SpotifyCatalog,
    success,
    types::{EnrichedTrack, TrackTableRow, YearSource},
    utils, warning,
};

use super::load_session;

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb
}

fn default_output(playlist_id: &str) -> PathBuf {
    let mut path = config::data_dir();
    path.push("imports");
    path.push(format!("{}.json", playlist_id));
    path
}

/// Imports a playlist as a card deck.
///
/// Years come from Spotify's album release dates first. With `skip_lookup`
/// the gaps stay empty instead of being looked up on MusicBrainz.
pub async fn import(playlist: String, skip_lookup: bool, output: Option<PathBuf>) {
    let playlist_id = match utils::extract_playlist_id(&playlist) {
        Ok(id) => id,
        Err(e) => {
            error!("{}", e);
        }
    };

    let session = load_session().await;
    let catalog = match SpotifyCatalog::new(config::spotify_apiurl()) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
        }
    };

    let token = match session.get_valid_access_token().await {
        Ok(token) => token,
        Err(e) => {
            error!("{}", e);
        }
    };

    let playlist_info = match catalog.playlist_info(&token, &playlist_id).await {
        Ok(info) => info,
        Err(e) => {
            error!("Cannot read playlist {}: {}", playlist_id, e);
        }
    };
    info!(
        "Importing \"{}\" by {} ({} tracks)",
        playlist_info.name,
        playlist_info
            .owner
            .display_name
            .as_deref()
            .unwrap_or("unknown"),
        playlist_info.tracks.total
    );

    let pb = spinner("Fetching playlist tracks...");
    let tracks = match catalog
        .playlist_tracks(&token, &playlist_id, |fetched, total| {
            pb.set_message(format!("Fetched {}/{} tracks...", fetched, total))
        })
        .await
    {
        Ok(tracks) => tracks,
        Err(e) => {
            pb.finish_and_clear();
            error!("Failed to fetch playlist tracks: {}", e);
        }
    };
    pb.set_message("Fetching release dates...");

    // A long playlist read may have outlived the token.
    let token = match session.get_valid_access_token().await {
        Ok(token) => token,
        Err(e) => {
            pb.finish_and_clear();
            error!("{}", e);
        }
    };
    let ids: Vec<String> = tracks.iter().map(|t| t.id.clone()).collect();
    let release_dates = match catalog.release_dates(&token, &ids).await {
        Ok(dates) => dates,
        Err(e) => {
            warning!("Could not fetch release dates, relying on MusicBrainz: {}", e);
            Default::default()
        }
    };
    pb.finish_and_clear();

    let search = match MusicBrainzSearch::new(
        config::musicbrainz_apiurl(),
        &config::musicbrainz_user_agent(),
    ) {
        Ok(search) => search,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
        }
    };
    let resolver = MetadataResolver::new(
        Arc::new(search),
        Arc::new(RateLimitedClient::new(config::rate_limit_config())),
    );
    let enricher = TrackEnricher::new(Arc::new(resolver));

    let pb = ProgressBar::new(tracks.len() as u64);
    if let Ok(style) =
        ProgressStyle::with_template("{bar:40.blue/white} {pos}/{len} {msg} ({elapsed})")
    {
        pb.set_style(style);
    }
    pb.set_message("resolving years");

    let enriched = enricher
        .enrich(
            &tracks,
            &release_dates,
            EnrichOptions {
                skip_secondary: skip_lookup,
            },
            |done, _total| pb.set_position(done as u64),
        )
        .await;
    pb.finish_and_clear();

    print_deck(&enriched);

    let path = output.unwrap_or_else(|| default_output(&playlist_id));
    match write_deck(&path, &enriched).await {
        Ok(()) => success!("Saved {} cards to {}", enriched.len(), path.display()),
        Err(e) => {
            error!("Failed to write {}: {}", path.display(), e);
        }
    }
}

fn print_deck(deck: &[EnrichedTrack]) {
    let rows: Vec<TrackTableRow> = deck.iter().map(TrackTableRow::from).collect();
    println!("{}", Table::new(rows));

    let count = |source: YearSource| deck.iter().filter(|t| t.year_source == source).count();
    info!(
        "{} from Spotify, {} from MusicBrainz, {} unknown",
        count(YearSource::Streaming),
        count(YearSource::Metadata),
        count(YearSource::Unknown)
    );
}

async fn write_deck(path: &Path, deck: &[EnrichedTrack]) -> crate::Res<()> {
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(deck)?;
    async_fs::write(path, json).await?;
    Ok(())
}

async fn read_deck(path: &Path) -> crate::Res<Vec<EnrichedTrack>> {
    let content = async_fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Sets the year of one track in an imported deck. `year = None` marks it as
/// deliberately unknown. The track is matched by id or card code.
pub async fn set_year(file: PathBuf, track: String, year: Option<u32>) {
    let track_id = utils::parse_card_code(&track).unwrap_or_else(|_| track.trim().to_string());

    let mut deck = match read_deck(&file).await {
        Ok(deck) => deck,
        Err(e) => {
            error!("Failed to read {}: {}", file.display(), e);
        }
    };

    let Some(card) = deck.iter_mut().find(|t| t.track.id == track_id) else {
        error!("Track {} is not part of {}", track_id, file.display());
    };
    card.set_manual_year(year);
    let label = format!("{} - {}", card.track.artist_display(), card.track.name);

    match write_deck(&file, &deck).await {
        Ok(()) => success!(
            "{}: year set to {}",
            label,
            year.map(|y| y.to_string()).unwrap_or_else(|| "unknown".to_string())
        ),
        Err(e) => {
            error!("Failed to write {}: {}", file.display(), e);
        }
    }
}
