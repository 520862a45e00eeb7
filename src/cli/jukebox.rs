use std::time::Duration;

use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};

use crate::{
    error,
    error::PlaybackError,
    info,
    playback::{AppEvent, ControlOutcome, PlayOutcome, PlaybackOrchestrator, ResumeOutcome},
    success, utils, warning,
};

use super::load_orchestrator;

fn report_play(outcome: Result<PlayOutcome, PlaybackError>) {
    match outcome {
        Ok(PlayOutcome::Started { device }) => success!("Playing on {}", device),
        Ok(PlayOutcome::AwaitingWake) => {
            info!("Spotify is starting. Come back here and continue once it is open.")
        }
        Ok(PlayOutcome::Busy) => warning!("Still starting the previous card"),
        Err(PlaybackError::Auth(e)) if e.requires_login() => {
            error!("{}", e);
        }
        Err(e) => warning!("{}", e),
    }
}

fn report_control(what: &str, outcome: Result<ControlOutcome, PlaybackError>) {
    match outcome {
        Ok(ControlOutcome::Done) => success!("{}", what),
        Ok(ControlOutcome::Suppressed) => info!("Ignored, too soon after the last command"),
        Err(e) => warning!("{} failed: {}", what, e),
    }
}

async fn print_status(orchestrator: &PlaybackOrchestrator) {
    match orchestrator.playback_snapshot().await {
        Ok(Some(snapshot)) => {
            info!(
                "{} {} - {} [{}/{}] on {}",
                if snapshot.is_playing { "▶" } else { "⏸" },
                snapshot.artists.join(", "),
                snapshot.track_name.as_deref().unwrap_or("unknown"),
                format_ms(snapshot.position_ms),
                format_ms(snapshot.duration_ms),
                snapshot.device_name.as_deref().unwrap_or("unknown device")
            );
        }
        Ok(None) => info!("Nothing is playing"),
        Err(e) => warning!("Could not read playback state: {}", e),
    }
    if let Some(intent) = orchestrator.pending_intent() {
        info!("Waiting for Spotify to start card {}", intent.track_id);
    }
}

fn format_ms(ms: u64) -> String {
    let secs = Duration::from_millis(ms).as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Plays a single card. When Spotify first has to be started, waits for the
/// user to confirm it is open and then finishes the scan.
pub async fn play(code: String) {
    let track_id = match utils::parse_card_code(&code) {
        Ok(id) => id,
        Err(e) => {
            error!("{}", e);
        }
    };

    let orchestrator = load_orchestrator().await;
    let outcome = orchestrator.play_track(&track_id).await;
    let awaiting = matches!(outcome, Ok(PlayOutcome::AwaitingWake));
    report_play(outcome);
    if !awaiting {
        return;
    }

    info!("Press Enter once Spotify is open");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    if let Err(e) = lines.next_line().await {
        error!("Failed to read from stdin: {}", e);
    }

    match orchestrator.on_app_foregrounded().await {
        Ok(ResumeOutcome::Started { device }) => success!("Playing on {}", device),
        Ok(ResumeOutcome::NoPendingIntent) => {}
        Err(e) => {
            error!("{}", e);
        }
    }
}

/// Reads card codes line by line from stdin and plays each of them.
///
/// Besides card codes, these commands are understood: `pause`, `resume`,
/// `status`, `back` (Spotify is open now) and `quit`.
pub async fn jukebox() {
    let orchestrator = load_orchestrator().await;
    let (events, receiver) = mpsc::channel(8);
    let subscription = orchestrator.watch_foreground(receiver);

    info!("Jukebox ready. Scan a card, or type pause, resume, status, back or quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warning!("Failed to read from stdin: {}", e);
                break;
            }
        };

        match line.trim().to_lowercase().as_str() {
            "" => continue,
            "quit" | "exit" => break,
            "pause" => report_control("Paused", orchestrator.pause().await),
            "resume" => report_control("Resumed", orchestrator.resume().await),
            "status" => print_status(&orchestrator).await,
            "back" => {
                if events.send(AppEvent::Foregrounded).await.is_err() {
                    warning!("Foreground listener is gone");
                }
            }
            _ => match utils::parse_card_code(&line) {
                Ok(track_id) => report_play(orchestrator.play_track(&track_id).await),
                Err(e) => warning!("{}", e),
            },
        }
    }

    subscription.unsubscribe();
    orchestrator.abandon();
    info!("Jukebox closed");
}

pub async fn pause() {
    let orchestrator = load_orchestrator().await;
    report_control("Paused", orchestrator.pause().await);
}

pub async fn resume() {
    let orchestrator = load_orchestrator().await;
    report_control("Resumed", orchestrator.resume().await);
}

pub async fn status() {
    let orchestrator = load_orchestrator().await;
    print_status(&orchestrator).await;
}
