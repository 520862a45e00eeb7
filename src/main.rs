use std::{path::PathBuf, sync::Arc};

use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use openster::{cli, config, error, types::PkceToken};
use tokio::sync::Mutex;

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authorize with Spotify API
    Auth,

    /// Forget the stored Spotify credentials
    Logout,

    /// Import a playlist and resolve the original year of every track
    Import(ImportOptions),

    /// Correct the year of one track in an imported deck
    SetYear(SetYearOptions),

    /// Play a single scanned card
    Play(PlayOptions),

    /// Read card codes from stdin and play them one after the other
    Jukebox,

    /// Pause playback
    Pause,

    /// Resume playback
    Resume,

    /// Show what is playing right now
    Status,

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct ImportOptions {
    /// Playlist link, spotify:playlist URI or id
    playlist: String,

    /// Only use Spotify's release dates, skip the MusicBrainz lookup
    #[clap(long)]
    skip_lookup: bool,

    /// Where to write the deck (defaults to the data directory)
    #[clap(long, short)]
    output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct SetYearOptions {
    /// Deck file written by `import`
    file: PathBuf,

    /// Track id or card code
    track: String,

    /// Original year; leave out to mark the year as unknown
    year: Option<u32>,
}

#[derive(Parser, Debug, Clone)]
pub struct PlayOptions {
    /// Card code (os:sp:<id>), Spotify track URI or link
    code: String,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        Command::Auth => {
            let oauth_result: Arc<Mutex<Option<PkceToken>>> = Arc::new(Mutex::new(None));
            cli::auth(Arc::clone(&oauth_result)).await;
        }
        Command::Logout => cli::logout().await,
        Command::Import(opt) => cli::import(opt.playlist, opt.skip_lookup, opt.output).await,
        Command::SetYear(opt) => cli::set_year(opt.file, opt.track, opt.year).await,
        Command::Play(opt) => cli::play(opt.code).await,
        Command::Jukebox => cli::jukebox().await,
        Command::Pause => cli::pause().await,
        Command::Resume => cli::resume().await,
        Command::Status => cli::status().await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
