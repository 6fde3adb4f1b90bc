use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use anisource::config::AppConfig;
use anisource::models::{Episode, Show, StreamCandidate};
use anisource::source::AnimeSource;

#[derive(Parser)]
#[command(
    name = "anisource",
    about = "Browse anime metadata and resolve streams from the command line"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List popular shows
    Popular {
        #[arg(long, default_value_t = 1)]
        page: i32,
    },
    /// Search shows by title
    Search {
        query: String,
        #[arg(long, default_value_t = 1)]
        page: i32,
    },
    /// Show full details for an AniList ID
    Details { id: i64 },
    /// List seasons (related shows) for an AniList ID
    Seasons { id: i64 },
    /// List episodes for an AniList ID
    Episodes { id: i64 },
    /// Resolve streams for an episode identifier (as printed by `episodes`)
    Streams { identifier: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "anisource=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load();
    config.log_config();

    let source = AnimeSource::new(config);

    match cli.command {
        Command::Popular { page } => {
            let results = source.popular(page).await?;
            print_shows(&results.shows);
            if results.has_next_page {
                println!("-- more on page {} --", page + 1);
            }
        }
        Command::Search { query, page } => {
            let results = source.search(&query, page).await?;
            print_shows(&results.shows);
            if results.has_next_page {
                println!("-- more on page {} --", page + 1);
            }
        }
        Command::Details { id } => {
            let show = source.details(id).await?;
            println!("{} ({:?})", show.title, show.status);
            if let Some(format) = show.format {
                println!("format: {:?}", format);
            }
            if !show.genres.is_empty() {
                println!("genres: {}", show.genres.join(", "));
            }
            if show.has_seasons {
                println!("related seasons available");
            }
            if !show.description.is_empty() {
                println!("\n{}", show.description);
            }
        }
        Command::Seasons { id } => {
            let seasons = source.seasons(id).await?;
            for season in seasons {
                println!(
                    "Season {:>2}: {} [{}]{}",
                    season.season_number,
                    season.title,
                    season.anilist_id,
                    season
                        .relation
                        .map(|r| format!(" ({})", r.as_api_str()))
                        .unwrap_or_default()
                );
            }
        }
        Command::Episodes { id } => {
            let episodes = source.episodes(id).await?;
            print_episodes(&episodes);
        }
        Command::Streams { identifier } => {
            let streams = source.streams(&identifier).await?;
            print_streams(&streams);
        }
    }

    Ok(())
}

fn print_shows(shows: &[Show]) {
    for show in shows {
        println!("{:>7}  {}", show.id, show.title);
    }
}

fn print_episodes(episodes: &[Episode]) {
    for episode in episodes {
        println!("{:>7}  {}", episode.number, episode.name);
        println!("         {}", episode.identifier.encode());
    }
}

fn print_streams(streams: &[StreamCandidate]) {
    for stream in streams {
        println!("{}", stream.name);
        if !stream.description.is_empty() {
            println!("  {}", stream.description.replace('\n', "\n  "));
        }
        println!("  {}", stream.url);
    }
}
