use anyhow::{Context, Result};
use artist_media_rs::SpotifyApi;
use clap::Parser;
use festival_lineup::lineup::LineupDatabase;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "resolve-artist-ids")]
#[command(about = "Look up Spotify profiles for artists that have none", long_about = None)]
struct Cli {
    /// Path to the lineup database file
    #[arg(short, long, env = "LINEUP_DATABASE_PATH", default_value = "data/lineup.db")]
    database: PathBuf,

    #[arg(long, env = "SPOTIFY_CLIENT_ID")]
    spotify_client_id: String,

    #[arg(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    spotify_client_secret: String,

    /// Pause between Spotify requests
    #[arg(long, default_value = "200")]
    delay_ms: u64,

    /// Perform a dry run without making changes
    #[arg(long, default_value = "false")]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();

    if cli.dry_run {
        tracing::info!("=== DRY RUN MODE - No changes will be made ===");
    }

    let db = LineupDatabase::new(&cli.database)
        .await
        .context("Failed to open lineup database")?;
    let spotify = SpotifyApi::new(cli.spotify_client_id, cli.spotify_client_secret)
        .context("Failed to create Spotify client")?;

    let artists = db.artists_without_spotify().await?;
    tracing::info!("Found {} artists without a Spotify link", artists.len());

    let mut resolved = 0;
    let mut not_found = 0;
    let mut failed = 0;

    for (i, artist) in artists.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(Duration::from_millis(cli.delay_ms)).await;
        }

        match spotify.search_artist(&artist.name).await {
            Ok(Some(found)) => {
                let url = found.profile_url();
                tracing::info!("{} -> {} ({})", artist.name, found.name, url);
                if !cli.dry_run {
                    db.set_artist_spotify(artist.id, &url).await?;
                }
                resolved += 1;
            }
            Ok(None) => {
                tracing::warn!("No Spotify artist found for {}", artist.name);
                not_found += 1;
            }
            Err(e) => {
                tracing::error!("Spotify search failed for {}: {}", artist.name, e);
                failed += 1;
            }
        }
    }

    tracing::info!("=== Resolve Summary ===");
    tracing::info!("Resolved: {}", resolved);
    tracing::info!("Not found: {}", not_found);
    tracing::info!("Failed: {}", failed);

    if cli.dry_run {
        tracing::info!("Dry run complete. Run without --dry-run to store the links.");
    }

    Ok(())
}
