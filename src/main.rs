use anyhow::{Context, Result};
use artist_media_rs::{SpotifyApi, YouTubeApi};
use clap::Parser;
use festival_lineup::festival::FestivalConfig;
use festival_lineup::lineup::LineupDatabase;
use festival_lineup::media::{
    ArtistMedia, LIVE_SET_TTL, TopTracksProvider, TtlCache, VideoSearchProvider,
};
use festival_lineup::server::{self, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "festival-lineup")]
#[command(about = "Festival Lineup Server", long_about = None)]
struct Cli {
    /// Path to the lineup database file
    #[arg(short, long, env = "LINEUP_DATABASE_PATH", default_value = "data/lineup.db")]
    database: PathBuf,

    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Festival settings (TOML); built-in defaults when omitted
    #[arg(short, long, env = "FESTIVAL_CONFIG")]
    config: Option<PathBuf>,

    /// Directory with the web client, served under /web
    #[arg(long)]
    static_dir: Option<PathBuf>,

    #[arg(long, env = "SPOTIFY_CLIENT_ID")]
    spotify_client_id: Option<String>,

    #[arg(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    spotify_client_secret: Option<String>,

    /// YouTube Data API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    google_api_key: Option<String>,
}

fn spotify_provider(cli: &Cli) -> Option<Arc<dyn TopTracksProvider>> {
    let (Some(id), Some(secret)) = (&cli.spotify_client_id, &cli.spotify_client_secret) else {
        tracing::warn!("Spotify credentials not set, /spotify-search disabled");
        return None;
    };

    match SpotifyApi::new(id.as_str(), secret.as_str()) {
        Ok(api) => Some(Arc::new(api)),
        Err(e) => {
            tracing::warn!("Failed to initialize Spotify client: {}", e);
            None
        }
    }
}

fn youtube_provider(cli: &Cli) -> Option<Arc<dyn VideoSearchProvider>> {
    let Some(key) = &cli.google_api_key else {
        tracing::warn!("GOOGLE_API_KEY not set, /youtube-search disabled");
        return None;
    };

    match YouTubeApi::new(key.as_str()) {
        Ok(api) => Some(Arc::new(api)),
        Err(e) => {
            tracing::warn!("Failed to initialize YouTube client: {}", e);
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing, debug unless RUST_LOG says otherwise
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let cli = Cli::parse();

    if let Some(dir) = &cli.static_dir {
        if !dir.is_dir() {
            anyhow::bail!("Static directory does not exist: {}", dir.display());
        }
    }

    tracing::info!("Starting Festival Lineup");
    tracing::info!("Database path: {}", cli.database.display());

    let config = FestivalConfig::load(cli.config.as_deref())?;
    let lineup = LineupDatabase::new(&cli.database)
        .await
        .context("Failed to open lineup database")?;

    let media = ArtistMedia::new(
        spotify_provider(&cli),
        youtube_provider(&cli),
        TtlCache::new(LIVE_SET_TTL),
    );

    tracing::info!(
        "Configured editions: {:?}, default {}",
        config.years(),
        config.default_year
    );
    tracing::info!(
        "Media providers: spotify={}, youtube={}",
        media.has_top_tracks(),
        media.has_videos()
    );

    let state = AppState::new(Arc::new(lineup), config, media)?;
    let app = server::create_router(state, cli.static_dir.clone());
    let addr = format!("0.0.0.0:{}", cli.port);

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  GET  /                                - API info");
    tracing::info!("  GET  /lineup?year=                    - Complete lineup");
    tracing::info!("  GET  /lineup/:year/:weekend/dates     - Weekend dates");
    tracing::info!("  GET  /timetable/:year/:weekend/:date  - Day timetable");
    tracing::info!("  GET  /grid/:year/:weekend/:date       - Day grid");
    tracing::info!("  GET  /spotify-search?artistId=        - Artist top tracks");
    tracing::info!("  GET  /youtube-search?artistName=      - Artist live sets");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
