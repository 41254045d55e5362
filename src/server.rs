use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::festival::{Edition, FestivalConfig, Weekend};
use crate::lineup::{CompleteLineup, LineupSource, Performance, performances_on_day};
use crate::media::ArtistMedia;
use crate::timetable::{DayTimetable, FestivalClock, GridStage, day_timetable, grid_view};
use artist_media_rs::{SpotifyTrack, YouTubeVideo, artist_id_from_url};

#[derive(Clone)]
pub struct AppState {
    pub lineup: Arc<dyn LineupSource>,
    pub config: Arc<FestivalConfig>,
    pub clock: FestivalClock,
    pub media: ArtistMedia,
}

impl AppState {
    /// Validates the festival settings and builds the shared state
    pub fn new(
        lineup: Arc<dyn LineupSource>,
        config: FestivalConfig,
        media: ArtistMedia,
    ) -> anyhow::Result<Self> {
        let clock = config.clock()?;
        Ok(Self {
            lineup,
            config: Arc::new(config),
            clock,
            media,
        })
    }
}

pub fn create_router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let mut router = Router::new()
        .route("/", get(root))
        .route("/lineup", get(get_lineup))
        .route("/lineup/:year/:weekend/dates", get(get_weekend_dates))
        .route("/timetable/:year/:weekend/:date", get(get_timetable))
        .route("/grid/:year/:weekend/:date", get(get_grid))
        .route("/spotify-search", get(spotify_search))
        .route("/youtube-search", get(youtube_search));

    // Serve the frontend bundle when one is configured
    if let Some(dir) = static_dir {
        tracing::info!("Serving static files from {}", dir.display());
        router = router.nest_service("/web", ServeDir::new(dir));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Festival Lineup API v0.1.0"
}

#[derive(Debug, Deserialize)]
struct LineupQuery {
    year: Option<i32>,
}

/// Complete lineup of one edition, split by weekend
async fn get_lineup(
    State(state): State<AppState>,
    Query(query): Query<LineupQuery>,
) -> Result<Json<CompleteLineup>, StatusCode> {
    let year = query.year.unwrap_or(state.config.default_year);
    tracing::debug!("Fetching lineup for {}", year);

    let Some(edition) = state.config.edition(year) else {
        tracing::warn!("No edition configured for {}", year);
        return Ok(Json(CompleteLineup::default()));
    };

    let lineup = fetch_lineup(&state, edition).await?;
    tracing::debug!(
        "Returning lineup {}: {} + {} performances",
        year,
        lineup.weekend_1.len(),
        lineup.weekend_2.len()
    );
    Ok(Json(lineup))
}

/// Dates of one weekend
async fn get_weekend_dates(
    State(state): State<AppState>,
    Path((year, weekend)): Path<(i32, String)>,
) -> Result<Json<Vec<NaiveDate>>, StatusCode> {
    tracing::debug!("Fetching dates for {} {}", year, weekend);
    let weekend = parse_weekend(&weekend)?;
    let edition = find_edition(&state, year)?;
    Ok(Json(edition.weekend_dates(weekend).to_vec()))
}

/// Positioned timetable for one festival day
async fn get_timetable(
    State(state): State<AppState>,
    Path((year, weekend, date)): Path<(i32, String, String)>,
) -> Result<Json<DayTimetable>, StatusCode> {
    tracing::debug!("Building timetable for {} {} {}", year, weekend, date);
    let performances = performances_for_day(&state, year, &weekend, &date).await?;

    let timetable = day_timetable(&state.clock, &performances, &state.config.stage_order);
    if let DayTimetable::Scheduled { timetable: view } = &timetable {
        tracing::debug!(
            "Timetable {}: {} stages, {:02}:00-{:02}:00",
            date,
            view.stages.len(),
            view.time_range.start_hour,
            view.time_range.end_hour
        );
    }
    Ok(Json(timetable))
}

/// Stage-grouped lineup for one festival day, without geometry
async fn get_grid(
    State(state): State<AppState>,
    Path((year, weekend, date)): Path<(i32, String, String)>,
) -> Result<Json<Vec<GridStage>>, StatusCode> {
    tracing::debug!("Building grid for {} {} {}", year, weekend, date);
    let performances = performances_for_day(&state, year, &weekend, &date).await?;
    let grid = grid_view(&performances, &state.config.stage_order);
    tracing::debug!("Grid {}: {} stages", date, grid.len());
    Ok(Json(grid))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpotifySearchQuery {
    artist_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TopTracksResponse {
    pub tracks: Vec<SpotifyTrack>,
}

/// Top tracks for an artist; accepts a bare id, a `spotify:artist:` URI or a profile link
async fn spotify_search(
    State(state): State<AppState>,
    Query(query): Query<SpotifySearchQuery>,
) -> Result<Json<TopTracksResponse>, StatusCode> {
    let artist_id = artist_id_from_url(&query.artist_id).ok_or_else(|| {
        tracing::warn!("Invalid Spotify artist id: {:?}", query.artist_id);
        StatusCode::BAD_REQUEST
    })?;
    tracing::debug!("Fetching top tracks for {}", artist_id);

    let tracks = state
        .media
        .top_tracks(&artist_id)
        .await
        .ok_or_else(|| {
            tracing::error!("Spotify provider not configured");
            StatusCode::SERVICE_UNAVAILABLE
        })?
        .map_err(|e| {
            tracing::error!("Spotify top tracks error: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    tracing::debug!("Found {} tracks for {}", tracks.len(), artist_id);
    Ok(Json(TopTracksResponse { tracks }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YouTubeSearchQuery {
    artist_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LiveSetsResponse {
    pub items: Vec<YouTubeVideo>,
}

/// Recorded live sets for an artist
async fn youtube_search(
    State(state): State<AppState>,
    Query(query): Query<YouTubeSearchQuery>,
) -> Result<Json<LiveSetsResponse>, StatusCode> {
    let artist_name = query.artist_name.trim();
    if artist_name.is_empty() {
        tracing::warn!("Empty artist name for live set search");
        return Err(StatusCode::BAD_REQUEST);
    }
    tracing::debug!("Searching live sets for {}", artist_name);

    let items = state
        .media
        .live_sets(artist_name)
        .await
        .ok_or_else(|| {
            tracing::error!("YouTube provider not configured");
            StatusCode::SERVICE_UNAVAILABLE
        })?
        .map_err(|e| {
            tracing::error!("YouTube search error: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    tracing::debug!("Found {} live sets for {}", items.len(), artist_name);
    Ok(Json(LiveSetsResponse { items }))
}

fn parse_weekend(weekend: &str) -> Result<Weekend, StatusCode> {
    weekend.parse().map_err(|e| {
        tracing::warn!("{}", e);
        StatusCode::BAD_REQUEST
    })
}

fn find_edition(state: &AppState, year: i32) -> Result<&Edition, StatusCode> {
    state.config.edition(year).ok_or_else(|| {
        tracing::warn!("No edition configured for {}", year);
        StatusCode::NOT_FOUND
    })
}

async fn fetch_lineup(state: &AppState, edition: &Edition) -> Result<CompleteLineup, StatusCode> {
    state.lineup.complete_lineup(edition).await.map_err(|e| {
        tracing::error!("Failed to load lineup {}: {:#}", edition.year, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Performances of the weekend that belong to `date` under the festival-day rule
async fn performances_for_day(
    state: &AppState,
    year: i32,
    weekend: &str,
    date: &str,
) -> Result<Vec<Performance>, StatusCode> {
    let weekend = parse_weekend(weekend)?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
        tracing::warn!("Invalid date: {}", date);
        StatusCode::BAD_REQUEST
    })?;

    let edition = find_edition(state, year)?;
    if !edition.weekend_dates(weekend).contains(&date) {
        tracing::warn!("{} is not part of {} {}", date, year, weekend);
        return Err(StatusCode::NOT_FOUND);
    }

    let lineup = fetch_lineup(state, edition).await?;
    let performances = performances_on_day(&state.clock, lineup.weekend(weekend), date);
    tracing::debug!("{} performances on {}", performances.len(), date);
    Ok(performances)
}
