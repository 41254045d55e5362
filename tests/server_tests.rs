use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use festival_lineup::festival::{Edition, FestivalConfig};
use festival_lineup::lineup::{Artist, CompleteLineup, LineupSource, Performance, Stage};
use festival_lineup::media::{ArtistMedia, LIVE_SET_TTL, TtlCache, VideoSearchProvider};
use festival_lineup::server::{AppState, create_router};
use artist_media_rs::{Thumbnails, VideoId, VideoSnippet, YouTubeVideo};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn perf(id: &str, stage: (i64, &str), start: &str, end: &str) -> Performance {
    let start_time = utc(start);
    Performance {
        id: id.to_string(),
        name: format!("Artist {}", id),
        kind: "DJ".to_string(),
        artists: vec![Artist::new(1, format!("Artist {}", id))],
        stage: Stage {
            id: stage.0,
            name: stage.1.to_string(),
        },
        stage_host: None,
        date: start_time.date_naive(),
        day: "Friday".to_string(),
        start_time,
        end_time: utc(end),
    }
}

/// Serves a fixed lineup for 2025 and nothing else
struct StaticLineup {
    lineup: CompleteLineup,
}

#[async_trait]
impl LineupSource for StaticLineup {
    async fn complete_lineup(&self, edition: &Edition) -> Result<CompleteLineup> {
        if edition.year == 2025 {
            Ok(self.lineup.clone())
        } else {
            Ok(CompleteLineup::default())
        }
    }
}

struct BrokenLineup;

#[async_trait]
impl LineupSource for BrokenLineup {
    async fn complete_lineup(&self, _edition: &Edition) -> Result<CompleteLineup> {
        anyhow::bail!("database is locked")
    }
}

struct CannedVideos;

#[async_trait]
impl VideoSearchProvider for CannedVideos {
    async fn search_videos(&self, _query: &str, _max_results: u32) -> Result<Vec<YouTubeVideo>> {
        let video = |id: &str, title: &str| YouTubeVideo {
            id: VideoId {
                video_id: id.to_string(),
            },
            snippet: VideoSnippet {
                title: title.to_string(),
                channel_title: "Festival".to_string(),
                thumbnails: Thumbnails::default(),
                published_at: "2025-07-20T12:00:00Z".to_string(),
            },
        };
        Ok(vec![
            video("a", "Sam &amp; Alex live set"),
            video("b", "Unrelated highlights"),
        ])
    }
}

fn sample_lineup() -> CompleteLineup {
    CompleteLineup {
        weekend_1: vec![
            // Friday 23:00 - 01:00 CEST
            perf("late", (2, "CORE"), "2025-07-18T21:00:00Z", "2025-07-18T23:00:00Z"),
            // Friday 20:00 - 22:00 CEST
            perf("main", (1, "MAINSTAGE"), "2025-07-18T18:00:00Z", "2025-07-18T20:00:00Z"),
            // Saturday 12:00 - 12:01 CEST, times not released
            perf("tba", (1, "MAINSTAGE"), "2025-07-19T10:00:00Z", "2025-07-19T10:01:00Z"),
        ],
        weekend_2: Vec::new(),
    }
}

fn app_with(lineup: Arc<dyn LineupSource>, media: ArtistMedia) -> Router {
    let state = AppState::new(lineup, FestivalConfig::default(), media).unwrap();
    create_router(state, None)
}

fn app() -> Router {
    app_with(
        Arc::new(StaticLineup {
            lineup: sample_lineup(),
        }),
        ArtistMedia::disabled(),
    )
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_root() {
    let response = app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_lineup_defaults_to_configured_year() {
    let (status, json) = get(app(), "/lineup").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["WEEKEND_1"].as_array().unwrap().len(), 3);
    assert_eq!(json["WEEKEND_2"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_lineup_unknown_year_is_empty() {
    let (status, json) = get(app(), "/lineup?year=1999").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["WEEKEND_1"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_weekend_dates() {
    let (status, json) = get(app(), "/lineup/2026/WEEKEND_2/dates").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        serde_json::json!(["2026-07-24", "2026-07-25", "2026-07-26"])
    );

    let (status, _) = get(app(), "/lineup/1999/WEEKEND_1/dates").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_friday_timetable() {
    let (status, json) = get(app(), "/timetable/2025/WEEKEND_1/2025-07-18").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "scheduled");

    let timetable = &json["timetable"];
    assert_eq!(timetable["timeRange"]["startHour"], 20);
    assert_eq!(timetable["timeRange"]["endHour"], 25);

    let stages = timetable["stages"].as_array().unwrap();
    assert_eq!(stages.len(), 2);
    assert_eq!(stages[0]["name"], "MAINSTAGE");
    assert_eq!(stages[1]["name"], "CORE");
    assert_eq!(stages[1]["performances"][0]["startMinutes"], 23 * 60);
    assert_eq!(stages[0]["performances"][0]["leftPercent"], 0.0);
}

#[tokio::test]
async fn test_placeholder_day_not_announced() {
    let (status, json) = get(app(), "/timetable/2025/WEEKEND_1/2025-07-19").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "not_announced");
}

#[tokio::test]
async fn test_grid_keeps_received_order() {
    let (status, json) = get(app(), "/grid/2025/1/2025-07-18").await;
    assert_eq!(status, StatusCode::OK);
    let stages = json.as_array().unwrap();
    assert_eq!(stages[0]["name"], "MAINSTAGE");
    assert_eq!(stages[0]["performances"][0]["id"], "main");
    assert_eq!(stages[1]["performances"][0]["id"], "late");
}

#[tokio::test]
async fn test_bad_path_segments() {
    let (status, _) = get(app(), "/timetable/2025/WEEKEND_3/2025-07-18").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(app(), "/timetable/2025/WEEKEND_1/friday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(app(), "/timetable/next/WEEKEND_1/2025-07-18").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Date belongs to the other weekend
    let (status, _) = get(app(), "/timetable/2025/WEEKEND_1/2025-07-25").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_store_failure_is_internal_error() {
    let app = app_with(Arc::new(BrokenLineup), ArtistMedia::disabled());
    let (status, _) = get(app, "/timetable/2025/WEEKEND_1/2025-07-18").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_unconfigured_media_is_unavailable() {
    let (status, _) = get(app(), "/spotify-search?artistId=abc").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = get(app(), "/youtube-search?artistName=Sam").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_media_query_parameters_required() {
    let (status, _) = get(app(), "/spotify-search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(app(), "/youtube-search?artistName=%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_spotify_artist_id_must_be_base62() {
    let (status, _) = get(app(), "/spotify-search?artistId=abc%2F..%2F..%2Fme").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(app(), "/spotify-search?artistId=abc%3Fmarket%3DSE").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Valid forms get past validation and hit the missing provider
    let (status, _) = get(app(), "/spotify-search?artistId=spotify%3Aartist%3A1lJhME1ZpzsEa5M0wW6Mso").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_youtube_search_filters_titles() {
    let media = ArtistMedia::new(
        None,
        Some(Arc::new(CannedVideos)),
        TtlCache::new(LIVE_SET_TTL),
    );
    let app = app_with(
        Arc::new(StaticLineup {
            lineup: sample_lineup(),
        }),
        media,
    );

    let (status, json) = get(app, "/youtube-search?artistName=Sam%20%26%20Alex").await;
    assert_eq!(status, StatusCode::OK);
    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"]["videoId"], "a");
}
