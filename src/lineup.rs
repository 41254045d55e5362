use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;

use crate::festival::{Edition, Weekend};
use crate::timetable::FestivalClock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: i64,
    pub name: String,
    pub image: Option<String>,
    /// Spotify profile link
    pub spotify: Option<String>,
    pub instagram: Option<String>,
    pub facebook: Option<String>,
    pub tiktok: Option<String>,
    pub youtube: Option<String>,
    pub website: Option<String>,
}

impl Artist {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            image: None,
            spotify: None,
            instagram: None,
            facebook: None,
            tiktok: None,
            youtube: None,
            website: None,
        }
    }
}

/// One set on one stage, as handed to the timetable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Display order
    pub artists: Vec<Artist>,
    pub stage: Stage,
    pub stage_host: Option<String>,
    pub date: NaiveDate,
    pub day: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Performance as written to the store
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPerformance {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    pub stage_id: i64,
    pub date: NaiveDate,
    pub day: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Display order
    #[serde(default)]
    pub artist_ids: Vec<i64>,
}

fn default_kind() -> String {
    "DJ".to_string()
}

/// Both weekends of one edition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompleteLineup {
    #[serde(rename = "WEEKEND_1")]
    pub weekend_1: Vec<Performance>,
    #[serde(rename = "WEEKEND_2")]
    pub weekend_2: Vec<Performance>,
}

impl CompleteLineup {
    pub fn weekend(&self, weekend: Weekend) -> &[Performance] {
        match weekend {
            Weekend::Weekend1 => &self.weekend_1,
            Weekend::Weekend2 => &self.weekend_2,
        }
    }

    fn weekend_mut(&mut self, weekend: Weekend) -> &mut Vec<Performance> {
        match weekend {
            Weekend::Weekend1 => &mut self.weekend_1,
            Weekend::Weekend2 => &mut self.weekend_2,
        }
    }
}

/// Stored values that cannot be turned into a Performance
#[derive(Debug, thiserror::Error)]
pub enum LineupError {
    #[error("performance {performance_id}: invalid {field} '{value}'")]
    InvalidTimestamp {
        performance_id: String,
        field: &'static str,
        value: String,
    },
    #[error("performance {performance_id}: invalid date '{value}'")]
    InvalidDate {
        performance_id: String,
        value: String,
    },
}

/// Supplier of lineup data for the API
#[async_trait]
pub trait LineupSource: Send + Sync {
    /// Every performance of an edition, split by weekend
    async fn complete_lineup(&self, edition: &Edition) -> Result<CompleteLineup>;
}

/// Performances belonging to `date` under the festival-day rule
pub fn performances_on_day(
    clock: &FestivalClock,
    performances: &[Performance],
    date: NaiveDate,
) -> Vec<Performance> {
    performances
        .iter()
        .filter(|p| clock.festival_day(&p.start_time) == date)
        .cloned()
        .collect()
}

fn parse_instant(performance_id: &str, field: &'static str, value: &str) -> Result<DateTime<Utc>, LineupError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| LineupError::InvalidTimestamp {
            performance_id: performance_id.to_string(),
            field,
            value: value.to_string(),
        })
}

fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

type PerformanceRow = (i64, String, String, i64, String, String, String, String, String);
type ArtistRow = (
    i64,
    i64,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

#[derive(Debug, Clone)]
pub struct LineupDatabase {
    pool: SqlitePool,
}

impl LineupDatabase {
    /// Open (or create) the lineup database
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let connection_string = format!("sqlite:{}", db_path.display());
        let options = SqliteConnectOptions::from_str(&connection_string)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| {
                format!("Failed to connect to lineup database at: {}", db_path.display())
            })?;

        let db = Self { pool };
        db.initialize().await?;

        tracing::info!("Lineup database initialized: {}", db_path.display());
        Ok(db)
    }

    /// Initialize database schema
    async fn initialize(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS stages (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS artists (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                image TEXT,
                spotify TEXT,
                instagram TEXT,
                facebook TEXT,
                tiktok TEXT,
                youtube TEXT,
                website TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS performances (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                type TEXT NOT NULL,
                stage_id INTEGER NOT NULL REFERENCES stages(id),
                date TEXT NOT NULL,
                day TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS performance_artists (
                performance_id INTEGER NOT NULL REFERENCES performances(id) ON DELETE CASCADE,
                artist_id INTEGER NOT NULL REFERENCES artists(id),
                position INTEGER NOT NULL,
                PRIMARY KEY (performance_id, artist_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS stage_hosts (
                stage_id INTEGER NOT NULL REFERENCES stages(id),
                date TEXT NOT NULL,
                stage_host TEXT NOT NULL,
                PRIMARY KEY (stage_id, date)
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_performances_date
            ON performances(date)
            "#,
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to initialize lineup schema")?;
        }

        Ok(())
    }

    /// Insert or update a stage
    pub async fn upsert_stage(&self, stage: &Stage) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stages (id, name) VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name
            "#,
        )
        .bind(stage.id)
        .bind(&stage.name)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to save stage {}", stage.id))?;

        Ok(())
    }

    /// Insert or update an artist
    pub async fn upsert_artist(&self, artist: &Artist) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO artists (id, name, image, spotify, instagram, facebook, tiktok, youtube, website)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                image = excluded.image,
                spotify = excluded.spotify,
                instagram = excluded.instagram,
                facebook = excluded.facebook,
                tiktok = excluded.tiktok,
                youtube = excluded.youtube,
                website = excluded.website
            "#,
        )
        .bind(artist.id)
        .bind(&artist.name)
        .bind(&artist.image)
        .bind(&artist.spotify)
        .bind(&artist.instagram)
        .bind(&artist.facebook)
        .bind(&artist.tiktok)
        .bind(&artist.youtube)
        .bind(&artist.website)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to save artist {}", artist.id))?;

        Ok(())
    }

    /// Insert or replace a performance together with its ordered artist list
    pub async fn insert_performance(&self, performance: &NewPerformance) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query(
            r#"
            INSERT INTO performances (id, name, type, stage_id, date, day, start_time, end_time)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                type = excluded.type,
                stage_id = excluded.stage_id,
                date = excluded.date,
                day = excluded.day,
                start_time = excluded.start_time,
                end_time = excluded.end_time
            "#,
        )
        .bind(performance.id)
        .bind(&performance.name)
        .bind(&performance.kind)
        .bind(performance.stage_id)
        .bind(performance.date.to_string())
        .bind(&performance.day)
        .bind(format_instant(&performance.start_time))
        .bind(format_instant(&performance.end_time))
        .execute(&mut *tx)
        .await
        .with_context(|| format!("Failed to insert performance {}", performance.id))?;

        sqlx::query("DELETE FROM performance_artists WHERE performance_id = ?")
            .bind(performance.id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear performance artists")?;

        for (position, artist_id) in performance.artist_ids.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO performance_artists (performance_id, artist_id, position)
                VALUES (?, ?, ?)
                "#,
            )
            .bind(performance.id)
            .bind(*artist_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await
            .with_context(|| {
                format!(
                    "Failed to link artist {} to performance {}",
                    artist_id, performance.id
                )
            })?;
        }

        tx.commit().await.context("Failed to commit performance")?;
        Ok(())
    }

    /// Set the host label of a stage for one date
    pub async fn set_stage_host(&self, stage_id: i64, date: NaiveDate, stage_host: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stage_hosts (stage_id, date, stage_host) VALUES (?, ?, ?)
            ON CONFLICT(stage_id, date) DO UPDATE SET stage_host = excluded.stage_host
            "#,
        )
        .bind(stage_id)
        .bind(date.to_string())
        .bind(stage_host)
        .execute(&self.pool)
        .await
        .context("Failed to save stage host")?;

        Ok(())
    }

    /// Ids of every stored stage
    pub async fn stage_ids(&self) -> Result<HashSet<i64>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM stages")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch stage ids")?;
        Ok(ids.into_iter().collect())
    }

    /// Ids of every stored artist
    pub async fn artist_ids(&self) -> Result<HashSet<i64>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM artists")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch artist ids")?;
        Ok(ids.into_iter().collect())
    }

    /// Artists that have no Spotify link yet
    pub async fn artists_without_spotify(&self) -> Result<Vec<Artist>> {
        let rows = sqlx::query_as::<_, (i64, String, Option<String>, Option<String>, Option<String>, Option<String>, Option<String>, Option<String>)>(
            r#"
            SELECT id, name, image, instagram, facebook, tiktok, youtube, website
            FROM artists
            WHERE spotify IS NULL OR TRIM(spotify) = ''
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch artists without Spotify link")?;

        Ok(rows
            .into_iter()
            .map(|(id, name, image, instagram, facebook, tiktok, youtube, website)| Artist {
                id,
                name,
                image,
                spotify: None,
                instagram,
                facebook,
                tiktok,
                youtube,
                website,
            })
            .collect())
    }

    /// Store an artist's Spotify link; returns false when the artist does not exist
    pub async fn set_artist_spotify(&self, artist_id: i64, spotify_url: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE artists SET spotify = ? WHERE id = ?")
            .bind(spotify_url)
            .bind(artist_id)
            .execute(&self.pool)
            .await
            .context("Failed to update artist Spotify link")?;

        Ok(result.rows_affected() > 0)
    }

    async fn artists_by_performance(&self, performance_ids: &[i64]) -> Result<HashMap<i64, Vec<Artist>>> {
        let sql = format!(
            r#"
            SELECT pa.performance_id, a.id, a.name, a.image, a.spotify, a.instagram,
                   a.facebook, a.tiktok, a.youtube, a.website
            FROM performance_artists pa
            INNER JOIN artists a ON a.id = pa.artist_id
            WHERE pa.performance_id IN ({})
            ORDER BY pa.performance_id, pa.position
            "#,
            placeholders(performance_ids.len())
        );

        let mut query = sqlx::query_as::<_, ArtistRow>(&sql);
        for id in performance_ids {
            query = query.bind(*id);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch performance artists")?;

        let mut artists: HashMap<i64, Vec<Artist>> = HashMap::new();
        for (performance_id, id, name, image, spotify, instagram, facebook, tiktok, youtube, website) in rows {
            artists.entry(performance_id).or_default().push(Artist {
                id,
                name,
                image,
                spotify,
                instagram,
                facebook,
                tiktok,
                youtube,
                website,
            });
        }
        Ok(artists)
    }

    async fn stage_hosts(&self, dates: &[String]) -> Result<HashMap<(i64, String), String>> {
        let sql = format!(
            "SELECT stage_id, date, stage_host FROM stage_hosts WHERE date IN ({})",
            placeholders(dates.len())
        );

        let mut query = sqlx::query_as::<_, (i64, String, String)>(&sql);
        for date in dates {
            query = query.bind(date);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch stage hosts")?;

        Ok(rows
            .into_iter()
            .map(|(stage_id, date, host)| ((stage_id, date), host))
            .collect())
    }
}

#[async_trait]
impl LineupSource for LineupDatabase {
    async fn complete_lineup(&self, edition: &Edition) -> Result<CompleteLineup> {
        let dates: Vec<String> = edition.all_dates().iter().map(|d| d.to_string()).collect();
        if dates.is_empty() {
            return Ok(CompleteLineup::default());
        }

        let sql = format!(
            r#"
            SELECT p.id, p.name, p.type, s.id, s.name, p.date, p.day, p.start_time, p.end_time
            FROM performances p
            INNER JOIN stages s ON s.id = p.stage_id
            WHERE p.date IN ({})
            ORDER BY p.start_time DESC, p.id
            "#,
            placeholders(dates.len())
        );

        let mut query = sqlx::query_as::<_, PerformanceRow>(&sql);
        for date in &dates {
            query = query.bind(date);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch performances")?;

        if rows.is_empty() {
            tracing::debug!("No performances stored for edition {}", edition.year);
            return Ok(CompleteLineup::default());
        }

        let performance_ids: Vec<i64> = rows.iter().map(|row| row.0).collect();
        let mut artists = self.artists_by_performance(&performance_ids).await?;
        let hosts = self.stage_hosts(&dates).await?;

        let mut lineup = CompleteLineup::default();
        for (id, name, kind, stage_id, stage_name, date, day, start_time, end_time) in rows {
            let performance_id = id.to_string();
            let parsed_date = NaiveDate::from_str(&date).map_err(|_| LineupError::InvalidDate {
                performance_id: performance_id.clone(),
                value: date.clone(),
            })?;

            let Some(weekend) = edition.weekend_for_date(parsed_date) else {
                continue;
            };

            let performance = Performance {
                start_time: parse_instant(&performance_id, "startTime", &start_time)?,
                end_time: parse_instant(&performance_id, "endTime", &end_time)?,
                id: performance_id,
                name,
                kind,
                artists: artists.remove(&id).unwrap_or_default(),
                stage_host: hosts.get(&(stage_id, date.clone())).cloned(),
                stage: Stage {
                    id: stage_id,
                    name: stage_name,
                },
                date: parsed_date,
                day,
            };

            lineup.weekend_mut(weekend).push(performance);
        }

        tracing::debug!(
            "Loaded lineup {}: {} + {} performances",
            edition.year,
            lineup.weekend_1.len(),
            lineup.weekend_2.len()
        );
        Ok(lineup)
    }
}

/// Stage host entry of an import file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageHostEntry {
    pub stage_id: i64,
    pub date: NaiveDate,
    pub stage_host: String,
}

/// Lineup file accepted by the import tool
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineupImport {
    #[serde(default)]
    pub stages: Vec<Stage>,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub performances: Vec<NewPerformance>,
    #[serde(default)]
    pub stage_hosts: Vec<StageHostEntry>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub stages: usize,
    pub artists: usize,
    pub performances: usize,
    pub stage_hosts: usize,
}

impl LineupImport {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse lineup file")
    }

    /// Check references between stages, artists and performances of this file alone
    pub fn validate(&self) -> Result<()> {
        self.validate_against(&HashSet::new(), &HashSet::new())
    }

    /// Check references, allowing stages and artists that are already stored
    pub fn validate_against(
        &self,
        known_stages: &HashSet<i64>,
        known_artists: &HashSet<i64>,
    ) -> Result<()> {
        let stage_ids: HashSet<i64> = self
            .stages
            .iter()
            .map(|s| s.id)
            .chain(known_stages.iter().copied())
            .collect();
        let artist_ids: HashSet<i64> = self
            .artists
            .iter()
            .map(|a| a.id)
            .chain(known_artists.iter().copied())
            .collect();

        for perf in &self.performances {
            if !stage_ids.contains(&perf.stage_id) {
                bail!("Performance {} references unknown stage {}", perf.id, perf.stage_id);
            }
            if let Some(missing) = perf.artist_ids.iter().find(|id| !artist_ids.contains(*id)) {
                bail!("Performance {} references unknown artist {}", perf.id, missing);
            }
            if perf.end_time <= perf.start_time {
                tracing::warn!(
                    "Performance {} ({}) ends at or before its start",
                    perf.id,
                    perf.name
                );
            }
        }

        for host in &self.stage_hosts {
            if !stage_ids.contains(&host.stage_id) {
                bail!("Stage host '{}' references unknown stage {}", host.stage_host, host.stage_id);
            }
        }

        Ok(())
    }

    pub fn summary(&self) -> ImportSummary {
        ImportSummary {
            stages: self.stages.len(),
            artists: self.artists.len(),
            performances: self.performances.len(),
            stage_hosts: self.stage_hosts.len(),
        }
    }

    /// Validate against the file and the stored lineup, then write everything
    pub async fn apply(&self, db: &LineupDatabase) -> Result<ImportSummary> {
        self.validate_against(&db.stage_ids().await?, &db.artist_ids().await?)?;

        for stage in &self.stages {
            db.upsert_stage(stage).await?;
        }
        for artist in &self.artists {
            db.upsert_artist(artist).await?;
        }
        for perf in &self.performances {
            db.insert_performance(perf).await?;
        }
        for host in &self.stage_hosts {
            db.set_stage_host(host.stage_id, host.date, &host.stage_host)
                .await?;
        }

        Ok(self.summary())
    }
}
