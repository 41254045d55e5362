use anyhow::{Context, Result};
use clap::Parser;
use festival_lineup::lineup::{LineupDatabase, LineupImport};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "import-lineup")]
#[command(about = "Import a lineup JSON file into the lineup database", long_about = None)]
struct Cli {
    /// Lineup file with stages, artists, performances and stage hosts
    input: PathBuf,

    /// Path to the lineup database file
    #[arg(short, long, env = "LINEUP_DATABASE_PATH", default_value = "data/lineup.db")]
    database: PathBuf,

    /// Validate the file without writing to the database
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

    let content = tokio::fs::read_to_string(&cli.input)
        .await
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;
    let lineup = LineupImport::from_json(&content)?;

    if cli.dry_run {
        // Check against the stored lineup without creating a database
        if cli.database.exists() {
            let db = LineupDatabase::new(&cli.database)
                .await
                .context("Failed to open lineup database")?;
            lineup.validate_against(&db.stage_ids().await?, &db.artist_ids().await?)?;
        } else {
            tracing::info!("No database at {}, checking the file alone", cli.database.display());
            lineup.validate()?;
        }
        let summary = lineup.summary();
        tracing::info!(
            "Would import {} stages, {} artists, {} performances, {} stage hosts",
            summary.stages,
            summary.artists,
            summary.performances,
            summary.stage_hosts
        );
        return Ok(());
    }

    let db = LineupDatabase::new(&cli.database)
        .await
        .context("Failed to open lineup database")?;
    let summary = lineup.apply(&db).await?;

    tracing::info!("=== Import Summary ===");
    tracing::info!("Stages: {}", summary.stages);
    tracing::info!("Artists: {}", summary.artists);
    tracing::info!("Performances: {}", summary.performances);
    tracing::info!("Stage hosts: {}", summary.stage_hosts);

    Ok(())
}
