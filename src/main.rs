use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

mod api;
mod averages;
mod config;
mod db;
mod engine;
mod error;
mod logging;
mod models;
mod report;
mod stats;
mod store;

#[derive(Parser)]
#[command(name = "grade-analytics")]
#[command(about = "Weighted class averages and pass-rate statistics for learners", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample grades
    Seed,
    /// Import score entries from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Recompute the stored weighted average of every grade
    RefreshAverages,
    /// Weighted average per class for one learner
    ClassAverages {
        learner_id: String,
    },
    /// Share of learners above a threshold, optionally for one class
    Stats {
        #[arg(long)]
        class_id: Option<String>,
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Generate a markdown report for one learner
    Report {
        learner_id: String,
        #[arg(long)]
        class_id: Option<String>,
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;
    logging::init(config.log_format);

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;
    let store = db::PgRecordStore::new(pool.clone());

    let response = match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
            return Ok(());
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
            return Ok(());
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} scores from {}.", csv.display());
            return Ok(());
        }
        Commands::RefreshAverages => {
            let updated = db::refresh_weighted_averages(&pool).await?;
            println!("Refreshed {updated} weighted averages.");
            return Ok(());
        }
        Commands::ClassAverages { learner_id } => {
            api::learner_class_averages(&store, &learner_id).await
        }
        Commands::Stats {
            class_id,
            threshold,
        } => {
            let threshold = threshold.or(Some(config.default_threshold));
            match class_id.as_deref() {
                Some(class_id) => {
                    api::class_threshold_stats(&store, Some(class_id), threshold).await
                }
                None => api::global_threshold_stats(&store, threshold).await,
            }
        }
        Commands::Report {
            learner_id,
            class_id,
            threshold,
            out,
        } => {
            let threshold = threshold.unwrap_or(config.default_threshold);
            let learner = models::parse_identifier("learner_id", &learner_id)?;
            let scope = class_id
                .as_deref()
                .map(|raw| models::parse_identifier("class_id", raw))
                .transpose()?;

            let averages = engine::compute_class_averages(&store, &learner_id).await?;
            let stats = engine::compute_threshold_stats(&store, threshold, scope).await?;
            let report = report::build_report(
                learner,
                Utc::now().date_naive(),
                &averages,
                scope,
                threshold,
                &stats,
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
            return Ok(());
        }
    };

    info!(status = response.status, "Request complete");
    println!("{}", serde_json::to_string_pretty(&response.body)?);
    if !response.is_success() {
        std::process::exit(response.exit_code());
    }

    Ok(())
}
