//! stocksync CLI entry point

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stocksync::config::{HistoryPeriod, SyncConfig};
use stocksync::db::StockDb;
use stocksync::feed::EastmoneyFeed;
use stocksync::scheduler::ScheduleDriver;
use stocksync::sync::{RunOptions, SyncEngine, SystemClock};

#[derive(Parser)]
#[command(name = "stocksync", about = "A-share market data synchronizer", version)]
struct Cli {
    /// SQLite database file path
    #[arg(long, global = true, default_value = "stock_data.db")]
    db_path: PathBuf,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download data for every instrument in the catalog
    DownloadAll {
        /// How far back price history reaches
        #[arg(long, value_enum, default_value = "all")]
        period: HistoryPeriod,

        /// Only fetch dates missing from local storage
        #[arg(long)]
        incremental: bool,

        /// Process only the first N instruments
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Run one incremental daily update
    DailyUpdate,
    /// Run the daily update on a schedule; blocks until interrupted
    StartSchedule {
        /// Update time of day (HH:MM, exchange-local)
        #[arg(long, default_value = "09:00")]
        time: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug {
        "stocksync=debug"
    } else {
        "stocksync=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(parent) = cli.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db = Arc::new(StockDb::new(&cli.db_path)?);
    let feed = Arc::new(EastmoneyFeed::new());
    let clock = Arc::new(SystemClock);
    let engine = SyncEngine::new(db, feed, SyncConfig::default(), clock.clone());

    match cli.command {
        Commands::DownloadAll {
            period,
            incremental,
            limit,
        } => {
            let summary = engine
                .run(RunOptions {
                    period,
                    incremental,
                    limit,
                })
                .await?;
            tracing::info!(
                "Done: {}/{} instruments updated",
                summary.succeeded,
                summary.total
            );
        }
        Commands::DailyUpdate => {
            let summary = engine.daily_update().await?;
            tracing::info!(
                "Done: {}/{} instruments updated",
                summary.succeeded,
                summary.total
            );
        }
        Commands::StartSchedule { time } => {
            let update_time = ScheduleDriver::parse_time(&time)?;
            ScheduleDriver::new(engine, clock, update_time).run().await?;
        }
    }

    Ok(())
}
