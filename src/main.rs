mod config;
mod db;
mod feed;
mod models;
mod processor;
mod report;

use std::sync::Arc;

use chrono::{Days, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use config::{AppConfig, TxConfig};
use feed::SoapFeed;
use processor::pass::{run_import_pass, PassOptions};
use processor::{queue, SyncContext};
use tracing::info;

/// Reconciles fleet telematics (drivers, vehicles, tours and their reports)
/// into Postgres.
#[derive(Parser, Debug)]
#[command(name = "fleet-sync", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one reconciliation pass.
    Import {
        /// Re-import every tour from its start, ignoring previous imports.
        #[arg(long)]
        full: bool,
        /// Drain the retry queue at the end of the pass.
        #[arg(long)]
        drain: bool,
    },
    /// Retry queued report windows.
    Drain {
        /// Stop at the first failure and exit non-zero.
        #[arg(long)]
        strict: bool,
    },
    /// Print per-driver report data for closed tours as JSON.
    Report {
        #[arg(long)]
        from: NaiveDate,
        /// Last day included.
        #[arg(long)]
        to: NaiveDate,
        #[arg(long = "driver")]
        drivers: Vec<i64>,
    },
    /// Apply pending migrations and exit.
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config
    let config = AppConfig::load()?;

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .init();

    info!("Starting fleet-sync...");

    // Init DB
    let pool = db::init_pool(&config.database_url, config.db_max_connections).await?;
    info!("Connected to database");
    db::migrate(&pool).await?;
    if matches!(cli.command, Commands::Migrate) {
        info!("Migrations applied");
        return Ok(());
    }

    let store = Arc::new(db::PgStore::new(pool));
    let now = Utc::now().naive_utc();

    match cli.command {
        Commands::Import { full, drain } => {
            let ctx = sync_context(store)?;
            let options = PassOptions {
                full,
                drain,
                settle: chrono::Duration::days(config.tour_settle_days),
                retry_min_age: chrono::Duration::days(config.retry_min_age_days),
            };
            run_import_pass(&ctx, now, options).await?;
        }
        Commands::Drain { strict } => {
            let ctx = sync_context(store)?;
            let results = queue::drain(
                &ctx,
                now,
                chrono::Duration::days(config.retry_min_age_days),
                strict,
            )
            .await?;
            info!("Drain done: {} entries processed", results.len());
        }
        Commands::Report { from, to, drivers } => {
            let from = from.and_time(NaiveTime::MIN);
            let to = (to + Days::new(1)).and_time(NaiveTime::MIN);
            let reports = report::driver_reports(store.as_ref(), from, to, &drivers).await?;
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        Commands::Migrate => {}
    }

    Ok(())
}

fn sync_context(store: Arc<db::PgStore>) -> anyhow::Result<SyncContext> {
    let tx = TxConfig::load()?;
    let feed = Arc::new(SoapFeed::new(&tx.host, tx.login, tx.timeout)?);
    Ok(SyncContext::new(store, feed, tx.request_delay))
}
