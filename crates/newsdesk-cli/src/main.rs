use clap::{Parser, Subcommand};
use newsdesk_ingest::{IngestService, DEFAULT_INGEST_LIMIT};
use tracing_subscriber::EnvFilter;

mod commands;


#[derive(Debug, Parser)]
#[command(name = "newsdesk-cli")]
#[command(about = "newsdesk ingestion command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Ingest one category across every enabled source
    Ingest {
        /// Canonical category, e.g. `technology`
        category: String,

        /// Target number of stored articles (clamped to 1..=100)
        #[arg(long, default_value_t = DEFAULT_INGEST_LIMIT)]
        limit: usize,

        /// Re-upsert articles that are already stored instead of skipping them
        #[arg(long)]
        force_refresh: bool,
    },
    /// Purge old articles, then refill the store from every pipeline
    PurgeRefresh {
        /// Remove articles published more than this many hours ago
        /// (defaults to `NEWSDESK_REFRESH_MAX_AGE_HOURS`)
        #[arg(long)]
        max_age_hours: Option<u32>,

        /// Remove every article regardless of age
        #[arg(long)]
        wipe_all: bool,
    },
    /// Show the most recent fetch log entries
    Logs {
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Apply pending database migrations
    Migrate,
}

fn init_tracing(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("newsdesk-cli: no command given; run with --help for usage");
        return Ok(());
    };

    let config = newsdesk_core::load_app_config()?;
    init_tracing(&config.log_level);
    tracing::debug!(sources_path = %config.sources_path.display(), "configuration loaded");

    let pool = newsdesk_db::connect_pool(
        &config.database_url,
        newsdesk_db::PoolConfig::from_app_config(&config),
    )
    .await?;

    if matches!(command, Commands::Migrate) {
        return commands::run_migrate(&pool).await;
    }

    let sources = newsdesk_core::load_sources(&config.sources_path)?;
    let service = IngestService::from_config(&config, &sources, pool)?;

    match command {
        Commands::Ingest {
            category,
            limit,
            force_refresh,
        } => commands::run_ingest(&service, &category, limit, force_refresh).await,
        Commands::PurgeRefresh {
            max_age_hours,
            wipe_all,
        } => {
            let max_age_hours = max_age_hours.unwrap_or(config.refresh_max_age_hours);
            commands::run_purge_refresh(&service, max_age_hours, wipe_all).await
        }
        Commands::Logs { limit } => commands::run_logs(&service, limit).await,
        Commands::Migrate => Ok(()),
    }
}
