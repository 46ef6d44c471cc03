mod api;
mod database;
mod mapper;
mod sync;
mod utils;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::info;

use crate::api::client::CatApiClient;
use crate::api::sim;
use crate::api::transport::Transport;
use crate::database::repo::Store;
use crate::mapper::SchemaVersion;
use crate::sync::job::{SyncJob, SyncOptions};
use crate::utils::config;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// SQLite database file for the local catalog.
    #[arg(short, long)]
    db_path: String,

    /// API host; a `sim://` host selects the simulated transport.
    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    api_key: Option<String>,

    /// Page size for breed listing.
    #[arg(short, long)]
    limit: Option<usize>,

    /// Upstream schema variant: v1 or v2.
    #[arg(long, default_value = "v1")]
    schema_version: String,

    /// Abort the run cleanly once this many seconds have elapsed.
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Delay between image fetches, in milliseconds; implies serial fetching.
    #[arg(long)]
    throttle_ms: Option<u64>,

    /// Worker threads for the missing-image fetch phase.
    #[arg(long, default_value_t = 4)]
    fetch_workers: usize,

    #[arg(long, default_value = ".env")]
    config_path: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let mut config = config::load(&args.config_path)?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(api_key) = args.api_key {
        config.api_key = api_key;
    }
    if let Some(limit) = args.limit {
        if limit == 0 {
            return Err(anyhow!("--limit must be positive"));
        }
        config.page_limit = limit;
    }

    let schema_version = SchemaVersion::parse(&args.schema_version)
        .ok_or_else(|| anyhow!("unknown schema version: {}", args.schema_version))?;

    info!("Cat catalog sync starting...");
    info!("Host: {}", config.host);
    info!("DB: {}", args.db_path);

    let transport = if config.host.starts_with("sim://") {
        Transport::simulated(sim::default_handlers())
    } else {
        Transport::live(&config.api_key)
    };
    let client = CatApiClient::new(transport, &config.host);
    let store = Store::open(&args.db_path)?;

    let opts = SyncOptions {
        page_limit: config.page_limit,
        schema_version,
        fetch_workers: args.fetch_workers.max(1),
        throttle: args.throttle_ms.map(Duration::from_millis),
        deadline: args
            .deadline_secs
            .map(|secs| Instant::now() + Duration::from_secs(secs)),
    };

    let report = SyncJob::new(&client, &store, opts).run()?;
    info!(
        "Sync completed: {} pages, {} breeds upserted ({} skipped), {} images fetched ({} skipped), {} links updated",
        report.pages,
        report.breeds_upserted,
        report.breeds_skipped,
        report.images_fetched,
        report.images_skipped,
        report.links_updated
    );
    Ok(())
}
