//! Circulation - catalog configuration for a library circulation service.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use circulation::{
    api::{self, ApiState},
    coverage::{self, SyncOperation},
    lanes::{self, GenreTaxonomy},
    model::{CollectionId, Lane},
    CatalogStore, MemoryStore, ServiceConfig,
};

/// Catalog configuration tool for library circulation.
#[derive(Parser)]
#[command(name = "circulation", about = "Lanes and metadata coverage for a library circulation service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API daemon.
    Daemon {
        /// Address to bind the API server.
        #[arg(long, default_value = "0.0.0.0:6500", env = "CIRCULATION_BIND")]
        bind: String,

        /// Data directory for the catalog snapshot.
        #[arg(long, env = "CIRCULATION_DATA_DIR")]
        data_dir: Option<PathBuf>,

        /// Public URL of this site, used to register with the metadata wrangler.
        #[arg(long, env = "CIRCULATION_PUBLIC_URL")]
        public_url: Option<String>,
    },

    /// Run one coverage sync operation over a collection.
    Sync {
        /// Collection ID.
        #[arg(long)]
        collection: u64,

        /// Operation: register, reap, upload.
        #[arg(long)]
        operation: String,

        /// Identifiers per wrangler request.
        #[arg(long)]
        batch_size: Option<usize>,

        /// Data directory for the catalog snapshot.
        #[arg(long, env = "CIRCULATION_DATA_DIR")]
        data_dir: Option<PathBuf>,
    },

    /// Replace a library's lanes with the defaults.
    RebuildLanes {
        /// Library short name.
        #[arg(long)]
        library: String,

        /// Data directory for the catalog snapshot.
        #[arg(long, env = "CIRCULATION_DATA_DIR")]
        data_dir: Option<PathBuf>,
    },

    /// Show daemon status.
    Status {
        /// Circulation API URL.
        #[arg(long, env = "CIRCULATION_API_URL", default_value = "http://localhost:6500")]
        api_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "circulation=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon {
            bind,
            data_dir,
            public_url,
        } => {
            let mut config = service_config(data_dir);
            if let Some(url) = public_url {
                config = config.with_public_url(url);
            }
            run_daemon(&bind, config).await?;
        }

        Commands::Sync {
            collection,
            operation,
            batch_size,
            data_dir,
        } => {
            let mut config = service_config(data_dir);
            if let Some(size) = batch_size {
                config = config.with_batch_size(size);
            }
            run_sync(config, collection, &operation).await?;
        }

        Commands::RebuildLanes { library, data_dir } => {
            rebuild_lanes(service_config(data_dir), &library)?;
        }

        Commands::Status { api_url } => {
            show_status(&api_url).await?;
        }
    }

    Ok(())
}

fn service_config(data_dir: Option<PathBuf>) -> ServiceConfig {
    match data_dir {
        Some(dir) => ServiceConfig::new(dir),
        None => ServiceConfig::default(),
    }
}

/// Run the API daemon.
async fn run_daemon(bind: &str, config: ServiceConfig) -> Result<()> {
    tracing::info!("Starting circulation daemon...");

    let store = MemoryStore::open(&config.data_dir)?;
    if config.public_url.is_none() {
        tracing::warn!("No public URL configured; metadata wrangler registration is unavailable");
    }

    let state = Arc::new(ApiState::new(store, config));
    api::serve(state, bind).await?;

    Ok(())
}

/// Run a sync operation against the local catalog.
async fn run_sync(config: ServiceConfig, collection: u64, operation: &str) -> Result<()> {
    let operation: SyncOperation = operation.parse()?;
    let mut store = MemoryStore::open(&config.data_dir)?;
    let lookup = coverage::wrangler_lookup(&store, config.http_timeout)?;

    let report = coverage::synchronize(
        &mut store,
        Arc::new(lookup),
        CollectionId(collection),
        operation,
        config.sync_config(),
    )
    .await?;

    println!("Sync {} on {}", report.operation, report.collection);
    println!("==============================");
    println!("Reconciled:          {}", report.reconciled);
    println!("Selected:            {}", report.selected);
    println!("Batches:             {}", report.batches);
    println!("Successes:           {}", report.successes);
    println!("Transient failures:  {}", report.transient_failures);
    println!("Persistent failures: {}", report.persistent_failures);

    Ok(())
}

/// Rebuild a library's lanes and print the tree.
fn rebuild_lanes(config: ServiceConfig, short_name: &str) -> Result<()> {
    let mut store = MemoryStore::open(&config.data_dir)?;
    let library = store.library_by_short_name(short_name)?;
    let lanes = lanes::create_default_lanes(&mut store, library.id, &GenreTaxonomy::default())?;

    println!("Lanes for {}", library.name);
    for lane in &lanes {
        print_lane(lane, 0);
    }

    Ok(())
}

fn print_lane(lane: &Lane, depth: usize) {
    println!(
        "{}{:<3} {} [{}]",
        "  ".repeat(depth),
        lane.priority,
        lane.display_name,
        lane.languages.join(", ")
    );
    for child in &lane.children {
        print_lane(child, depth + 1);
    }
}

/// Show daemon status via API.
async fn show_status(api_url: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/status", api_url);

    let response = client.get(&url).send().await?;

    if !response.status().is_success() {
        anyhow::bail!("Failed to get status: {}", response.status());
    }

    let status: serde_json::Value = response.json().await?;

    println!("Circulation Status");
    println!("==================");
    println!("Status:            {}", status["status"]);
    println!("Version:           {}", status["version"]);
    println!("Libraries:         {}", status["libraries"]);
    println!("Metadata services: {}", status["metadata_services"]);
    println!("Wrangler:          {}", status["wrangler_configured"]);

    Ok(())
}
