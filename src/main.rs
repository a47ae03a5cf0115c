//! TMS Core gateway
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌───────────┐    ┌──────────────┐
//! │  Config  │───▶│  Store   │───▶│ Lifecycle │───▶│ HTTP Gateway │
//! │  (YAML)  │    │ (PG/mem) │    │  Service  │    │    (axum)    │
//! └──────────┘    └──────────┘    └───────────┘    └──────────────┘
//! ```
//!
//! Without `postgres_url` the gateway runs on the in-memory store and loses
//! all data on exit.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use tms_core::config::AppConfig;
use tms_core::db::Database;
use tms_core::gateway::{self, AppState};
use tms_core::lifecycle::LifecycleService;
use tms_core::logging::init_logging;
use tms_core::pod::PodFileStore;
use tms_core::store::{MemoryStore, PgStore, TmsStore, schema};

#[derive(Parser, Debug)]
#[command(version, about = "Transportation management lifecycle gateway")]
struct Cli {
    /// Config environment, loads `{config_dir}/{env}.yaml`
    #[arg(short, long, default_value = "dev")]
    env: String,

    #[arg(long, default_value = "config")]
    config_dir: PathBuf,

    /// Override `gateway.port`
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let app_config = AppConfig::load(&cli.config_dir, &cli.env)?;
    let _log_guard = init_logging(&app_config);

    tracing::info!(env = %cli.env, "Starting TMS Core");

    let database = match app_config.postgres_url.as_deref() {
        Some(url) => {
            let db = Database::connect(url, app_config.db_max_connections).await?;
            schema::init_schema(db.pool()).await?;
            Some(db)
        }
        None => {
            tracing::warn!("postgres_url not set, using the in-memory store");
            None
        }
    };

    let store: Arc<dyn TmsStore> = match &database {
        Some(db) => Arc::new(PgStore::new(db.pool().clone())),
        None => Arc::new(MemoryStore::new()),
    };
    let files = PodFileStore::new(&app_config.pod.upload_dir, &app_config.pod.public_base);
    let state = AppState::new(LifecycleService::new(store, files));

    let port = cli.port.unwrap_or(app_config.gateway.port);
    let served = gateway::run_server(&app_config.gateway.host, port, state).await;

    if let Some(db) = database {
        db.close().await;
    }
    served
}
