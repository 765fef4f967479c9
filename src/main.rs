use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use orgsync_api::app::{router, AppState};
use orgsync_api::config;
use orgsync_api::database::{DatabaseManager, MemoryStore, PgTableStore, TableStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    /// Postgres via DATABASE_URL
    Postgres,
    /// Process-local tables, lost on exit
    Memory,
}

#[derive(Parser)]
#[command(name = "orgsync-api")]
#[command(about = "Organization configuration synchronizer API")]
#[command(version)]
struct Args {
    #[arg(long, env = "PORT", default_value_t = 3000, help = "Port to listen on")]
    port: u16,

    #[arg(long, default_value = "0.0.0.0", help = "Address to bind")]
    bind: String,

    #[arg(long, value_enum, default_value_t = StoreKind::Postgres, help = "Storage backend")]
    store: StoreKind,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();

    let default_filter = if config.api.enable_request_logging {
        "orgsync_api=debug,tower_http=debug"
    } else {
        "orgsync_api=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    info!("Starting organization sync API in {:?} mode", config.environment);

    let store: Arc<dyn TableStore> = match args.store {
        StoreKind::Postgres => {
            let pool = DatabaseManager::connect(&config.database)
                .await
                .context("failed to connect to the database")?;
            Arc::new(PgTableStore::new(pool))
        }
        StoreKind::Memory => {
            info!("Using the in-memory store; data will not survive a restart");
            Arc::new(MemoryStore::with_site_schema())
        }
    };

    let state = AppState::build(store, config).context("failed to build application state")?;
    let app = router(state, config);

    let bind_addr = format!("{}:{}", args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Listening on http://{}", bind_addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
