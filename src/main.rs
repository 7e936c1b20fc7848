//! FitLedger - activity reward ledger service

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fitledger::{
    config::Args,
    db::MongoClient,
    ledger::{LedgerStore, MemoryLedgerStore, MongoLedgerStore},
    server,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("fitledger={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  FitLedger - activity reward ledger");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    info!("MongoDB: {}", args.mongodb_uri);
    info!(
        "Rates: {}/1000 steps, {}/workout minute",
        args.reward_per_1000_steps, args.reward_per_workout_minute
    );
    info!(
        "Daily caps: {} (steps), {} (workout)",
        args.max_daily_step_rewards, args.max_daily_workout_rewards
    );
    info!("Day offset: UTC{:+} minutes", args.utc_offset_minutes);
    info!("======================================");

    // Connect to MongoDB (optional in dev mode)
    let mongo = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => {
            info!("MongoDB connected successfully");
            Some(client)
        }
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB connection failed (dev mode, continuing without): {}", e);
                None
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    // Pick the ledger store backend
    let store: Arc<dyn LedgerStore> = match &mongo {
        Some(client) => match MongoLedgerStore::new(client.clone()).await {
            Ok(store) => {
                info!("Ledger collections ready");
                Arc::new(store)
            }
            Err(e) => {
                error!("Failed to initialize ledger collections: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            warn!("Using in-memory ledger store - grants will not survive restart");
            Arc::new(MemoryLedgerStore::new())
        }
    };

    let state = Arc::new(server::AppState::new(args, mongo, store));

    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
