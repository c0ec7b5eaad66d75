//! # farewatch
//!
//! Automated round-trip fare monitoring. A scheduled check cycle queries a
//! flight-search API for configured routes, evaluates every offer against
//! rolling 30/90-day price statistics, persists observations and qualifying
//! deals to SQLite, and hands alertable offers to a notifier.
//!
//! ## Architecture
//!
//! ```text
//! FlightSearch (collaborator)
//!     ↓ normalized FlightOffer
//! deals::evaluate()  ←─ history::PriceHistoryStore (30/90-day statistics)
//!     ↓ EvaluatedOffer
//! history::PriceHistoryStore (record observation / deal)
//!     ↓
//! deals::rank() / filter_alertable()
//!     ↓
//! DealNotifier (collaborator)
//! ```
//!
//! Detailed observations are periodically folded into daily and monthly
//! aggregates by `history::retention`, keeping the database bounded while
//! preserving long-term trend statistics.
//!
//! ## Module Organization
//!
//! - `config` - Runtime configuration from environment variables
//! - `deals` - Offer types, deal evaluation, ranking
//! - `history` - SQLite price history store and retention compaction
//! - `search` - Flight-search collaborator trait + Amadeus client
//! - `notify` - Alert notification collaborator trait + email delivery
//! - `watcher` - Check cycle orchestration and the scheduling loop
//!
//! ## Usage
//!
//! ```text
//! cargo run --release              # continuous mode
//! cargo run --release -- --once    # single check cycle
//! ```
//!
//! Configuration comes from environment variables (see `Config::from_env`);
//! a `.env` file is honored. Set `FAREWATCH_DRY_RUN=true` to log alerts
//! instead of delivering them.

pub mod config;
pub mod deals;
pub mod history;
pub mod notify;
pub mod search;
pub mod watcher;

// Re-export commonly used types
pub use config::Config;
pub use deals::evaluator::{evaluate, AlertFrequency, AlertPolicy, EvaluateError};
pub use deals::ranker::{any_alertable, filter_alertable, rank};
pub use deals::types::{DealQuality, DealRecord, EvaluatedOffer, FlightOffer, Statistics};
pub use history::{CompactionReport, PriceHistoryStore, StoreError};
pub use notify::DealNotifier;
pub use search::FlightSearch;
pub use watcher::FareWatcher;

use {
    log::{error, info},
    notify::{HttpEmailNotifier, LogNotifier},
    search::AmadeusClient,
    std::env,
    std::sync::Arc,
};

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::init();

    info!("✈️  farewatch - flight fare monitor");

    let run_once = env::args().any(|arg| arg == "--once");

    let config = Config::from_env();
    if let Err(e) = config.validate() {
        error!("❌ Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("   ├─ Origin: {}", config.origin);
    info!("   ├─ Destinations: {}", config.destinations.join(", "));
    info!("   ├─ Check interval: every {}h", config.check_interval_hours);
    info!("   └─ Database: {}", config.db_path);

    let store = Arc::new(PriceHistoryStore::open(&config.db_path)?);

    let search: Arc<dyn FlightSearch> = Arc::new(AmadeusClient::new(
        config.amadeus_api_key.clone(),
        config.amadeus_api_secret.clone(),
        config.currency.clone(),
    )?);

    let notifier: Arc<dyn DealNotifier> = if config.dry_run {
        info!("🧪 Dry-run mode: alerts will be logged, not delivered");
        Arc::new(LogNotifier)
    } else {
        Arc::new(HttpEmailNotifier::new(
            config.mail_endpoint.clone(),
            config.mail_token.clone(),
            config.mail_sender.clone(),
            config.mail_recipient.clone(),
        )?)
    };

    let watcher = FareWatcher::new(config, store, search, notifier);

    if run_once {
        watcher.run_check_cycle().await;
        info!("✅ Single check complete");
        return Ok(());
    }

    tokio::select! {
        _ = watcher.run_continuous() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("⚠️  Received CTRL+C, shutting down...");
        }
    }

    Ok(())
}
