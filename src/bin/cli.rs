//! LuxMed Sniper CLI
//!
//! Performs exactly one poll cycle and exits. Scheduling is left to an
//! external trigger such as cron or a systemd timer.

use std::path::PathBuf;

use clap::Parser;
use luxmed_sniper::{
    error::Result,
    models::Config,
    pipeline,
    services::{PortalClient, PushoverNotifier},
    storage::FirestoreStore,
};

/// LuxMedSniper - Lux Med Appointment Sniper
#[derive(Parser, Debug)]
#[command(
    name = "luxmed-sniper",
    version,
    about = "Lux Med Appointment Sniper"
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "luxmed-sniper.toml")]
    config: PathBuf,
}

/// Initialize logging.
fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    log::info!("LuxMedSniper - Lux Med Appointment Sniper");

    let config = Config::load(&cli.config)?;
    log::info!("Loaded configuration from {}", cli.config.display());

    let portal = PortalClient::login(&config.luxmed.email, &config.luxmed.password).await?;

    let http = reqwest::Client::new();
    let store = FirestoreStore::connect(http.clone(), &config.firebase.firebase_key).await?;
    let notifier = PushoverNotifier::new(http, config.pushover.clone());

    let outcome = pipeline::run(&portal, &config.luxmedsniper, &store, &notifier).await?;
    log::info!(
        "Check complete: {} fetched, {} already known, {} notified",
        outcome.fetched,
        outcome.known,
        outcome.notified
    );

    Ok(())
}
