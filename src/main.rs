use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};

use atc_engine::airport::AirportData;
use atc_engine::airspace::Airspace;
use atc_engine::bus::EventBus;
use atc_engine::config::EngineConfig;
use atc_engine::engine::Engine;
use atc_engine::kinematics::Drift;
use atc_engine::store::StateStore;

#[derive(Parser)]
#[command(name = "atc-engine")]
#[command(about = "Deterministic arrival kinematics engine", long_about = None)]
struct Cli {
    /// Run duration in seconds (0 = infinite)
    #[arg(long, default_value_t = 0)]
    duration: u64,

    /// Run a 60-second test simulation
    #[arg(long)]
    test: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let duration = if cli.test { 60 } else { cli.duration };

    let config = EngineConfig::from_env();

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            info!("Interrupt received, shutting down");
            running.store(false, Ordering::SeqCst);
        })?;
    }

    // No store means no engine; this is the one fatal init path
    let store = StateStore::connect(&config.db)?;
    let bus = EventBus::connect(&config.bus).await;
    let airport = AirportData::load(config.airport_data_path.as_deref());
    let airspace = Airspace::load(config.airspace_config_path.as_deref());
    let drift = match config.rng_seed {
        Some(seed) => {
            info!("Drift PRNG seeded with {seed}");
            Drift::seeded(seed)
        }
        None => Drift::from_entropy(),
    };

    let engine = Engine::new(config, store, bus, airport, airspace, drift, running);
    engine.run(duration).await
}
