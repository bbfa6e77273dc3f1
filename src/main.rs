use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use office_rush::config::GameConfig;
use office_rush::network::server::GameServer;
use office_rush::session::Simulation;

const TICK_MS: u64 = 16;
const DEFAULT_ADDR: &str = "127.0.0.1:9001";

fn load_config() -> Option<GameConfig> {
    match std::env::var("OFFICE_RUSH_CONFIG").ok().filter(|p| !p.is_empty()) {
        Some(path) => match GameConfig::from_json_file(&path) {
            Ok(config) => {
                info!("Loaded config from {}", path);
                Some(config)
            }
            Err(e) => {
                error!("Invalid config {}: {}", path, e);
                None
            }
        },
        None => Some(GameConfig::default()),
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let addr = std::env::var("OFFICE_RUSH_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let seed = std::env::var("OFFICE_RUSH_SEED")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or_else(rand::random);

    let Some(config) = load_config() else {
        return;
    };
    let mut sim = match Simulation::new(config, seed) {
        Ok(sim) => sim,
        Err(e) => {
            error!("Refusing to start: {}", e);
            return;
        }
    };

    let mut server = match GameServer::start(&addr).await {
        Ok(server) => server,
        Err(e) => {
            error!("Server failed to start: {}", e);
            return;
        }
    };

    let mut ticker = interval(Duration::from_millis(TICK_MS));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        while let Ok(input) = server.input_rx.try_recv() {
            for command in input.commands {
                let label = format!("{:?}", command);
                if let Err(e) = sim.apply(command) {
                    warn!("Rejected {}: {}", label, e);
                    server.send_rejection(label, e.to_string());
                }
            }
        }

        sim.tick(TICK_MS as f64);
        let events = sim.take_events();
        server.send_frame(events, sim.snapshot());

        if !server.is_connected() {
            info!("Client gone; shutting down");
            break;
        }
    }
}
