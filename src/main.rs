mod agent;
mod aggregator;
mod bus;
mod clock;
mod config;
mod fleet;
mod propagator;
mod web;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::time::Duration;

use crate::agent::SatelliteAgent;
use crate::bus::Bus;
use crate::clock::ClockAuthority;
use crate::config::{ElementOverrides, MissionConfig};

const DEFAULT_NATS_URL: &str = "nats://127.0.0.1:4222";
const MEMORY_BUS_CAPACITY: usize = 1024;

#[derive(Parser)]
#[command(name = "mission-sim")]
#[command(about = "Satellite fleet simulator driven by a shared mission clock")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a mission file
    Validate { mission: String },
    /// Run the clock, every satellite and the aggregator in one process
    Simulate {
        mission: String,
        /// HTTP bind address (overrides the mission file)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run the mission clock authority
    Clock {
        #[arg(env = "MISSION_FILE")]
        mission: String,
        #[arg(long, env = "NATS_URL", default_value = DEFAULT_NATS_URL)]
        nats: String,
    },
    /// Run one satellite agent
    Satellite {
        #[arg(env = "MISSION_FILE")]
        mission: String,
        #[arg(long, env = "SAT_ID")]
        sat_id: String,
        #[arg(long, env = "NATS_URL", default_value = DEFAULT_NATS_URL)]
        nats: String,
        /// Replaces the altitude given in the mission file
        #[arg(long, env = "ALT_KM")]
        alt_km: Option<f64>,
        /// Replaces the inclination given in the mission file
        #[arg(long, env = "INC_DEG")]
        inc_deg: Option<f64>,
        /// How long to wait for the clock before logging and waiting again, e.g. "30s"
        #[arg(long, env = "SYNC_TIMEOUT", value_parser = parse_duration)]
        sync_timeout: Option<Duration>,
    },
    /// Run the telemetry aggregator and its HTTP API
    Aggregator {
        #[arg(env = "MISSION_FILE")]
        mission: String,
        #[arg(long, env = "NATS_URL", default_value = DEFAULT_NATS_URL)]
        nats: String,
        #[arg(long, env = "BIND")]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { mission } => validate(&mission),
        Commands::Simulate { mission, bind } => run_simulation(&mission, bind).await,
        Commands::Clock { mission, nats } => run_clock(&mission, &nats).await,
        Commands::Satellite {
            mission,
            sat_id,
            nats,
            alt_km,
            inc_deg,
            sync_timeout,
        } => {
            let overrides = ElementOverrides { alt_km, inc_deg };
            run_satellite(&mission, &sat_id, &nats, overrides, sync_timeout).await
        }
        Commands::Aggregator {
            mission,
            nats,
            bind,
        } => run_aggregator(&mission, &nats, bind).await,
    }
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime::parse_duration(s.trim()).map_err(|e| e.to_string())
}

fn load(path: &str) -> Option<MissionConfig> {
    match MissionConfig::from_file(path) {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("Error loading mission {}: {}", path, e);
            None
        }
    }
}

async fn connect(url: &str) -> Option<Bus> {
    match Bus::nats(url).await {
        Ok(bus) => Some(bus),
        Err(e) => {
            eprintln!("{}", e);
            None
        }
    }
}

fn validate(path: &str) -> ExitCode {
    let Some(config) = load(path) else {
        return ExitCode::FAILURE;
    };

    println!(
        "Mission {} is valid ({} satellites)",
        config.mission.name,
        config.satellites.len()
    );
    println!(
        "  epoch {}, scale {}x, duration {} h",
        config.mission.epoch, config.mission.time_scale, config.mission.duration_hours
    );
    for sat in &config.satellites {
        let el = &sat.initial;
        println!(
            "  {} ({}): alt {} km, inc {} deg, raan {} deg, argp {} deg, anomaly {} deg",
            sat.sat_id,
            sat.display_name(),
            el.alt_km,
            el.inc_deg,
            el.raan_deg,
            el.argp_deg,
            el.true_anom_deg_at_epoch
        );
    }
    for rule in config.fault_table().rules() {
        println!("  fault: {} fails after T+{}s", rule.sat_id, rule.after_seconds);
    }
    ExitCode::SUCCESS
}

async fn run_simulation(path: &str, bind: Option<String>) -> ExitCode {
    let Some(config) = load(path) else {
        return ExitCode::FAILURE;
    };
    let bus = Bus::memory(MEMORY_BUS_CAPACITY);

    let aggregator = match fleet::spawn_aggregator(&config, &bus).await {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error starting aggregator: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = fleet::spawn_agents(&config, &bus, None) {
        eprintln!("Error starting satellites: {}", e);
        return ExitCode::FAILURE;
    }
    fleet::spawn_clock(&config, &bus);

    let bind_addr = bind.unwrap_or_else(|| config.aggregator.bind.clone());
    serve(aggregator, &bind_addr).await
}

async fn run_clock(path: &str, nats: &str) -> ExitCode {
    let Some(config) = load(path) else {
        return ExitCode::FAILURE;
    };
    let Some(bus) = connect(nats).await else {
        return ExitCode::FAILURE;
    };

    ClockAuthority::new(&config, bus).run().await;
    ExitCode::SUCCESS
}

async fn run_satellite(
    path: &str,
    sat_id: &str,
    nats: &str,
    overrides: ElementOverrides,
    sync_timeout: Option<Duration>,
) -> ExitCode {
    let Some(mut config) = load(path) else {
        return ExitCode::FAILURE;
    };
    if let Err(e) = config.override_elements(sat_id, overrides) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }
    let Some(bus) = connect(nats).await else {
        return ExitCode::FAILURE;
    };

    let mut agent = match SatelliteAgent::new(&config, sat_id, bus) {
        Ok(agent) => agent,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(timeout) = sync_timeout {
        agent = agent.with_sync_timeout(timeout);
    }

    match agent.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Satellite {} stopped: {}", sat_id, e);
            ExitCode::FAILURE
        }
    }
}

async fn run_aggregator(path: &str, nats: &str, bind: Option<String>) -> ExitCode {
    let Some(config) = load(path) else {
        return ExitCode::FAILURE;
    };
    let Some(bus) = connect(nats).await else {
        return ExitCode::FAILURE;
    };

    let aggregator = match fleet::spawn_aggregator(&config, &bus).await {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error subscribing: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let bind_addr = bind.unwrap_or_else(|| config.aggregator.bind.clone());
    serve(aggregator, &bind_addr).await
}

async fn serve(aggregator: aggregator::Aggregator, bind_addr: &str) -> ExitCode {
    match web::run_server(aggregator, bind_addr).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error on {}: {}", bind_addr, e);
            ExitCode::FAILURE
        }
    }
}
