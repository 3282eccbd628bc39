// src/main.rs
//
// =============================================================================
// GROUNDSTATION: ENTRY POINT
// =============================================================================
//
// The wiring center of the simulator.
//
// Modes:
// 1. SERVE:    Boots the engine (registry load + dependency sort), then runs
//              the UDP event loop.
// 2. VALIDATE: Loads configuration and runs the dependency sort only, as a
//              dry run — no sockets, no tick loop.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod config;
mod depsort;
mod engine;
mod errors;
mod fault;
mod formula;
mod model;
mod router;
mod server;
mod view;
mod wire;

use crate::config::load_standard_components;
use crate::engine::Engine;
use crate::view::ViewStore;

// ============================================================================
// 1. CLI DEFINITION
// ============================================================================

#[derive(Parser)]
#[command(
    name = "groundstation",
    version = "0.1",
    about = "EVA / rover training ground station telemetry simulator"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Boot the engine and serve the UDP command interface.
    Serve {
        /// Directory holding eva1.json, eva2.json, rover.json.
        #[arg(long, default_value = "config")]
        config_root: PathBuf,

        /// Directory holding the JSON view files (EVA.json, ROVER.json, ...).
        #[arg(long, default_value = "data")]
        view_root: PathBuf,

        /// Address to bind the UDP socket to.
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: SocketAddr,
    },

    /// Load configuration and run the dependency sort only; exits non-zero
    /// on any initialization failure without opening a socket.
    Validate {
        #[arg(long, default_value = "config")]
        config_root: PathBuf,
    },
}

// ============================================================================
// 2. ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { config_root, view_root, bind } => run_serve(config_root, view_root, bind).await,
        Commands::Validate { config_root } => run_validate(config_root),
    }
}

// ============================================================================
// 3. RUNTIME: SERVE
// ============================================================================

async fn run_serve(config_root: PathBuf, view_root: PathBuf, bind: SocketAddr) -> Result<()> {
    log::info!("loading configuration from {}", config_root.display());
    let components = load_standard_components(&config_root);
    if components.is_empty() {
        anyhow::bail!("no components loaded from {}", config_root.display());
    }

    let engine = Engine::initialize(components)
        .context("engine initialization failed (cyclic or dangling dependency)")?;
    log::info!(
        "engine initialized: {} components, {} fields in update_order",
        engine.components.len(),
        engine.update_order.len()
    );

    let view = ViewStore::new(view_root.clone());
    log::info!("serving on {bind}, view root {}", view_root.display());

    server::run(engine, view, bind).await
}

// ============================================================================
// 4. RUNTIME: VALIDATE
// ============================================================================

fn run_validate(config_root: PathBuf) -> Result<()> {
    log::info!("validating configuration at {}", config_root.display());
    let components = load_standard_components(&config_root);
    if components.is_empty() {
        anyhow::bail!("no components loaded from {}", config_root.display());
    }

    let total_fields: usize = components.iter().map(|c| c.fields.len()).sum();
    let engine = Engine::initialize(components)
        .context("dependency resolution failed (cyclic or dangling dependency)")?;

    log::info!(
        "validation OK: {} fields across {} components, update_order length {}",
        total_fields,
        engine.components.len(),
        engine.update_order.len()
    );
    Ok(())
}
