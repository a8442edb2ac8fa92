//! EVCC Node - CLI running one ISO 15118-2 session
//!
//! Connects to a SECC with the simulated EV and prints how the session ended.
//!
//! # Usage
//!
//! ```bash
//! # AC session against a local SECC
//! evcc-node --secc 127.0.0.1:15118
//!
//! # DC session with a config file and PKI directory
//! evcc-node --config evcc.json --pki-dir ./pki --energy-mode DC_extended
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use evcc_core::messages::EnergyTransferMode;
use evcc_core::{EvccConfig, FilePki, SessionDriver, SimEvController, TcpTransport};
use tokio::sync::watch;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// ISO 15118-2 EV communication controller
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// SECC address
    #[arg(long, default_value = "127.0.0.1:15118")]
    secc: SocketAddr,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// PKI directory (overrides the config file)
    #[arg(long)]
    pki_dir: Option<PathBuf>,

    /// Requested energy transfer mode, e.g. AC_three_phase_core or DC_extended
    #[arg(long)]
    energy_mode: Option<EnergyTransferMode>,

    /// Charging loops before the simulated EV stops
    #[arg(long)]
    charge_loops: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Setup logging
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Build configuration
    let mut config = match &args.config {
        Some(path) => EvccConfig::from_file(path)?,
        None => EvccConfig::default(),
    };
    if let Some(dir) = args.pki_dir {
        config = config.with_pki_dir(dir);
    }
    if let Some(mode) = args.energy_mode {
        config = config.with_energy_mode(mode);
    }
    if let Some(loops) = args.charge_loops {
        config = config.with_charge_loops(loops);
    }

    // Print banner
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              EVCC Node - ISO 15118-2 EV Session              ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  SECC:     {:<50} ║", args.secc);
    println!("║  EVCC ID:  {:<50} ║", config.evcc_id);
    println!("║  Mode:     {:<50} ║", config.simulator.energy_mode);
    println!("║  PKI:      {:<50} ║", truncate(&config.pki_dir.display().to_string(), 50));
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, stopping session");
            let _ = shutdown_tx.send(true);
        }
    });

    let transport = TcpTransport::connect(args.secc).await?;
    let ev = SimEvController::new(config.simulator.clone()).with_pki_dir(config.pki_dir.clone());
    let crypto = Arc::new(FilePki::new(&config.pki_dir));

    info!("Starting EVCC session...");
    let mut driver = SessionDriver::new(config, transport, ev, crypto)?.with_shutdown(shutdown_rx);
    let result = driver.run().await;

    match driver.context().and_then(|ctx| ctx.stop_reason.as_ref()) {
        Some(reason) => {
            println!("Session ended: {}", reason);
            if let Some(resume) = &reason.resume {
                println!("Resume state: {}", serde_json::to_string(resume)?);
            }
        }
        None => println!("Session ended without a stop reason"),
    }

    result?;
    Ok(())
}

/// Truncate string with ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
