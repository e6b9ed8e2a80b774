mod core;

use std::path::PathBuf;

use clap::Parser;
use la1ere_core::{Command, Config, Radio, StationRef};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::core::{CoreEvent, RadioCore};

/// Outre-Mer La 1ère radio player.
///
/// Reads commands from stdin, one per line (`help` lists them).
#[derive(Debug, Parser)]
#[command(name = "la1ere", version)]
struct Cli {
    /// Config file (default: ~/.config/la1ere/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the station list and exit
    #[arg(long)]
    list: bool,

    /// Select a station, by index or exact name, before starting
    #[arg(long)]
    station: Option<String>,

    /// Set the volume (0-100) before starting
    #[arg(long, allow_negative_numbers = true)]
    volume: Option<i64>,

    /// Start playing the selected station immediately
    #[arg(long)]
    autoplay: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = la1ere_core::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = la1ere_core::platform::log_file();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,la1ere=debug,la1ere_core=debug".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("la1ere log: {}", log_path.display());
    info!("la1ere starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_else(|e| {
            warn!("Config unusable ({}), using defaults", e);
            Config::default()
        }),
    };

    let mut radio = Radio::new(&config);

    if cli.list {
        println!("{}", core::format_station_list(&radio));
        return Ok(());
    }

    if let Some(station) = &cli.station {
        let station = radio.select(&StationRef::from(station.as_str())).await?;
        println!("selected {}", station.name);
    }
    if let Some(level) = cli.volume {
        match radio.set_volume(level).await {
            Ok(volume) => println!("volume {}%", volume),
            Err(e) => println!("error: {}", e),
        }
    }
    if cli.autoplay {
        match radio.play().await {
            Ok(()) => println!("playing {}", radio.selected().name),
            Err(e) => println!("error: {}", e),
        }
    }

    // ── CoreEvent channel (stdin / signals → RadioCore) ─────────────────────
    let (event_tx, event_rx) = mpsc::channel::<CoreEvent>(64);

    // Plain thread: a blocking stdin read must not hold up runtime shutdown.
    let stdin_tx = event_tx.clone();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("stdin read error: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Command>() {
                Ok(cmd) => {
                    if stdin_tx.blocking_send(CoreEvent::Command(cmd)).is_err() {
                        return;
                    }
                }
                Err(e) => println!("{} (try 'help')", e),
            }
        }
        let _ = stdin_tx.blocking_send(CoreEvent::Shutdown);
    });

    let signal_tx = event_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = signal_tx.send(CoreEvent::Shutdown).await;
        }
    });

    RadioCore::new(radio, event_tx).run(event_rx).await
}
