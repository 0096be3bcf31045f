mod config;
mod console;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gatekeep_control::{ControlPeripherals, ProtocolMachine};
use gatekeep_hardware::{
    CredentialStore, FileStore, HardwareError, MemoryStore, mock::SimulatedSensor, timer::spawn_tick_counter,
};
use gatekeep_hmi::{SessionController, SessionError};
use gatekeep_link::{duplex_pair, tcp};
use gatekeep_protocol::{Command, Response};
use std::{path::PathBuf, time::Duration};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    config::AppConfig,
    console::{ConsoleDisplay, LoggedActuator, LoggedAlarm, StdinKeypad},
};

#[derive(Debug, Parser)]
#[command(name = "gatekeep", version, about = "Two-node door access controller")]
struct Cli {
    /// JSON configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Link address, overriding the configuration file.
    #[arg(long, global = true)]
    address: Option<String>,

    /// Tick interval in milliseconds, overriding the configuration file.
    #[arg(long, global = true)]
    tick_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the Control node, listening for the HMI.
    Control {
        /// EEPROM image holding the credential.
        #[arg(long, default_value = "gatekeep-eeprom.bin")]
        store: PathBuf,

        /// Seconds the simulated visitor stays in the doorway.
        #[arg(long, default_value_t = 4)]
        passage_secs: u64,
    },
    /// Run the HMI node, reading keys from stdin.
    Hmi,
    /// Run both nodes in one process over an in-memory link.
    Demo {
        #[arg(long, default_value_t = 4)]
        passage_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(address) = cli.address {
        config.link.address = address;
    }
    if let Some(tick_ms) = cli.tick_ms {
        config.timer.tick_interval_ms = tick_ms;
    }

    let node = async move {
        match cli.command {
            Commands::Control {
                store,
                passage_secs,
            } => run_control(config, store, Duration::from_secs(passage_secs)).await,
            Commands::Hmi => run_hmi(config).await,
            Commands::Demo { passage_secs } => {
                run_demo(config, Duration::from_secs(passage_secs)).await
            }
        }
    };

    tokio::select! {
        result = node => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            Ok(())
        }
    }
}

fn peripherals<S: CredentialStore>(
    store: S,
    passage: Duration,
) -> ControlPeripherals<S, LoggedActuator, SimulatedSensor, LoggedAlarm> {
    ControlPeripherals {
        store,
        actuator: LoggedActuator::default(),
        sensor: SimulatedSensor::new(passage),
        alarm: LoggedAlarm,
    }
}

async fn run_control(config: AppConfig, store: PathBuf, passage: Duration) -> Result<()> {
    let store = FileStore::open(&store)
        .await
        .with_context(|| format!("opening EEPROM image {}", store.display()))?;
    let (ticks, _tick_source) = spawn_tick_counter(&config.timer)?;
    let listener = tcp::bind(&config.link).await?;

    let (link, _peer) = tcp::accept::<Command>(&listener).await?;
    let mut machine =
        ProtocolMachine::new(link, peripherals(store, passage), ticks, config.control)?;

    loop {
        if let Err(e) = machine.run().await {
            warn!(error = %e, "HMI link lost");
        }
        let (link, _peer) = tcp::accept::<Command>(&listener).await?;
        machine.replace_link(link);
    }
}

async fn run_hmi(config: AppConfig) -> Result<()> {
    let (ticks, _tick_source) = spawn_tick_counter(&config.timer)?;
    let link = tcp::connect::<Response>(&config.link).await?;
    let mut session = SessionController::new(
        link,
        StdinKeypad::new(),
        ConsoleDisplay::default(),
        ticks,
        config.hmi,
    )?;
    finish_session(session.run().await)
}

async fn run_demo(config: AppConfig, passage: Duration) -> Result<()> {
    let (ticks, _tick_source) = spawn_tick_counter(&config.timer)?;
    let (hmi_link, control_link) = duplex_pair(256);

    let mut machine = ProtocolMachine::new(
        control_link,
        peripherals(MemoryStore::new(), passage),
        ticks.clone(),
        config.control,
    )?;
    let mut session = SessionController::new(
        hmi_link,
        StdinKeypad::new(),
        ConsoleDisplay::default(),
        ticks,
        config.hmi,
    )?;

    tokio::select! {
        result = session.run() => finish_session(result),
        result = machine.run() => result.context("control node stopped"),
    }
}

/// End of stdin is a normal way to leave an interactive session.
fn finish_session(result: std::result::Result<(), SessionError>) -> Result<()> {
    match result {
        Err(SessionError::Hardware(HardwareError::Disconnected { .. })) => {
            info!("Keypad closed");
            Ok(())
        }
        other => other.context("HMI session ended"),
    }
}
