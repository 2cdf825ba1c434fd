//! # lumibulbd — lumibulb daemon
//!
//! Composition root that wires the bulb controller to its adapters and
//! drives it from the console.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize logging
//! - Pick the transport (btleplug or virtual) and construct the controller
//! - Run the start-up readiness probe
//! - Read console commands until `quit`, EOF or Ctrl-C, then tear down
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod console;

use std::sync::Arc;

use anyhow::Context as _;
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use lumibulb_adapter_ble::BleBulb;
use lumibulb_adapter_virtual::{ScriptedSpeech, VirtualBulb, VirtualMotion};
use lumibulb_app::controller::BulbController;
use lumibulb_app::ports::BulbTransport;
use lumibulb_domain::connection::DeviceIdentity;
use lumibulb_domain::event::{BulbEvent, EventKind};

use config::{Config, TransportKind};
use console::Command;

type Controller<T> = BulbController<T, Arc<ScriptedSpeech>, Arc<VirtualMotion>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config.logging.filter);

    let identity = config.device_identity()?;
    tracing::info!(
        address = %identity.address,
        transport = ?config.transport.kind,
        "lumibulbd starting"
    );

    match config.transport.kind {
        TransportKind::Ble => {
            let transport = BleBulb::new(config.transport.ble.clone());
            run(&config, identity, transport).await
        }
        TransportKind::Virtual => {
            let transport = VirtualBulb::new(identity.address.clone());
            run(&config, identity, transport).await
        }
    }
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        eprintln!("invalid log filter {filter:?} ({err}), falling back to info");
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run<T>(config: &Config, identity: DeviceIdentity, transport: T) -> anyhow::Result<()>
where
    T: BulbTransport + 'static,
{
    let speech = Arc::new(ScriptedSpeech::new());
    let motion = Arc::new(VirtualMotion::new());
    let controller = BulbController::new(
        transport,
        Arc::clone(&speech),
        Arc::clone(&motion),
        identity,
        config.control_config(),
    );

    let readiness = controller.initialize().await;
    if !readiness.adapter_enabled {
        println!("! bluetooth is not enabled, connect will fail");
    }
    let printer = tokio::spawn(print_events(controller.subscribe_events()));

    println!("{}", console::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                match console::parse(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => execute(&controller, &speech, &motion, command).await,
                    Ok(None) => {}
                    Err(err) => println!("{err}"),
                }
            }
            _ = &mut ctrl_c => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    controller.shutdown().await;
    printer.abort();
    tracing::info!("lumibulbd stopped");
    Ok(())
}

async fn execute<T>(
    controller: &Controller<T>,
    speech: &ScriptedSpeech,
    motion: &VirtualMotion,
    command: Command,
) where
    T: BulbTransport + 'static,
{
    match command {
        Command::Connect => {
            if let Err(err) = controller.connect().await {
                println!("connect failed: {err}");
            }
        }
        Command::Disconnect => {
            if let Err(err) = controller.disconnect().await {
                println!("disconnect: {err}");
            }
        }
        Command::Pick(hex) => {
            // Rejected input comes back as a notice event.
            let _ = controller.select_color(&hex).await;
        }
        Command::Record => match controller.toggle_recording().await {
            Ok(true) => println!("recording, use `say` to speak"),
            Ok(false) => println!("recording stopped"),
            Err(err) => println!("cannot record: {err}"),
        },
        Command::Say { text, finished } => {
            if !speech.hear(&text, finished) {
                println!("not recording, use `record` first");
            }
        }
        Command::Tilt => {
            if controller.toggle_streaming().await {
                println!("streaming, use `sample` to tilt");
            } else {
                println!("streaming stopped");
            }
        }
        Command::Sample(sample) => {
            if !motion.tilt(sample) {
                println!("not streaming, use `tilt` first");
            }
        }
        Command::Status => match serde_json::to_string_pretty(&controller.snapshot()) {
            Ok(json) => println!("{json}"),
            Err(err) => tracing::warn!(%err, "failed to serialize state"),
        },
        Command::Help => println!("{}", console::HELP),
        Command::Quit => {}
    }
}

/// Echo the events a user would see on screen.
async fn print_events(mut events: broadcast::Receiver<BulbEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => match event.kind {
                EventKind::Notice(notice) => println!("! {notice}"),
                EventKind::Connected { address } => println!("connected to {address}"),
                EventKind::Disconnected { address } => println!("disconnected from {address}"),
                EventKind::ConnectionFailed { address, reason } => {
                    println!("could not connect to {address}: {reason}");
                }
                EventKind::ColorApplied {
                    color,
                    source,
                    delivery,
                } => println!("{source} {color} {} [{delivery:?}]", color.to_rgb_string()),
                EventKind::Transcribed { text, finished } => {
                    println!("heard {text:?}{}", if finished { " (final)" } else { "" });
                }
                _ => {}
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "console fell behind on events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
