//! MetroPad - drive the Metro shell with a gamepad
//!
//! Samples XInput controllers in the background and turns button and stick
//! state into synthesized keyboard/mouse input, with a tray icon for picking
//! the controller, testing vibration, and quitting.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use metropad::config::AppConfig;
use metropad::xinput::hub::DEFAULT_RATE_HZ;

/// MetroPad - gamepad navigation for the Metro shell
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Sampling rate in updates per second (1-1000)
    #[arg(short, long, env = "METROPAD_RATE", default_value_t = DEFAULT_RATE_HZ)]
    rate: u32,

    /// Controller slot to map (1-4); defaults to the first connected one
    #[arg(short, long)]
    controller: Option<u32>,

    /// Cursor pixels per poll cycle of stick deflection
    #[arg(long, default_value_t = 10)]
    mouse_step: i32,

    /// Run without the tray UI
    #[arg(long)]
    no_tray: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    info!("Starting MetroPad...");

    let config = AppConfig {
        poll_hz: args.rate,
        controller: metropad::config::slot_from_cli(args.controller),
        mouse_step: args.mouse_step,
        tray_enabled: !args.no_tray,
        ..Default::default()
    }
    .validated();

    run(config).await?;

    info!("MetroPad shutdown complete");
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

#[cfg(windows)]
async fn run(config: AppConfig) -> Result<()> {
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::Context;
    use parking_lot::RwLock;
    use tracing::{debug, warn};

    use metropad::mapper::{MapperSettings, MapperVerdict, MetroMapper, PollMode};
    use metropad::synth::SendInputDispatcher;
    use metropad::tray::{spawn_tray, SessionState, TrayCommand, TrayStatusPublisher};
    use metropad::xinput::{ControllerHub, GamepadGateway, XInputGateway};

    let gateway: Arc<dyn GamepadGateway> = Arc::new(XInputGateway::new()?);
    let hub = Arc::new(ControllerHub::new(gateway));
    let mut events = hub
        .take_event_receiver()
        .context("state event receiver already taken")?;

    // Device type and motor limits, logged whenever a slot is picked.
    fn log_capabilities(hub: &ControllerHub, index: u32) {
        match hub.controller(index).capabilities() {
            Ok(caps) => tracing::debug!(
                "Controller {}: device type {}, subtype {}, motors ({}, {})",
                index + 1,
                caps.device_type,
                caps.sub_type,
                caps.vibration.0,
                caps.vibration.1
            ),
            Err(e) => tracing::debug!("Controller {}: capabilities query failed: {}", index + 1, e),
        }
    }

    // Pinned slot from the CLI wins; otherwise scan for the lowest
    // connected one. Neither being available is fine, a controller plugged
    // in later is adopted when its first state change arrives.
    let selected = config.controller.or_else(|| hub.first_connected());
    match selected {
        Some(index) => log_capabilities(&hub, index),
        None => warn!("No controller connected; plug one in to start mapping"),
    }

    let session = Arc::new(RwLock::new(SessionState {
        selected,
        mapping_paused: false,
    }));

    hub.set_rate(config.poll_hz);
    hub.start_polling();
    info!("Sampling at {} Hz", config.poll_hz);

    let mut mapper = MetroMapper::new(
        SendInputDispatcher::new(),
        MapperSettings {
            mouse_step: config.mouse_step,
            settle: config.settle(),
            ..Default::default()
        },
    );
    let mut poll_mode = PollMode::Active;

    let mut tray_commands = if config.tray_enabled {
        let handle = spawn_tray()?;
        tokio::spawn(
            TrayStatusPublisher::new(handle.updates, Arc::clone(&hub), Arc::clone(&session))
                .run(),
        );
        info!("Tray UI started");
        Some(handle.commands)
    } else {
        None
    };

    async fn next_tray_command(
        rx: &mut Option<tokio::sync::mpsc::UnboundedReceiver<TrayCommand>>,
    ) -> TrayCommand {
        match rx {
            Some(rx) => match rx.recv().await {
                Some(command) => command,
                None => std::future::pending().await,
            },
            None => std::future::pending().await,
        }
    }

    loop {
        tokio::select! {
            Some(change) = events.recv() => {
                let selected = {
                    let mut session = session.write();
                    match session.selected {
                        Some(slot) => slot,
                        None => {
                            info!("Controller {} connected, mapping it", change.index + 1);
                            session.selected = Some(change.index);
                            log_capabilities(&hub, change.index);
                            change.index
                        }
                    }
                };
                if change.index != selected || session.read().mapping_paused {
                    continue;
                }

                match poll_mode {
                    // Idled: only the toggle chord is watched; ordinary
                    // controls synthesize nothing until active again.
                    PollMode::Idle => {
                        if mapper.check_idle_chord(&change.current.pad)
                            == MapperVerdict::ToggleIdle
                        {
                            poll_mode = poll_mode.toggled();
                            hub.set_rate(config.poll_hz);
                            info!("Idle chord: sampling at {} Hz", config.poll_hz);
                        }
                    }
                    PollMode::Active => match mapper.apply(&change.current.pad) {
                        Ok(MapperVerdict::ToggleIdle) => {
                            poll_mode = poll_mode.toggled();
                            hub.set_rate(config.idle_hz);
                            // Entering idle with keys still down would leave
                            // them stuck until the next toggle.
                            if let Err(e) = mapper.release_all() {
                                warn!("Failed to release held keys: {}", e);
                            }
                            info!("Idle chord: sampling at {} Hz", config.idle_hz);
                        }
                        Ok(MapperVerdict::HeldOff) => debug!("Mapping pass held off"),
                        Ok(MapperVerdict::Mapped) => {}
                        Err(e) => warn!("Failed to synthesize input: {}", e),
                    }
                }
            }

            command = next_tray_command(&mut tray_commands) => {
                match command {
                    TrayCommand::SelectController(index) => {
                        if let Err(e) = mapper.release_all() {
                            warn!("Failed to release held keys: {}", e);
                        }
                        session.write().selected = Some(index);
                        info!("Mapping controller {}", index + 1);
                        log_capabilities(&hub, index);
                    }
                    TrayCommand::TestVibration => {
                        if let Some(index) = session.read().selected {
                            info!("Vibration test on controller {}", index + 1);
                            hub.controller(index)
                                .vibrate(1.0, 1.0, Some(Duration::from_secs(2)));
                        }
                    }
                    TrayCommand::ToggleMapping => {
                        let paused = {
                            let mut session = session.write();
                            session.mapping_paused = !session.mapping_paused;
                            session.mapping_paused
                        };
                        if paused {
                            if let Err(e) = mapper.release_all() {
                                warn!("Failed to release held keys: {}", e);
                            }
                        }
                        info!("Mapping {}", if paused { "paused" } else { "resumed" });
                    }
                    TrayCommand::Shutdown => {
                        info!("Shutdown requested from tray");
                        break;
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, shutting down");
                break;
            }
        }
    }

    hub.stop_polling();
    if let Err(e) = mapper.release_all() {
        warn!("Failed to release held keys on shutdown: {}", e);
    }

    Ok(())
}

#[cfg(not(windows))]
async fn run(_config: AppConfig) -> Result<()> {
    anyhow::bail!("MetroPad drives the Windows shell and only runs on Windows")
}
