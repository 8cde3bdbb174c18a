//! `gps_bridge` – relays one simulated NavSat sensor onto the middleware.
//!
//! 1. Loads the sensor parameters (config file, `GPSBRIDGE_*` environment,
//!    flags) and fails fast if any of the five is missing.
//! 2. Builds the simulation and middleware buses, the [`GpsBridge`], and the
//!    rosbridge-style [`WsGateway`] unless `--no-gateway` is given.
//! 3. Runs until **Ctrl-C**.

mod args;
mod config;
mod telemetry;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use gpsbridge_middleware::{GpsBridge, SimEnvelope, TopicBus, WsGateway};
use gpsbridge_types::{BridgeConfig, BridgeError, NavSatFix};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::args::Args;
use crate::config::Config;

fn main() -> ExitCode {
    let _guard = telemetry::init_tracing("gps_bridge");
    let args = Args::parse();

    let (cfg, bridge_config) = match config::load(&args).and_then(|cfg| {
        let bridge_config = cfg.bridge_config()?;
        Ok((cfg, bridge_config))
    }) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    // `shutdown_tx` lives until `main` returns so a failed install leaves the
    // bridge running instead of closing the channel.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    install_shutdown_hook(&shutdown_tx, |handler| ctrlc::set_handler(handler));

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(cfg, bridge_config, shutdown_rx));
    drop(shutdown_tx);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "gps bridge failed");
            ExitCode::FAILURE
        }
    }
}

type ShutdownHandler = Box<dyn FnMut() + Send + 'static>;

/// Register a handler that flips `shutdown` to `true` through `install`.
///
/// The handler holds its own clone of the sender, so `shutdown` stays open
/// whether or not `install` succeeds.
fn install_shutdown_hook<E: std::fmt::Display>(
    shutdown: &watch::Sender<bool>,
    install: impl FnOnce(ShutdownHandler) -> Result<(), E>,
) {
    let tx = shutdown.clone();
    let handler: ShutdownHandler = Box::new(move || {
        info!("Ctrl-C received – shutting down");
        let _ = tx.send(true);
    });
    if let Err(e) = install(handler) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }
}

async fn run(
    cfg: Config,
    bridge_config: BridgeConfig,
    shutdown: watch::Receiver<bool>,
) -> Result<(), BridgeError> {
    let sim_bus = TopicBus::<SimEnvelope>::default();
    let fix_bus = TopicBus::<NavSatFix>::default();

    let bridge = GpsBridge::new(
        Arc::new(bridge_config),
        Arc::new(sim_bus.clone()),
        Arc::new(fix_bus.clone()),
    )
    .with_output_topic(&cfg.output_topic);

    let gateway = if cfg.gateway {
        let addr = cfg.ws_socket_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| BridgeError::Transport(format!("ws bind error on {addr}: {e}")))?;
        let gateway = WsGateway::new(sim_bus, fix_bus, bridge.output_topic());
        Some(tokio::spawn(async move {
            if let Err(e) = gateway.serve(listener).await {
                error!(error = %e, "ws gateway stopped");
            }
        }))
    } else {
        None
    };

    bridge.run(shutdown).await;

    if let Some(handle) = gateway {
        handle.abort();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn bridge_config() -> BridgeConfig {
        BridgeConfig {
            world_name: "default".to_string(),
            name_space: "drone1".to_string(),
            sensor_name: "gps0".to_string(),
            link_name: "base_link".to_string(),
            sensor_type: "navsat_sensor".to_string(),
        }
    }

    fn headless() -> Config {
        Config {
            gateway: false,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn bridge_keeps_running_when_hook_install_fails() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        install_shutdown_hook(&shutdown_tx, |handler| {
            drop(handler);
            Err("handler already registered")
        });

        let outcome = tokio::time::timeout(
            Duration::from_millis(200),
            run(headless(), bridge_config(), shutdown_rx),
        )
        .await;
        assert!(outcome.is_err(), "bridge stopped without a shutdown signal");
        drop(shutdown_tx);
    }

    #[tokio::test]
    async fn installed_hook_stops_the_bridge() -> Result<(), Box<dyn std::error::Error>> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut installed: Option<ShutdownHandler> = None;
        install_shutdown_hook(&shutdown_tx, |handler| {
            installed = Some(handler);
            Ok::<(), &str>(())
        });

        let task = tokio::spawn(run(headless(), bridge_config(), shutdown_rx));
        let mut handler = installed.ok_or("handler not installed")?;
        handler();

        tokio::time::timeout(Duration::from_secs(1), task).await???;
        assert!(*shutdown_tx.borrow());
        Ok(())
    }
}
