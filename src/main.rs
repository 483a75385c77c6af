//! OCPP Central System
//!
//! OCPP 1.6-J WebSocket server for charge points.
//! Reads configuration from TOML file (~/.config/ocpp-central/config.toml).

use std::sync::Arc;

use tracing::{error, info, warn};

use ocpp_central::application::handlers::AcceptAllHandler;
use ocpp_central::config::{config_path_from_env, AppConfig};
use ocpp_central::support::shutdown::listen_for_shutdown_signals;
use ocpp_central::{ConnectionRegistry, OcppServer, ShutdownSignal};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Load configuration ─────────────────────────────────────
    let config_path = config_path_from_env();
    let config = match AppConfig::load(&config_path) {
        Ok(cfg) => {
            init_tracing(&cfg);
            info!("Configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            let cfg = AppConfig::default();
            init_tracing(&cfg);
            error!("Failed to load config: {}. Using defaults.", e);
            cfg
        }
    };

    info!("Starting OCPP Central System...");

    // ── Prometheus exporter (must be installed before any metrics calls) ──
    if let Some(port) = config.metrics.prometheus_port {
        match metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], port))
            .install()
        {
            Ok(()) => info!("Prometheus metrics exposed on :{}", port),
            Err(e) => warn!("Failed to install Prometheus exporter: {}", e),
        }
    }

    // ── Registry & handler ─────────────────────────────────────
    let registry = ConnectionRegistry::shared(
        Arc::new(AcceptAllHandler::new()),
        config.registry_options(),
    );
    registry.add_connection_listener(|charge_point_id, status| {
        info!(charge_point_id, %status, "Connectivity changed");
    });

    // ── Shutdown ───────────────────────────────────────────────
    let shutdown = ShutdownSignal::new();
    tokio::spawn(listen_for_shutdown_signals(shutdown.clone()));

    // ── WebSocket server ───────────────────────────────────────
    let server = OcppServer::bind(config.address(), registry)
        .await?
        .with_shutdown(shutdown);
    server.run().await?;

    info!("OCPP Central System stopped");
    Ok(())
}

/// Initialize tracing from the `[logging]` section; `RUST_LOG` wins when set.
fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}
