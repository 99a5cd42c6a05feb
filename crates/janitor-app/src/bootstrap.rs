//! Startup wiring: load configuration, build every collaborator the runner
//! needs, and hand off to [`janitor_runner::Runner::run`] until a shutdown
//! signal arrives.

use std::sync::Arc;

use janitor_clients::{ClientRegistry, DelugeClient, QbittorrentClient, TransmissionClient};
use janitor_config::{ClientsConfig, DestinationConfig, ReasonsValue, Settings};
use janitor_events::{Destination, DestinationKind, EventBus};
use janitor_http::HttpClient;
use janitor_ledger::Ledger;
use janitor_runner::Runner;
use janitor_telemetry::LoggingConfig;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};

const DEFAULT_CONFIG_PATH: &str = "/app/config.yaml";

/// Load configuration, install logging, and run the janitor loop until
/// `SIGINT`/`SIGTERM`-equivalent shutdown (`Ctrl-C`) is received.
///
/// # Errors
///
/// Returns an error if the settings document cannot be loaded or the
/// tracing subscriber cannot be installed; both abort before any manager is
/// ever contacted.
pub async fn run_app() -> AppResult<()> {
    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut settings = janitor_config::load(std::path::Path::new(&config_path)).map_err(AppError::Config)?;
    janitor_config::overlay_env(&mut settings);
    janitor_config::sanitize(&mut settings);
    let warnings = janitor_config::validate(&settings);

    let logging = LoggingConfig { debug: settings.general.debug_logging, structured: settings.general.structured_logs };
    janitor_telemetry::init_logging(logging).map_err(AppError::Telemetry)?;

    for warning in &warnings {
        warn!(warning, "configuration validation warning");
    }
    info!(config = %config_path, managers = settings.services.len(), "queue janitor starting");

    let ledger = Ledger::new(settings.general.strike_file_path.clone());
    let events = EventBus::new(build_destinations(&settings), settings.general.debug_logging, settings.general.dry_run);
    let clients = build_clients(&settings.clients);
    let http = HttpClient::new();

    let runner = Arc::new(Runner::new(settings, http, ledger, events, clients));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received, finishing current cycle");
            let _ = shutdown_tx.send(true);
        }
    });

    runner.run(shutdown_rx).await;
    info!("queue janitor stopped");
    Ok(())
}

fn build_clients(config: &ClientsConfig) -> ClientRegistry {
    let qbittorrent = config
        .qbittorrent
        .as_ref()
        .map(|c| QbittorrentClient::new(c.url.clone(), c.username.clone().unwrap_or_default(), c.password.clone().unwrap_or_default()));
    let transmission = config.transmission.as_ref().map(|c| TransmissionClient::new(c.url.clone(), c.username.clone(), c.password.clone()));
    let deluge = config.deluge.as_ref().map(|c| DelugeClient::new(c.url.clone(), c.password.clone()));
    ClientRegistry::new(qbittorrent, transmission, deluge)
}

fn build_destinations(settings: &Settings) -> Vec<Destination> {
    settings.notifications.destinations.iter().filter_map(destination_from_config).collect()
}

fn destination_from_config(config: &DestinationConfig) -> Option<Destination> {
    let url = config.url.clone()?;
    let name = config.name.clone().unwrap_or_else(|| url.clone());
    let kind = DestinationKind::parse(config.kind.as_deref().unwrap_or("generic"));
    let reasons = config.reasons.clone().map(ReasonsValue::into_vec).unwrap_or_default();
    Some(Destination {
        name,
        kind,
        url,
        batch: config.batch,
        reasons,
        template: config.template.clone(),
        raw_json: config.raw_json,
        headers: config.headers.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_from_config_requires_url() {
        let config = DestinationConfig::default();
        assert!(destination_from_config(&config).is_none());
    }

    #[test]
    fn destination_from_config_defaults_name_to_url() {
        let config = DestinationConfig { url: Some("https://example.test/hook".to_string()), ..DestinationConfig::default() };
        let destination = destination_from_config(&config).unwrap();
        assert_eq!(destination.name, "https://example.test/hook");
        assert_eq!(destination.kind, DestinationKind::Generic);
    }

    #[test]
    fn build_clients_is_empty_with_no_configured_adapters() {
        let registry = build_clients(&ClientsConfig::default());
        assert!(registry.is_empty());
    }
}
