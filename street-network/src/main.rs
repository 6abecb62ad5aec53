use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use street_network::kraken::{EngineClientConfig, HttpEngineClient};
use street_network::manager::{
    BackendFactory, DeploymentConfig, FileBackendStore, ManagerConfig, StreetNetworkBackendManager,
};
use street_network::web::{AppState, create_router};

/// Configuration file used when `SN_CONFIG` is not set.
const DEFAULT_CONFIG_PATH: &str = "street_network.json";

/// Listen address used when `SN_LISTEN` is not set.
const DEFAULT_LISTEN: &str = "127.0.0.1:3000";

/// Contents of the `SN_CONFIG` file.
#[derive(Debug, Deserialize)]
struct ServiceConfig {
    /// Minimum time between two backing-store refreshes, in seconds
    #[serde(default)]
    update_interval_secs: Option<u64>,

    deployments: BTreeMap<String, DeploymentConfig>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::var("SN_CONFIG").unwrap_or_else(|_| {
        warn!("SN_CONFIG not set, reading {DEFAULT_CONFIG_PATH}");
        DEFAULT_CONFIG_PATH.to_string()
    });
    let contents = std::fs::read_to_string(&config_path).expect("Failed to read SN_CONFIG");
    let config: ServiceConfig = serde_json::from_str(&contents).expect("Failed to parse SN_CONFIG");

    let mut manager_config = ManagerConfig::default();
    if let Some(secs) = config.update_interval_secs {
        manager_config = manager_config.with_update_interval(secs);
    }
    let mut manager = StreetNetworkBackendManager::new(manager_config);
    if let Ok(path) = std::env::var("SN_STORE") {
        info!(path = %path, "backing store enabled");
        manager = manager.with_store(Arc::new(FileBackendStore::new(path)));
    }

    // One engine client per deployment, shared by its engine backends
    for (name, deployment) in config.deployments {
        let mut engine_config = EngineClientConfig::new(&deployment.engine_url);
        if let Some(secs) = deployment.engine_timeout_secs {
            engine_config = engine_config.with_timeout(secs);
        }
        let engine = HttpEngineClient::new(engine_config).expect("Failed to create engine client");
        manager.add_deployment(BackendFactory::new(name, Arc::new(engine)), deployment.street_network);
    }

    let manager = Arc::new(manager);
    if let Err(e) = manager.refresh().await {
        warn!(error = %e, "initial backing store load failed");
    }

    // Spawn background task polling the backing store
    let refresher = manager.clone();
    tokio::spawn(async move {
        let period = refresher.update_interval().max(Duration::from_secs(1));
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // First tick is immediate, skip it
        loop {
            interval.tick().await;
            match refresher.refresh_now().await {
                Ok(outcome) => debug!(?outcome, "backing store polled"),
                Err(e) => warn!(error = %e, "backing store refresh failed"),
            }
        }
    });

    let app = create_router(AppState::new(manager));

    let listen = std::env::var("SN_LISTEN").unwrap_or_else(|_| DEFAULT_LISTEN.to_string());
    let addr: SocketAddr = listen.parse().expect("Invalid SN_LISTEN address");
    info!("street network diagnostics listening on http://{addr}");
    info!("  GET /health               - Health check");
    info!("  GET /status               - Registered deployments");
    info!("  GET /status/{{deployment}}  - Backend status of a deployment");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
