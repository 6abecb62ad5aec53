//! Backend configuration records.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::domain::StreetNetworkMode;

/// Default minimum time between two backing-store refreshes, in seconds.
const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 60;

/// Call timeout of the default engine backends, in seconds.
const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 10;

/// Modes answered by the engine when nothing else is configured for them.
const ENGINE_DEFAULT_MODES: [StreetNetworkMode; 5] = [
    StreetNetworkMode::Walking,
    StreetNetworkMode::Bike,
    StreetNetworkMode::Bss,
    StreetNetworkMode::Car,
    StreetNetworkMode::CarNoPark,
];

/// One backend, as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Unique within a deployment; derived from class and modes when absent
    #[serde(default)]
    pub id: Option<String>,

    /// Implementation tag (`kraken`, `valhalla`, `here`, `taxi`,
    /// `ridesharing`, `car_with_park`); dotted class paths are accepted
    #[serde(alias = "klass")]
    pub class: String,

    /// Constructor arguments of the implementation
    #[serde(default)]
    pub args: Value,

    /// Mode names; unknown names are kept but never resolved
    #[serde(default)]
    pub modes: Vec<String>,
}

impl BackendConfig {
    pub fn new(class: impl Into<String>, modes: &[StreetNetworkMode]) -> Self {
        Self {
            id: None,
            class: class.into(),
            args: Value::Null,
            modes: modes.iter().map(|m| m.as_str().to_string()).collect(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_args(mut self, args: Value) -> Self {
        self.args = args;
        self
    }

    /// The configured modes this crate knows about.
    pub fn known_modes(&self) -> Vec<StreetNetworkMode> {
        self.modes.iter().filter_map(|m| m.parse().ok()).collect()
    }

    /// The configured id, or one derived from the class and the modes.
    pub fn id_or_default(&self) -> String {
        self.id.clone().unwrap_or_else(|| {
            let class = self.class.rsplit('.').next().unwrap_or(&self.class);
            let mut id = class.to_lowercase();
            for mode in &self.modes {
                id.push('_');
                id.push_str(mode);
            }
            id
        })
    }
}

/// Complete the static configuration of a deployment.
///
/// Engine modes nobody answers get one engine backend covering all of them;
/// taxi and ridesharing get a wrapper around an engine car backend.
pub fn with_defaults(mut configs: Vec<BackendConfig>) -> Vec<BackendConfig> {
    let covered: BTreeSet<StreetNetworkMode> =
        configs.iter().flat_map(BackendConfig::known_modes).collect();

    let engine = || json!({ "class": "kraken", "args": { "timeout": DEFAULT_ENGINE_TIMEOUT_SECS }, "modes": [] });

    for (mode, class) in [
        (StreetNetworkMode::Taxi, "taxi"),
        (StreetNetworkMode::Ridesharing, "ridesharing"),
    ] {
        if !covered.contains(&mode) {
            configs.push(
                BackendConfig::new(class, &[mode]).with_args(json!({ "street_network": engine() })),
            );
        }
    }

    let uncovered: Vec<StreetNetworkMode> = ENGINE_DEFAULT_MODES
        .into_iter()
        .filter(|m| !covered.contains(m))
        .collect();
    if !uncovered.is_empty() {
        configs.push(
            BackendConfig::new("kraken", &uncovered)
                .with_args(json!({ "timeout": DEFAULT_ENGINE_TIMEOUT_SECS })),
        );
    }

    configs
}

/// Static configuration of one deployment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeploymentConfig {
    /// Base URL of the routing engine's street-network service
    pub engine_url: String,

    /// Engine call timeout, in seconds
    #[serde(default)]
    pub engine_timeout_secs: Option<u64>,

    #[serde(default)]
    pub street_network: Vec<BackendConfig>,
}

/// Configuration of the backend manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Minimum time between two backing-store refreshes, in seconds
    pub update_interval_secs: u64,
}

impl ManagerConfig {
    pub fn with_update_interval(mut self, secs: u64) -> Self {
        self.update_interval_secs = secs;
        self
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
        }
    }
}
