//! Building backends from configuration records.
//!
//! Implementation tags map to constructors through [`BackendClass`]; there
//! is no dynamic loading. Wrappers (taxi, ridesharing, car with park) build
//! their delegates from nested records, defaulting to the engine.

use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::info;

use crate::breaker::BreakerConfig;
use crate::compose::{CarWithPark, CarWithParkConfig, Ridesharing, Taxi};
use crate::domain::StreetNetworkMode;
use crate::http::{Here, HereConfig, SetupError, Valhalla, ValhallaConfig};
use crate::kraken::{EngineRpc, Kraken};
use crate::network::StreetNetworkService;

use super::config::BackendConfig;

/// Error building a backend from its record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown street network class {0}")]
    UnknownClass(String),

    #[error("invalid arguments for {id}: {reason}")]
    InvalidArgs { id: String, reason: String },

    #[error("cannot build {id}: {source}")]
    Setup {
        id: String,
        #[source]
        source: SetupError,
    },
}

/// Implementations a record can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendClass {
    Kraken,
    Valhalla,
    Here,
    Taxi,
    Ridesharing,
    CarWithPark,
}

impl FromStr for BackendClass {
    type Err = ConfigError;

    /// Accepts bare tags (`car_with_park`) and dotted class paths
    /// (`jormungandr.street_network.kraken.Kraken`); case and underscores
    /// are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.rsplit('.').next().unwrap_or(s).to_lowercase().replace('_', "");
        match tag.as_str() {
            "kraken" => Ok(BackendClass::Kraken),
            "valhalla" => Ok(BackendClass::Valhalla),
            "here" => Ok(BackendClass::Here),
            "taxi" => Ok(BackendClass::Taxi),
            "ridesharing" => Ok(BackendClass::Ridesharing),
            "carwithpark" => Ok(BackendClass::CarWithPark),
            _ => Err(ConfigError::UnknownClass(s.to_string())),
        }
    }
}

/// Call protocol arguments shared by every guarded backend.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CallArgs {
    timeout: Option<u64>,
    circuit_breaker_max_fail: Option<u32>,
    circuit_breaker_reset_timeout: Option<u64>,
}

impl CallArgs {
    fn breaker(&self) -> BreakerConfig {
        let mut config = BreakerConfig::default();
        if let Some(secs) = self.timeout {
            config = config.with_call_timeout(secs);
        }
        if let Some(n) = self.circuit_breaker_max_fail {
            config = config.with_fail_max(n);
        }
        if let Some(secs) = self.circuit_breaker_reset_timeout {
            config = config.with_reset_timeout(secs);
        }
        config
    }
}

fn engine_backend() -> BackendConfig {
    BackendConfig::new("kraken", &[]).with_args(json!({ "timeout": 10 }))
}

#[derive(Debug, Deserialize)]
struct WrapperArgs {
    #[serde(default = "engine_backend")]
    street_network: BackendConfig,
}

#[derive(Debug, Deserialize)]
struct CarWithParkArgs {
    #[serde(default = "engine_backend")]
    car: BackendConfig,
    #[serde(default = "engine_backend")]
    walking: BackendConfig,
    #[serde(flatten)]
    config: CarWithParkConfig,
}

/// Builds the backends of one deployment.
#[derive(Clone)]
pub struct BackendFactory {
    deployment: String,
    engine: Arc<dyn EngineRpc>,
}

impl BackendFactory {
    /// `engine` is the deployment's routing engine, shared by every engine
    /// backend built here.
    pub fn new(deployment: impl Into<String>, engine: Arc<dyn EngineRpc>) -> Self {
        Self {
            deployment: deployment.into(),
            engine,
        }
    }

    pub fn deployment(&self) -> &str {
        &self.deployment
    }

    /// Build the backend a record describes.
    ///
    /// # Errors
    ///
    /// Returns `Err` for an unknown class, malformed arguments or a backend
    /// whose constructor rejects them (e.g. missing `service_url`).
    pub fn build(&self, config: &BackendConfig) -> Result<Arc<dyn StreetNetworkService>, ConfigError> {
        let id = config.id_or_default();
        let service = self.build_as(&id, config)?;
        info!(
            deployment = %self.deployment,
            backend = %id,
            class = %config.class,
            "street network backend built"
        );
        Ok(service)
    }

    fn build_as(
        &self,
        id: &str,
        config: &BackendConfig,
    ) -> Result<Arc<dyn StreetNetworkService>, ConfigError> {
        let class: BackendClass = config.class.parse()?;
        let modes = config.known_modes();
        let args = self.prepare_args(id, &config.args)?;
        let breaker = parse_args::<CallArgs>(id, &args)?.breaker();

        let service: Arc<dyn StreetNetworkService> = match class {
            BackendClass::Kraken => Arc::new(Kraken::new(id, &modes, self.engine.clone(), breaker)),
            BackendClass::Valhalla => {
                let options: ValhallaConfig = parse_args(id, &args)?;
                Arc::new(Valhalla::new(id, &modes, options, breaker).map_err(setup_error(id))?)
            }
            BackendClass::Here => {
                let options: HereConfig = parse_args(id, &args)?;
                Arc::new(Here::new(id, &modes, options, breaker).map_err(setup_error(id))?)
            }
            BackendClass::Taxi => {
                let wrapper: WrapperArgs = parse_args(id, &args)?;
                let delegate = self.delegate(id, "street_network", &wrapper.street_network)?;
                Arc::new(Taxi::new(id, &modes, delegate))
            }
            BackendClass::Ridesharing => {
                let wrapper: WrapperArgs = parse_args(id, &args)?;
                let delegate = self.delegate(id, "street_network", &wrapper.street_network)?;
                Arc::new(Ridesharing::new(id, &modes, delegate))
            }
            BackendClass::CarWithPark => {
                let parts: CarWithParkArgs = parse_args(id, &args)?;
                let car = self.delegate(id, "car", &parts.car)?;
                let walking = self.delegate(id, "walking", &parts.walking)?;
                let parkings = Arc::new(Kraken::new(
                    format!("{id}:parkings"),
                    &[StreetNetworkMode::Walking],
                    self.engine.clone(),
                    breaker,
                ));
                Arc::new(CarWithPark::new(id, &modes, car, walking, parkings, parts.config))
            }
        };
        Ok(service)
    }

    /// Build a wrapped backend; its id is derived from the wrapper's.
    fn delegate(
        &self,
        parent: &str,
        role: &str,
        config: &BackendConfig,
    ) -> Result<Arc<dyn StreetNetworkService>, ConfigError> {
        let id = config
            .id
            .clone()
            .unwrap_or_else(|| format!("{parent}:{role}"));
        self.build_as(&id, config)
    }

    /// Arguments always carry `service_url` (possibly null) and the
    /// deployment name.
    fn prepare_args(&self, id: &str, args: &Value) -> Result<Value, ConfigError> {
        let mut map = match args {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            other => {
                return Err(ConfigError::InvalidArgs {
                    id: id.to_string(),
                    reason: format!("expected an object, got {other}"),
                });
            }
        };
        map.entry("service_url").or_insert(Value::Null);
        map.insert("deployment".to_string(), Value::from(self.deployment.as_str()));
        Ok(Value::Object(map))
    }
}

fn parse_args<T: DeserializeOwned>(id: &str, args: &Value) -> Result<T, ConfigError> {
    T::deserialize(args).map_err(|e| ConfigError::InvalidArgs {
        id: id.to_string(),
        reason: e.to_string(),
    })
}

fn setup_error(id: &str) -> impl Fn(SetupError) -> ConfigError + '_ {
    move |source| ConfigError::Setup {
        id: id.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaker::CallError;
    use crate::kraken::{EngineRequest, EngineResponse};
    use async_trait::async_trait;

    struct SilentEngine;

    #[async_trait]
    impl EngineRpc for SilentEngine {
        async fn send(&self, _request: &EngineRequest) -> Result<EngineResponse, CallError> {
            Ok(EngineResponse::default())
        }
    }

    fn factory() -> BackendFactory {
        BackendFactory::new("fr-idf", Arc::new(SilentEngine))
    }

    fn config(value: Value) -> BackendConfig {
        serde_json::from_value(value).unwrap()
    }

    fn build(value: Value) -> Result<Arc<dyn StreetNetworkService>, ConfigError> {
        factory().build(&config(value))
    }

    #[test]
    fn class_tags() {
        assert_eq!("kraken".parse::<BackendClass>(), Ok(BackendClass::Kraken));
        assert_eq!(
            "jormungandr.street_network.kraken.Kraken".parse::<BackendClass>(),
            Ok(BackendClass::Kraken)
        );
        assert_eq!("car_with_park".parse::<BackendClass>(), Ok(BackendClass::CarWithPark));
        assert_eq!(
            "jormungandr.street_network.CarWithPark".parse::<BackendClass>(),
            Ok(BackendClass::CarWithPark)
        );
        for bad in [
            "jormungandr",
            "jormungandr.street_network.valhalla.bob",
            "jormungandr/street_network/tests/StreetNetworkBackendMock",
        ] {
            assert_eq!(
                bad.parse::<BackendClass>(),
                Err(ConfigError::UnknownClass(bad.to_string()))
            );
        }
    }

    #[test]
    fn kraken_from_class_path() {
        let service = build(json!({
            "id": "kraken",
            "class": "jormungandr.street_network.kraken.Kraken",
            "modes": ["walking", "bike", "bss", "car"],
            "args": { "timeout": 2, "circuit_breaker_max_fail": 3 }
        }))
        .unwrap();

        let status = service.status();
        assert_eq!(status.id, "kraken");
        assert_eq!(status.class, "Kraken");
        assert_eq!(status.modes.len(), 4);
        assert_eq!(status.timeout, Some(2));
    }

    #[test]
    fn valhalla_needs_a_valid_url() {
        let err = build(json!({ "class": "valhalla", "modes": ["walking"] })).err();
        assert!(matches!(
            err,
            Some(ConfigError::Setup {
                source: SetupError::MissingUrl,
                ..
            })
        ));

        let err = build(json!({ "class": "valhalla", "args": { "service_url": "" } })).err();
        assert!(matches!(
            err,
            Some(ConfigError::Setup {
                source: SetupError::MissingUrl,
                ..
            })
        ));

        let err = build(json!({ "class": "valhalla", "args": { "service_url": "bob" } })).err();
        assert!(matches!(
            err,
            Some(ConfigError::Setup {
                source: SetupError::InvalidUrl { .. },
                ..
            })
        ));
    }

    #[test]
    fn valhalla_with_costing_options() {
        for args in [
            json!({ "service_url": "http://localhost:8002" }),
            json!({ "service_url": "http://localhost:8002", "costing_options": {} }),
            json!({
                "service_url": "http://localhost:8002",
                "costing_options": { "pedestrian": { "walking_speed": 50.1 } }
            }),
        ] {
            let service = build(json!({
                "class": "jormungandr.street_network.valhalla.Valhalla",
                "modes": ["walking", "bike", "car"],
                "args": args
            }))
            .unwrap();
            assert_eq!(service.status().class, "Valhalla");
        }
    }

    #[test]
    fn args_must_be_an_object() {
        let err = build(json!({ "class": "kraken", "args": [1, 2] })).err();
        assert!(matches!(err, Some(ConfigError::InvalidArgs { .. })));
    }

    #[test]
    fn taxi_wraps_the_engine_by_default() {
        let service = build(json!({ "class": "taxi", "modes": ["taxi"] })).unwrap();
        let status = service.status();
        assert_eq!(status.class, "Taxi");
        assert_eq!(status.id, "taxi_taxi");
        assert_eq!(status.delegates[0].class, "Kraken");
        assert_eq!(status.delegates[0].id, "taxi_taxi:street_network");
    }

    #[test]
    fn ridesharing_wraps_the_configured_backend() {
        let service = build(json!({
            "id": "rs",
            "class": "ridesharing",
            "modes": ["ridesharing"],
            "args": {
                "street_network": {
                    "id": "valhalla-car",
                    "class": "valhalla",
                    "modes": ["car"],
                    "args": { "service_url": "http://valhalla:8002" }
                }
            }
        }))
        .unwrap();
        let status = service.status();
        assert_eq!(status.class, "Ridesharing");
        assert_eq!(status.delegates[0].id, "valhalla-car");
        assert_eq!(status.delegates[0].class, "Valhalla");
    }

    #[test]
    fn wrapped_backend_errors_surface() {
        let err = build(json!({
            "class": "taxi",
            "args": { "street_network": { "class": "surf" } }
        }))
        .err();
        assert_eq!(err, Some(ConfigError::UnknownClass("surf".into())));
    }

    #[test]
    fn car_with_park_delegates() {
        let service = build(json!({
            "id": "cwp",
            "class": "car_with_park",
            "modes": ["car"],
            "args": { "park_duration_secs": 120 }
        }))
        .unwrap();
        let status = service.status();
        assert_eq!(status.class, "CarWithPark");
        let delegates: Vec<_> = status.delegates.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(delegates, ["cwp:car", "cwp:walking"]);
    }
}
