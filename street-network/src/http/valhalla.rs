//! Valhalla routing service adapter.

use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::breaker::{BreakerConfig, CallError, CircuitBreaker};
use crate::domain::{Journey, Place, RoutingMatrixRow, Section, StreetNetworkMode};
use crate::network::{
    BackendStatus, DirectPathQuery, DirectPathResponse, NoSolutionCode, RoutingParams,
    StreetNetworkError, StreetNetworkService, check_matrix_cardinality,
};

use super::polyline::decode_polyline;
use super::transport::JsonTransport;
use super::{SetupError, endpoint, parse_service_url};

/// Default distance unit of Valhalla answers.
const DEFAULT_UNITS: &str = "kilometers";

const METERS_PER_KILOMETER: f64 = 1_000.0;
const METERS_PER_MILE: f64 = 1_609.344;

/// Constructor arguments of a Valhalla backend.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ValhallaConfig {
    pub service_url: Option<String>,
    pub api_key: Option<String>,
    /// Passed through as `directions_options`; `units` defaults to kilometers
    #[serde(default)]
    pub directions_options: Map<String, Value>,
    /// Extra costing options, keyed by Valhalla costing name
    #[serde(default)]
    pub costing_options: Map<String, Value>,
}

impl ValhallaConfig {
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            service_url: Some(service_url.into()),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the costing options of one costing (e.g. `pedestrian`).
    pub fn with_costing_options(mut self, costing: &str, options: Value) -> Self {
        self.costing_options.insert(costing.to_string(), options);
        self
    }
}

#[derive(Debug, Serialize)]
struct Location {
    lat: f64,
    lon: f64,
    #[serde(rename = "type")]
    kind: &'static str,
}

impl Location {
    fn of(place: &Place) -> Self {
        let coord = place.coord();
        Self {
            lat: coord.lat(),
            lon: coord.lon(),
            kind: "break",
        }
    }
}

#[derive(Debug, Serialize)]
struct RouteRequest<'a> {
    locations: Vec<Location>,
    costing: &'static str,
    directions_options: &'a Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    costing_options: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
struct MatrixRequest<'a> {
    sources: Vec<Location>,
    targets: Vec<Location>,
    costing: &'static str,
    units: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    costing_options: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    trip: Trip,
}

#[derive(Debug, Deserialize)]
struct Trip {
    #[serde(default)]
    legs: Vec<Leg>,
    units: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Leg {
    #[serde(default)]
    shape: String,
    summary: Summary,
}

#[derive(Debug, Deserialize)]
struct Summary {
    /// Seconds
    time: f64,
    /// In `units`
    length: f64,
}

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    #[serde(default)]
    sources_to_targets: Vec<Vec<MatrixEntry>>,
}

#[derive(Debug, Deserialize)]
struct MatrixEntry {
    /// Seconds, absent when the target cannot be reached
    time: Option<f64>,
}

/// Backend answered by a Valhalla server.
pub struct Valhalla {
    id: String,
    modes: Vec<StreetNetworkMode>,
    route_url: String,
    matrix_url: String,
    auth: Vec<(String, String)>,
    directions_options: Map<String, Value>,
    costing_options: Map<String, Value>,
    transport: JsonTransport,
    breaker: CircuitBreaker,
}

impl Valhalla {
    /// Build the adapter.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `service_url` is missing or not a URL.
    pub fn new(
        id: impl Into<String>,
        modes: &[StreetNetworkMode],
        config: ValhallaConfig,
        breaker: BreakerConfig,
    ) -> Result<Self, SetupError> {
        let base = parse_service_url(config.service_url.as_deref())?;
        let id = id.into();

        let mut directions_options = config.directions_options;
        directions_options
            .entry("units")
            .or_insert_with(|| Value::from(DEFAULT_UNITS));

        Ok(Self {
            route_url: endpoint(&base, "route"),
            matrix_url: endpoint(&base, "sources_to_targets"),
            auth: config
                .api_key
                .map(|k| vec![("api_key".to_string(), k)])
                .unwrap_or_default(),
            directions_options,
            costing_options: config.costing_options,
            transport: JsonTransport::new(breaker.call_timeout_secs)?,
            breaker: CircuitBreaker::new(id.clone(), breaker),
            modes: modes.to_vec(),
            id,
        })
    }

    fn costing(&self, mode: StreetNetworkMode) -> Result<&'static str, StreetNetworkError> {
        match mode {
            StreetNetworkMode::Walking => Ok("pedestrian"),
            StreetNetworkMode::Bike => Ok("bicycle"),
            StreetNetworkMode::Car | StreetNetworkMode::CarNoPark => Ok("auto"),
            _ => Err(StreetNetworkError::UnsupportedMode {
                backend: self.id.clone(),
                mode,
            }),
        }
    }

    /// Configured costing options for `costing`, with the request speed in km/h.
    fn costing_options(
        &self,
        costing: &str,
        mode: StreetNetworkMode,
        params: &RoutingParams,
    ) -> Option<Map<String, Value>> {
        let mut options = self
            .costing_options
            .get(costing)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let speed_key = match costing {
            "pedestrian" => Some("walking_speed"),
            "bicycle" => Some("cycling_speed"),
            _ => None,
        };
        if let Some(key) = speed_key {
            options.insert(key.to_string(), Value::from(params.speed(mode) * 3.6));
        }

        if options.is_empty() {
            None
        } else {
            let mut wrapped = Map::new();
            wrapped.insert(costing.to_string(), Value::Object(options));
            Some(wrapped)
        }
    }

    fn units(&self) -> &str {
        self.directions_options
            .get("units")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_UNITS)
    }

    /// Turn the first leg of a trip into a one-section journey anchored on
    /// the query extremity.
    fn read_route(
        &self,
        response: &RouteResponse,
        query: DirectPathQuery<'_>,
    ) -> Result<DirectPathResponse, StreetNetworkError> {
        let Some(leg) = response.trip.legs.first() else {
            return Ok(DirectPathResponse::no_solution(
                NoSolutionCode::NoSolution,
                "no leg in trip",
            ));
        };

        let units = response.trip.units.as_deref().unwrap_or(self.units());
        let mut section = Section::street_network(
            query.mode,
            query.origin.clone(),
            query.destination.clone(),
            query.extremity.datetime,
            Duration::seconds(leg.summary.time.round() as i64),
            to_meters(leg.summary.length, units),
        );
        section.coordinates =
            decode_polyline(&leg.shape).map_err(|e| self.invalid_response(e.to_string()))?;

        let mut journey = Journey::from_sections(vec![section])
            .map_err(|e| self.invalid_response(e.to_string()))?;
        journey.anchor(query.extremity);

        Ok(DirectPathResponse::with_journeys(vec![journey]))
    }

    fn invalid_response(&self, message: impl Into<String>) -> StreetNetworkError {
        StreetNetworkError::InvalidResponse {
            backend: self.id.clone(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl StreetNetworkService for Valhalla {
    fn id(&self) -> &str {
        &self.id
    }

    fn modes(&self) -> &[StreetNetworkMode] {
        &self.modes
    }

    async fn direct_path(
        &self,
        query: DirectPathQuery<'_>,
        params: &RoutingParams,
    ) -> Result<DirectPathResponse, StreetNetworkError> {
        let costing = self.costing(query.mode)?;
        let body = RouteRequest {
            locations: vec![Location::of(query.origin), Location::of(query.destination)],
            costing,
            directions_options: &self.directions_options,
            costing_options: self.costing_options(costing, query.mode, params),
        };

        let result: Result<RouteResponse, CallError> = self
            .breaker
            .call(self.transport.post(&self.route_url, &self.auth, &body))
            .await;

        let response = match result {
            Ok(response) => response,
            // Valhalla answers 400 when no route exists between the locations
            Err(CallError::Status { status: 400, body }) => {
                debug!(
                    backend = %self.id,
                    request_id = %params.request_id,
                    body = %body,
                    "no route found"
                );
                return Ok(DirectPathResponse::no_solution(NoSolutionCode::NoSolution, body));
            }
            Err(e) => {
                warn!(backend = %self.id, request_id = %params.request_id, error = %e, "route call failed");
                return Err(e.into());
            }
        };

        self.read_route(&response, query)
    }

    async fn routing_matrix(
        &self,
        origins: &[Place],
        destinations: &[Place],
        mode: StreetNetworkMode,
        max_duration: Duration,
        params: &RoutingParams,
    ) -> Result<Vec<RoutingMatrixRow>, StreetNetworkError> {
        check_matrix_cardinality(origins, destinations)?;
        if origins.is_empty() || destinations.is_empty() {
            return Ok(Vec::new());
        }

        let costing = self.costing(mode)?;
        let body = MatrixRequest {
            sources: origins.iter().map(Location::of).collect(),
            targets: destinations.iter().map(Location::of).collect(),
            costing,
            units: self.units(),
            costing_options: self.costing_options(costing, mode, params),
        };

        let response: MatrixResponse = self
            .breaker
            .call(self.transport.post(&self.matrix_url, &self.auth, &body))
            .await
            .inspect_err(|e| {
                warn!(backend = %self.id, request_id = %params.request_id, error = %e, "matrix call failed");
            })?;

        Ok(read_matrix(&response, origins.len(), destinations.len(), max_duration))
    }

    fn status(&self) -> BackendStatus {
        BackendStatus::new(&self.id, "Valhalla", &self.modes).with_breaker(
            self.breaker.config().call_timeout_secs,
            self.breaker.status(),
        )
    }
}

fn to_meters(length: f64, units: &str) -> f64 {
    match units {
        "miles" | "mi" => length * METERS_PER_MILE,
        _ => length * METERS_PER_KILOMETER,
    }
}

/// Flatten a 1×n or n×1 answer along its multi-valued side.
fn read_matrix(
    response: &MatrixResponse,
    origins: usize,
    destinations: usize,
    max_duration: Duration,
) -> Vec<RoutingMatrixRow> {
    let entry = |i: usize, j: usize| {
        match response
            .sources_to_targets
            .get(i)
            .and_then(|row| row.get(j))
            .and_then(|e| e.time)
        {
            Some(time) => {
                let duration = Duration::seconds(time.round() as i64);
                if duration <= max_duration {
                    RoutingMatrixRow::reached(duration)
                } else {
                    RoutingMatrixRow::unreached()
                }
            }
            None => RoutingMatrixRow::unreached(),
        }
    };

    if origins > 1 {
        (0..origins).map(|i| entry(i, 0)).collect()
    } else {
        (0..destinations).map(|j| entry(0, j)).collect()
    }
}
