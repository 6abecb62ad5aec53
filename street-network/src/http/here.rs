//! HERE routing service adapter.
//!
//! HERE answers with traffic, so unlike the other backends its paths
//! depend on the departure time: the path key keeps the extremity.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::breaker::{BreakerConfig, CallError, CircuitBreaker};
use crate::domain::{
    Coord, Journey, PeriodExtremity, Place, RoutingMatrixRow, Section, StreetNetworkMode,
    StreetNetworkPathType,
};
use crate::network::{
    BackendStatus, DirectPathQuery, DirectPathResponse, NoSolutionCode, RoutingParams,
    StreetNetworkError, StreetNetworkPathKey, StreetNetworkService, check_matrix_cardinality,
};

use super::transport::JsonTransport;
use super::{SetupError, endpoint, parse_service_url};

/// Default maximum number of points per side of a matrix query.
const DEFAULT_MAX_POINTS: usize = 100;

fn default_max_points() -> usize {
    DEFAULT_MAX_POINTS
}

/// Constructor arguments of a HERE backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HereConfig {
    pub service_url: Option<String>,
    /// Defaults to the `matrix.` subdomain of `service_url`
    pub matrix_service_url: Option<String>,
    pub api_id: Option<String>,
    pub api_code: Option<String>,
    /// Points beyond this index on either side are reported unreached
    #[serde(default = "default_max_points")]
    pub max_points: usize,
}

impl Default for HereConfig {
    fn default() -> Self {
        Self {
            service_url: None,
            matrix_service_url: None,
            api_id: None,
            api_code: None,
            max_points: DEFAULT_MAX_POINTS,
        }
    }
}

impl HereConfig {
    pub fn new(service_url: impl Into<String>) -> Self {
        Self {
            service_url: Some(service_url.into()),
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, api_id: impl Into<String>, api_code: impl Into<String>) -> Self {
        self.api_id = Some(api_id.into());
        self.api_code = Some(api_code.into());
        self
    }

    pub fn with_max_points(mut self, n: usize) -> Self {
        self.max_points = n;
        self
    }
}

#[derive(Debug, Deserialize)]
struct RouteEnvelope {
    #[serde(default)]
    response: RouteBody,
}

#[derive(Debug, Deserialize)]
struct MatrixEnvelope {
    #[serde(default)]
    response: MatrixBody,
}

#[derive(Debug, Default, Deserialize)]
struct RouteBody {
    #[serde(default)]
    route: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    summary: Option<TravelSummary>,
    #[serde(default)]
    leg: Vec<RouteLeg>,
    /// `"lat,lon"` strings
    #[serde(default)]
    shape: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TravelSummary {
    travel_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteLeg {
    travel_time: Option<i64>,
    length: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatrixBody {
    #[serde(default)]
    matrix_entry: Vec<MatrixEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatrixEntry {
    start_index: usize,
    destination_index: usize,
    summary: Option<TravelSummary>,
}

/// Backend answered by the HERE routing API.
pub struct Here {
    id: String,
    modes: Vec<StreetNetworkMode>,
    routing_url: String,
    matrix_url: String,
    credentials: Vec<(String, String)>,
    max_points: usize,
    transport: JsonTransport,
    breaker: CircuitBreaker,
}

impl Here {
    /// Build the adapter.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `service_url` (or `matrix_service_url`) is missing
    /// or not a URL.
    pub fn new(
        id: impl Into<String>,
        modes: &[StreetNetworkMode],
        config: HereConfig,
        breaker: BreakerConfig,
    ) -> Result<Self, SetupError> {
        let base = parse_service_url(config.service_url.as_deref())?;
        let matrix_base = match config.matrix_service_url.as_deref() {
            Some(url) => parse_service_url(Some(url))?,
            None => {
                let mut url = base.clone();
                let host = format!("matrix.{}", base.host_str().unwrap_or_default());
                url.set_host(Some(&host)).map_err(|e| SetupError::InvalidUrl {
                    url: host.clone(),
                    reason: e.to_string(),
                })?;
                url
            }
        };

        let credentials = [("app_id", config.api_id), ("app_code", config.api_code)]
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k.to_string(), v)))
            .collect();

        let id = id.into();
        Ok(Self {
            routing_url: endpoint(&base, "calculateroute.json"),
            matrix_url: endpoint(&matrix_base, "calculatematrix.json"),
            credentials,
            max_points: config.max_points,
            transport: JsonTransport::new(breaker.call_timeout_secs)?,
            breaker: CircuitBreaker::new(id.clone(), breaker),
            modes: modes.to_vec(),
            id,
        })
    }

    fn here_mode(&self, mode: StreetNetworkMode) -> Result<String, StreetNetworkError> {
        let name = match mode {
            StreetNetworkMode::Walking => "pedestrian",
            StreetNetworkMode::Bike => "bicycle",
            StreetNetworkMode::Car | StreetNetworkMode::CarNoPark => "car",
            _ => {
                return Err(StreetNetworkError::UnsupportedMode {
                    backend: self.id.clone(),
                    mode,
                });
            }
        };
        Ok(format!("fastest;{name};traffic:enabled"))
    }

    fn direct_path_params(
        &self,
        query: &DirectPathQuery<'_>,
    ) -> Result<Vec<(String, String)>, StreetNetworkError> {
        let mut params = self.credentials.clone();
        params.extend([
            ("waypoint0".to_string(), waypoint(query.origin)),
            ("waypoint1".to_string(), waypoint(query.destination)),
            ("routeAttributes".to_string(), "sh".to_string()),
            ("summaryAttributes".to_string(), "traveltime".to_string()),
            ("legAttributes".to_string(), "baseTime".to_string()),
            ("mode".to_string(), self.here_mode(query.mode)?),
            // HERE can only constrain the departure
            ("departure".to_string(), format_datetime(query.extremity.datetime)),
        ]);
        Ok(params)
    }

    fn matrix_params(
        &self,
        origins: &[Place],
        destinations: &[Place],
        mode: StreetNetworkMode,
    ) -> Result<Vec<(String, String)>, StreetNetworkError> {
        let mut params = self.credentials.clone();
        params.push(("summaryAttributes".to_string(), "traveltime".to_string()));
        params.push(("mode".to_string(), self.here_mode(mode)?));
        for (i, place) in origins.iter().take(self.max_points).enumerate() {
            params.push((format!("start{i}"), waypoint(place)));
        }
        for (i, place) in destinations.iter().take(self.max_points).enumerate() {
            params.push((format!("destination{i}"), waypoint(place)));
        }
        Ok(params)
    }

    fn read_route(
        &self,
        body: &RouteBody,
        query: DirectPathQuery<'_>,
    ) -> Result<DirectPathResponse, StreetNetworkError> {
        let Some(route) = body.route.first() else {
            return Ok(DirectPathResponse::no_solution(
                NoSolutionCode::NoSolution,
                "no route",
            ));
        };

        let leg = route.leg.first();
        let travel_time = leg
            .and_then(|l| l.travel_time)
            .or_else(|| route.summary.as_ref().and_then(|s| s.travel_time))
            .unwrap_or(0);

        let mut section = Section::street_network(
            query.mode,
            query.origin.clone(),
            query.destination.clone(),
            query.extremity.datetime,
            Duration::seconds(travel_time),
            leg.and_then(|l| l.length).unwrap_or(0.0),
        );
        section.coordinates = route
            .shape
            .iter()
            .map(|s| parse_shape_point(s))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| StreetNetworkError::InvalidResponse {
                backend: self.id.clone(),
                message: "invalid shape point".to_string(),
            })?;

        let mut journey =
            Journey::from_sections(vec![section]).map_err(|e| StreetNetworkError::InvalidResponse {
                backend: self.id.clone(),
                message: e.to_string(),
            })?;
        journey.anchor(query.extremity);

        Ok(DirectPathResponse::with_journeys(vec![journey]))
    }
}

#[async_trait]
impl StreetNetworkService for Here {
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
        let request = self.direct_path_params(&query)?;

        let result: Result<RouteEnvelope, CallError> = self
            .breaker
            .call(self.transport.get(&self.routing_url, &request))
            .await;

        match result {
            Ok(envelope) => self.read_route(&envelope.response, query),
            Err(CallError::Status { status, body }) => {
                debug!(
                    backend = %self.id,
                    request_id = %params.request_id,
                    status,
                    body = %body,
                    "impossible to find a path"
                );
                Ok(DirectPathResponse::no_solution(NoSolutionCode::NoSolution, body))
            }
            Err(e) => {
                warn!(backend = %self.id, request_id = %params.request_id, error = %e, "route call failed");
                Err(e.into())
            }
        }
    }

    async fn routing_matrix(
        &self,
        origins: &[Place],
        destinations: &[Place],
        mode: StreetNetworkMode,
        _max_duration: Duration,
        params: &RoutingParams,
    ) -> Result<Vec<RoutingMatrixRow>, StreetNetworkError> {
        check_matrix_cardinality(origins, destinations)?;
        if origins.is_empty() || destinations.is_empty() {
            return Ok(Vec::new());
        }

        let request = self.matrix_params(origins, destinations, mode)?;
        let envelope: MatrixEnvelope = self
            .breaker
            .call(self.transport.get(&self.matrix_url, &request))
            .await
            .inspect_err(|e| {
                warn!(backend = %self.id, request_id = %params.request_id, error = %e, "matrix call failed");
            })?;

        Ok(read_matrix(&envelope.response, origins.len(), destinations.len()))
    }

    fn status(&self) -> BackendStatus {
        BackendStatus::new(&self.id, "Here", &self.modes).with_breaker(
            self.breaker.config().call_timeout_secs,
            self.breaker.status(),
        )
    }

    fn make_path_key(
        &self,
        mode: StreetNetworkMode,
        origin_uri: &str,
        destination_uri: &str,
        path_type: StreetNetworkPathType,
        period_extremity: PeriodExtremity,
    ) -> StreetNetworkPathKey {
        StreetNetworkPathKey::new(
            mode,
            origin_uri,
            destination_uri,
            path_type,
            Some(period_extremity),
        )
    }
}

fn waypoint(place: &Place) -> String {
    let coord = place.coord();
    format!("geo!{},{}", coord.lat(), coord.lon())
}

fn format_datetime(datetime: DateTime<Utc>) -> String {
    datetime.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn parse_shape_point(point: &str) -> Option<Coord> {
    let (lat, lon) = point.split_once(',')?;
    Coord::new(lon.trim().parse().ok()?, lat.trim().parse().ok()?).ok()
}

/// Flatten entries along the multi-valued side; missing entries (including
/// those beyond `max_points`) are unreached.
fn read_matrix(body: &MatrixBody, origins: usize, destinations: usize) -> Vec<RoutingMatrixRow> {
    let entry = |i: usize, j: usize| {
        body.matrix_entry
            .iter()
            .find(|e| e.start_index == i && e.destination_index == j)
            .and_then(|e| e.summary.as_ref())
            .and_then(|s| s.travel_time)
            .map(|t| RoutingMatrixRow::reached(Duration::seconds(t)))
            .unwrap_or_else(RoutingMatrixRow::unreached)
    };

    if origins > 1 {
        (0..origins).map(|i| entry(i, 0)).collect()
    } else {
        (0..destinations).map(|j| entry(0, j)).collect()
    }
}
