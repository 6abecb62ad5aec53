//! Street-network backend answered by the public transport engine.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tracing::{debug, warn};

use crate::breaker::{BreakerConfig, CircuitBreaker};
use crate::domain::{
    Journey, Place, PlaceKind, RoutingMatrixRow, SectionType, StreetNetworkMode,
    StreetNetworkPathType,
};
use crate::network::{
    BackendStatus, DirectPathQuery, DirectPathResponse, NearbyPlaces, NearbyQuery, NoSolutionCode,
    RoutingParams, StreetNetworkError, StreetNetworkService, check_matrix_cardinality,
};

use super::client::EngineRpc;
use super::convert::{convert_journey, convert_matrix, convert_place};
use super::types::{
    DirectPathRequest, EngineError, EngineLocation, EngineRequest, EngineResponse,
    PlacesNearbyRequest, RequestedApi, RoutingMatrixRequest, StreetNetworkParams,
};

/// Adapter to the engine's street-network sub-service.
///
/// On top of the raw RPC it:
/// - skips direct paths whose crow-fly estimate exceeds the request bounds
/// - computes ending-fallback car paths backwards (the engine only drives
///   forward from a fixed start) and turns the result around
/// - normalizes the leading mode of bike-share answers
/// - turns n×1 matrices into the 1×n the engine accepts
pub struct Kraken {
    id: String,
    modes: Vec<StreetNetworkMode>,
    engine: Arc<dyn EngineRpc>,
    breaker: CircuitBreaker,
}

impl Kraken {
    pub fn new(
        id: impl Into<String>,
        modes: &[StreetNetworkMode],
        engine: Arc<dyn EngineRpc>,
        breaker: BreakerConfig,
    ) -> Self {
        let id = id.into();
        Self {
            breaker: CircuitBreaker::new(id.clone(), breaker),
            id,
            modes: modes.to_vec(),
            engine,
        }
    }

    async fn call(&self, request: EngineRequest) -> Result<EngineResponse, StreetNetworkError> {
        let response = self.breaker.call(self.engine.send(&request)).await;
        if let Err(e) = &response {
            warn!(
                backend = %self.id,
                request_id = %request.request_id,
                error = %e,
                "engine call failed"
            );
        }
        Ok(response?)
    }

    fn invalid_response(&self, message: impl Into<String>) -> StreetNetworkError {
        StreetNetworkError::InvalidResponse {
            backend: self.id.clone(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl StreetNetworkService for Kraken {
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
        if query.path_type == StreetNetworkPathType::Direct
            && exceeds_direct_path_bounds(query.mode, query.origin, query.destination, params)
        {
            debug!(
                backend = %self.id,
                request_id = %params.request_id,
                mode = %query.mode,
                distance = query.origin.distance_to(query.destination),
                "direct path beyond crow-fly bounds, skipping"
            );
            return Ok(DirectPathResponse::empty());
        }

        let invert = query.mode == StreetNetworkMode::Car
            && query.path_type == StreetNetworkPathType::EndingFallback;
        let (from, to) = if invert {
            (query.destination, query.origin)
        } else {
            (query.origin, query.destination)
        };

        let request = EngineRequest {
            requested_api: RequestedApi::DirectPath,
            request_id: params.request_id.clone(),
            direct_path: Some(DirectPathRequest {
                origin: location(from),
                destination: location(to),
                datetime: query.extremity.datetime.timestamp(),
                clockwise: query.extremity.represents_start,
                streetnetwork_params: street_network_params(query.mode, params),
            }),
            sn_routing_matrix: None,
            places_nearby: None,
        };

        let response = self.call(request).await?;
        if let Some(error) = &response.error {
            return no_solution_or_error(&self.id, error);
        }

        let mut journeys = Vec::with_capacity(response.journeys.len());
        for engine_journey in &response.journeys {
            let mut journey =
                convert_journey(engine_journey).map_err(|e| self.invalid_response(e.to_string()))?;
            if query.mode == StreetNetworkMode::Bss {
                normalize_bss_mode(&mut journey);
            }
            if invert {
                journey.reverse_direction(query.extremity);
            }
            journeys.push(journey);
        }

        Ok(DirectPathResponse::with_journeys(journeys))
    }

    /// Durations from one origin to n destinations, or n origins to one
    /// destination.
    ///
    /// The engine only answers 1×n: an n×1 query is sent with both sides
    /// swapped. The entries stay aligned with the multi-valued side, but
    /// they are durations of the swapped trips (destination to each origin)
    /// and are not re-oriented.
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

        let (sources, targets) = if origins.len() > 1 {
            debug!(
                backend = %self.id,
                request_id = %params.request_id,
                origins = origins.len(),
                "swapping n×1 routing matrix to 1×n"
            );
            (destinations, origins)
        } else {
            (origins, destinations)
        };

        let request = EngineRequest {
            requested_api: RequestedApi::StreetNetworkRoutingMatrix,
            request_id: params.request_id.clone(),
            direct_path: None,
            sn_routing_matrix: Some(RoutingMatrixRequest {
                origins: sources.iter().map(location).collect(),
                destinations: targets.iter().map(location).collect(),
                mode: mode.as_str().to_string(),
                max_duration: max_duration.num_seconds(),
                speed: params.speed(mode),
                streetnetwork_params: street_network_params(mode, params),
            }),
            places_nearby: None,
        };

        let response = self.call(request).await?;
        if let Some(error) = &response.error {
            return Err(StreetNetworkError::Technical(format!(
                "{}: {} ({})",
                self.id, error.id, error.message
            )));
        }

        let matrix = response
            .sn_routing_matrix
            .ok_or_else(|| self.invalid_response("missing routing matrix"))?;
        let rows = convert_matrix(&matrix);
        if rows.len() != targets.len() {
            return Err(self.invalid_response(format!(
                "expected {} matrix entries, got {}",
                targets.len(),
                rows.len()
            )));
        }
        Ok(rows)
    }

    fn status(&self) -> BackendStatus {
        BackendStatus::new(&self.id, "Kraken", &self.modes).with_breaker(
            self.breaker.config().call_timeout_secs,
            self.breaker.status(),
        )
    }
}

#[async_trait]
impl NearbyPlaces for Kraken {
    async fn places_nearby(
        &self,
        query: &NearbyQuery<'_>,
        params: &RoutingParams,
    ) -> Result<Vec<Place>, StreetNetworkError> {
        let distance = query.max_duration.num_seconds() as f64 * params.speed(query.mode);
        let filter = query
            .poi_type
            .as_ref()
            .map(|t| format!("poi_type.uri=\"{t}\""))
            .unwrap_or_default();

        let request = EngineRequest {
            requested_api: RequestedApi::PlacesNearby,
            request_id: params.request_id.clone(),
            direct_path: None,
            sn_routing_matrix: None,
            places_nearby: Some(PlacesNearbyRequest {
                uri: query.origin.coord().to_string(),
                distance,
                count: query.max_count,
                types: query.object_types.iter().map(|k| place_kind_name(*k).to_string()).collect(),
                filter,
            }),
        };

        let response = self.call(request).await?;
        if let Some(error) = &response.error {
            return Err(StreetNetworkError::Technical(format!(
                "{}: {} ({})",
                self.id, error.id, error.message
            )));
        }

        let mut places = Vec::with_capacity(response.places_nearby.len());
        for place in &response.places_nearby {
            let place = convert_place(place).map_err(|e| self.invalid_response(e.to_string()))?;
            if query.accepts(&place) {
                places.push(place);
            }
        }
        places.truncate(query.max_count);
        Ok(places)
    }
}

/// Whether the crow-fly estimate of a direct path exceeds the request bounds.
pub(crate) fn exceeds_direct_path_bounds(
    mode: StreetNetworkMode,
    origin: &Place,
    destination: &Place,
    params: &RoutingParams,
) -> bool {
    let distance = origin.distance_to(destination);
    if distance > params.max_direct_path_distance.get(mode) {
        return true;
    }
    let max_duration = params.max_direct_path_duration_secs.get(mode) as f64;
    distance > max_duration * params.speed(mode)
}

/// The leading section of a bike-share answer is a bike-share leg only when
/// a rent precedes a put-back; otherwise the whole answer is a walk.
fn normalize_bss_mode(journey: &mut Journey) {
    let rent = journey
        .sections
        .iter()
        .position(|s| s.section_type == SectionType::BssRent);
    let put_back = journey
        .sections
        .iter()
        .rposition(|s| s.section_type == SectionType::BssPutBack);
    let rides = matches!((rent, put_back), (Some(r), Some(p)) if r < p);

    if let Some(first) = journey.sections.first_mut()
        && first.mode.is_some()
    {
        first.mode = Some(if rides {
            StreetNetworkMode::Bss
        } else {
            StreetNetworkMode::Walking
        });
    }
    journey.recompute_totals();
}

fn no_solution_or_error(
    backend: &str,
    error: &EngineError,
) -> Result<DirectPathResponse, StreetNetworkError> {
    let code = match error.id.as_str() {
        "no_solution" => NoSolutionCode::NoSolution,
        "no_origin" | "no_origin_nor_destination" => NoSolutionCode::NoOrigin,
        "no_destination" => NoSolutionCode::NoDestination,
        _ => {
            return Err(StreetNetworkError::Technical(format!(
                "{backend}: {} ({})",
                error.id, error.message
            )));
        }
    };
    debug!(backend, code = %code, message = %error.message, "engine found no direct path");
    Ok(DirectPathResponse::no_solution(code, &error.message))
}

fn location(place: &Place) -> EngineLocation {
    EngineLocation {
        place: place.coord().to_string(),
        access_duration: 0,
    }
}

fn street_network_params(mode: StreetNetworkMode, params: &RoutingParams) -> StreetNetworkParams {
    StreetNetworkParams {
        origin_mode: mode.as_str().to_string(),
        destination_mode: mode.as_str().to_string(),
        walking_speed: params.speed(StreetNetworkMode::Walking),
        bike_speed: params.speed(StreetNetworkMode::Bike),
        bss_speed: params.speed(StreetNetworkMode::Bss),
        car_speed: params.speed(StreetNetworkMode::Car),
        car_no_park_speed: params.speed(StreetNetworkMode::CarNoPark),
    }
}

fn place_kind_name(kind: PlaceKind) -> &'static str {
    match kind {
        PlaceKind::StopPoint => "stop_point",
        PlaceKind::StopArea => "stop_area",
        PlaceKind::Address => "address",
        PlaceKind::Poi => "poi",
        PlaceKind::Coord => "coord",
    }
}

#[cfg(test)]
#[path = "adapter_tests.rs"]
mod tests;
