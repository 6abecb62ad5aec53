//! Scriptable backends for tests.
//!
//! `MockStreetNetwork` answers from closures (by default: a straight line
//! at the requested mode's speed) and records every call it receives, so
//! composers can be tested without a routing engine.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Duration;

use crate::domain::{
    Journey, PeriodExtremity, Place, RoutingMatrixRow, Section, StreetNetworkMode,
    StreetNetworkPathType,
};

use super::error::StreetNetworkError;
use super::params::RoutingParams;
use super::response::DirectPathResponse;
use super::service::{
    DirectPathQuery, NearbyPlaces, NearbyQuery, StreetNetworkService, check_matrix_cardinality,
};
use super::status::BackendStatus;

type DirectPathFn = dyn Fn(DirectPathQuery<'_>, &RoutingParams) -> Result<DirectPathResponse, StreetNetworkError>
    + Send
    + Sync;

type MatrixFn = dyn Fn(&[Place], &[Place], StreetNetworkMode, &RoutingParams) -> Result<Vec<RoutingMatrixRow>, StreetNetworkError>
    + Send
    + Sync;

/// A call received by a [`MockStreetNetwork`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    DirectPath {
        mode: StreetNetworkMode,
        origin: String,
        destination: String,
        extremity: PeriodExtremity,
        path_type: StreetNetworkPathType,
        /// Speed the caller asked for this mode
        speed: f64,
    },
    Matrix {
        origins: Vec<String>,
        destinations: Vec<String>,
        mode: StreetNetworkMode,
    },
}

/// One-section journey travelled in `mode`, anchored on `extremity`.
pub fn straight_line_journey(
    mode: StreetNetworkMode,
    origin: &Place,
    destination: &Place,
    duration: Duration,
    extremity: PeriodExtremity,
) -> Journey {
    let section = Section::street_network(
        mode,
        origin.clone(),
        destination.clone(),
        extremity.datetime,
        duration,
        origin.distance_to(destination),
    );
    let mut journey = Journey {
        departure_date_time: extremity.datetime,
        arrival_date_time: extremity.datetime,
        duration: Duration::zero(),
        sections: vec![section],
        durations: Default::default(),
        distances: Default::default(),
    };
    journey.anchor(extremity);
    journey.renumber_sections();
    journey
}

fn crow_fly_duration(origin: &Place, destination: &Place, speed: f64) -> Duration {
    Duration::seconds((origin.distance_to(destination) / speed).round() as i64)
}

/// Backend answering from closures and recording its calls.
pub struct MockStreetNetwork {
    id: String,
    modes: Vec<StreetNetworkMode>,
    direct: Box<DirectPathFn>,
    matrix: Box<MatrixFn>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockStreetNetwork {
    /// A backend answering straight lines at the requested speed.
    pub fn new(id: impl Into<String>, modes: &[StreetNetworkMode]) -> Self {
        Self {
            id: id.into(),
            modes: modes.to_vec(),
            direct: Box::new(|query, params| {
                let duration = crow_fly_duration(
                    query.origin,
                    query.destination,
                    params.speed(query.mode),
                );
                Ok(DirectPathResponse::with_journeys(vec![straight_line_journey(
                    query.mode,
                    query.origin,
                    query.destination,
                    duration,
                    query.extremity,
                )]))
            }),
            matrix: Box::new(|origins, destinations, mode, params| {
                check_matrix_cardinality(origins, destinations)?;
                let (Some(origin), Some(destination)) = (origins.first(), destinations.first()) else {
                    return Ok(Vec::new());
                };
                let speed = params.speed(mode);
                let rows = if origins.len() > 1 {
                    origins
                        .iter()
                        .map(|o| RoutingMatrixRow::reached(crow_fly_duration(o, destination, speed)))
                        .collect()
                } else {
                    destinations
                        .iter()
                        .map(|d| RoutingMatrixRow::reached(crow_fly_duration(origin, d, speed)))
                        .collect()
                };
                Ok(rows)
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Replace the direct path behaviour.
    pub fn with_direct_path<F>(mut self, f: F) -> Self
    where
        F: Fn(DirectPathQuery<'_>, &RoutingParams) -> Result<DirectPathResponse, StreetNetworkError>
            + Send
            + Sync
            + 'static,
    {
        self.direct = Box::new(f);
        self
    }

    /// Replace the routing matrix behaviour.
    pub fn with_matrix<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Place], &[Place], StreetNetworkMode, &RoutingParams) -> Result<Vec<RoutingMatrixRow>, StreetNetworkError>
            + Send
            + Sync
            + 'static,
    {
        self.matrix = Box::new(f);
        self
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    fn record(&self, call: RecordedCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

#[async_trait]
impl StreetNetworkService for MockStreetNetwork {
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
        self.record(RecordedCall::DirectPath {
            mode: query.mode,
            origin: query.origin.uri().to_string(),
            destination: query.destination.uri().to_string(),
            extremity: query.extremity,
            path_type: query.path_type,
            speed: params.speed(query.mode),
        });
        (self.direct)(query, params)
    }

    async fn routing_matrix(
        &self,
        origins: &[Place],
        destinations: &[Place],
        mode: StreetNetworkMode,
        _max_duration: Duration,
        params: &RoutingParams,
    ) -> Result<Vec<RoutingMatrixRow>, StreetNetworkError> {
        self.record(RecordedCall::Matrix {
            origins: origins.iter().map(|p| p.uri().to_string()).collect(),
            destinations: destinations.iter().map(|p| p.uri().to_string()).collect(),
            mode,
        });
        (self.matrix)(origins, destinations, mode, params)
    }

    fn status(&self) -> BackendStatus {
        BackendStatus::new(&self.id, "Mock", &self.modes)
    }
}

/// Nearby-place source returning a fixed candidate list, filtered by the query.
#[derive(Debug, Clone, Default)]
pub struct StaticNearbyPlaces {
    places: Vec<Place>,
}

impl StaticNearbyPlaces {
    pub fn new(places: Vec<Place>) -> Self {
        Self { places }
    }
}

#[async_trait]
impl NearbyPlaces for StaticNearbyPlaces {
    async fn places_nearby(
        &self,
        query: &NearbyQuery<'_>,
        _params: &RoutingParams,
    ) -> Result<Vec<Place>, StreetNetworkError> {
        Ok(self
            .places
            .iter()
            .filter(|p| query.accepts(p))
            .take(query.max_count)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coord, PlaceKind};
    use chrono::{TimeZone, Utc};

    fn place(uri: &str, lon: f64, lat: f64) -> Place {
        Place::new(uri, PlaceKind::Address, Coord::new(lon, lat).unwrap())
    }

    #[tokio::test]
    async fn default_direct_path_is_straight_line() {
        let mock = MockStreetNetwork::new("mock", &[StreetNetworkMode::Walking]);
        let a = place("a", 0.0, 0.0);
        let b = place("b", 0.01, 0.0);
        let t = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
        let params = RoutingParams::new("req").with_speed(StreetNetworkMode::Walking, 1.0);

        let response = mock
            .direct_path(
                DirectPathQuery::new(
                    StreetNetworkMode::Walking,
                    &a,
                    &b,
                    PeriodExtremity::arrival(t),
                    StreetNetworkPathType::Direct,
                ),
                &params,
            )
            .await
            .unwrap();

        let journey = response.first().unwrap();
        assert_eq!(journey.arrival_date_time, t);
        assert!((journey.duration.num_seconds() - 1112).abs() <= 1);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn default_matrix_follows_multi_valued_side() {
        let mock = MockStreetNetwork::new("mock", &[StreetNetworkMode::Walking]);
        let origins = vec![place("a", 0.0, 0.0), place("b", 0.02, 0.0)];
        let destination = vec![place("c", 0.01, 0.0)];

        let rows = mock
            .routing_matrix(
                &origins,
                &destination,
                StreetNetworkMode::Walking,
                Duration::hours(1),
                &RoutingParams::default(),
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert!(mock.calls().iter().any(|c| matches!(c, RecordedCall::Matrix { .. })));
    }

    #[tokio::test]
    async fn default_matrix_with_an_empty_side_is_empty() {
        let mock = MockStreetNetwork::new("mock", &[StreetNetworkMode::Walking]);
        let origin = vec![place("a", 0.0, 0.0)];

        let rows = mock
            .routing_matrix(
                &origin,
                &[],
                StreetNetworkMode::Walking,
                Duration::hours(1),
                &RoutingParams::default(),
            )
            .await
            .unwrap();

        assert!(rows.is_empty());
    }
}
