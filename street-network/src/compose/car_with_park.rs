//! Park-and-ride: drive to a car park near the destination, park, walk.
//!
//! No single backend answers this in one call, so the journey is assembled
//! from four requests:
//!
//! 1. car parks around the destination (nearest-feature query)
//! 2. walking matrix from every car park to the destination
//! 3. car direct path from the origin to the closest car park on foot
//! 4. walking direct path from that car park to the destination
//!
//! The legs are spliced with a PARK section in between. If any step fails
//! the answer is a "no solution" response; a partial journey is never
//! returned.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::domain::{
    Journey, PeriodExtremity, Place, PlaceKind, RoutingMatrixRow, Section, SectionType,
    StreetNetworkMode, StreetNetworkPathType, fastest_reached,
};
use crate::network::{
    BackendStatus, DirectPathQuery, DirectPathResponse, NearbyPlaces, NearbyQuery,
    NoSolutionCode, RoutingParams, StreetNetworkError, StreetNetworkService,
};

const DEFAULT_PARK_DURATION_SECS: i64 = 5 * 60;
const DEFAULT_WALKING_MAX_DURATION_SECS: i64 = 15 * 60;
const DEFAULT_MAX_CANDIDATES: usize = 20;
const DEFAULT_POI_TYPE: &str = "poi_type:amenity:parking";

/// Tuning of the park-and-ride composition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CarWithParkConfig {
    /// Time to park the car
    pub park_duration_secs: i64,
    /// Longest walk from a car park to the destination
    pub walking_max_duration_secs: i64,
    /// Car parks considered around the destination
    pub max_candidates: usize,
    /// POI type of car parks
    pub poi_type: String,
}

impl CarWithParkConfig {
    pub fn with_park_duration(mut self, secs: i64) -> Self {
        self.park_duration_secs = secs;
        self
    }

    pub fn with_walking_max_duration(mut self, secs: i64) -> Self {
        self.walking_max_duration_secs = secs;
        self
    }

    pub fn with_max_candidates(mut self, count: usize) -> Self {
        self.max_candidates = count;
        self
    }

    pub fn park_duration(&self) -> Duration {
        Duration::seconds(self.park_duration_secs)
    }

    pub fn walking_max_duration(&self) -> Duration {
        Duration::seconds(self.walking_max_duration_secs)
    }
}

impl Default for CarWithParkConfig {
    fn default() -> Self {
        Self {
            park_duration_secs: DEFAULT_PARK_DURATION_SECS,
            walking_max_duration_secs: DEFAULT_WALKING_MAX_DURATION_SECS,
            max_candidates: DEFAULT_MAX_CANDIDATES,
            poi_type: DEFAULT_POI_TYPE.to_string(),
        }
    }
}

/// Car journeys ending with a parked car and a walk.
pub struct CarWithPark {
    id: String,
    modes: Vec<StreetNetworkMode>,
    car: Arc<dyn StreetNetworkService>,
    walking: Arc<dyn StreetNetworkService>,
    parkings: Arc<dyn NearbyPlaces>,
    config: CarWithParkConfig,
}

impl CarWithPark {
    pub fn new(
        id: impl Into<String>,
        modes: &[StreetNetworkMode],
        car: Arc<dyn StreetNetworkService>,
        walking: Arc<dyn StreetNetworkService>,
        parkings: Arc<dyn NearbyPlaces>,
        config: CarWithParkConfig,
    ) -> Self {
        Self {
            id: id.into(),
            modes: modes.to_vec(),
            car,
            walking,
            parkings,
            config,
        }
    }

    pub fn config(&self) -> &CarWithParkConfig {
        &self.config
    }

    /// A failed step ends the composition with `code`, unless the failure
    /// is a caller defect.
    fn give_up(
        &self,
        params: &RoutingParams,
        step: &str,
        code: NoSolutionCode,
        err: StreetNetworkError,
    ) -> Result<DirectPathResponse, StreetNetworkError> {
        if !err.is_recoverable() {
            return Err(err);
        }
        warn!(
            backend = %self.id,
            request_id = %params.request_id,
            step,
            error = %err,
            "park-and-ride step failed"
        );
        Ok(DirectPathResponse::no_solution(code, format!("{step}: {err}")))
    }

    fn nothing(
        &self,
        params: &RoutingParams,
        code: NoSolutionCode,
        message: &str,
    ) -> DirectPathResponse {
        info!(
            backend = %self.id,
            request_id = %params.request_id,
            %code,
            "{}",
            message
        );
        DirectPathResponse::no_solution(code, message)
    }
}

#[async_trait]
impl StreetNetworkService for CarWithPark {
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
        let nearby = NearbyQuery {
            origin: query.destination,
            mode: StreetNetworkMode::Walking,
            max_duration: self.config.walking_max_duration(),
            max_count: self.config.max_candidates,
            object_types: vec![PlaceKind::Poi],
            poi_type: Some(self.config.poi_type.clone()),
            forbidden_uris: Vec::new(),
            allowed_ids: Vec::new(),
        };
        let candidates = match self.parkings.places_nearby(&nearby, params).await {
            Ok(candidates) => candidates,
            Err(e) => return self.give_up(params, "car parks", NoSolutionCode::NoDestination, e),
        };
        if candidates.is_empty() {
            return Ok(self.nothing(
                params,
                NoSolutionCode::NoDestination,
                "no car park near the destination",
            ));
        }

        let rows = match self
            .walking
            .routing_matrix(
                &candidates,
                std::slice::from_ref(query.destination),
                StreetNetworkMode::Walking,
                self.config.walking_max_duration(),
                params,
            )
            .await
        {
            Ok(rows) => rows,
            Err(e) => return self.give_up(params, "walking matrix", NoSolutionCode::NoSolution, e),
        };
        let Some((parking, walk)) = fastest_reached(&rows)
            .and_then(|(index, walk)| candidates.get(index).map(|p| (p, walk)))
        else {
            return Ok(self.nothing(
                params,
                NoSolutionCode::NoSolution,
                "no car park within walking distance of the destination",
            ));
        };
        debug!(
            backend = %self.id,
            request_id = %params.request_id,
            parking = parking.uri(),
            walk_secs = walk.num_seconds(),
            candidates = candidates.len(),
            "car park chosen"
        );

        let park = self.config.park_duration();
        let car_extremity = match query.path_type {
            StreetNetworkPathType::EndingFallback => query.extremity.shifted(-(walk + park)),
            _ => query.extremity,
        };
        let car = match self
            .car
            .direct_path(
                DirectPathQuery::new(
                    StreetNetworkMode::Car,
                    query.origin,
                    parking,
                    car_extremity,
                    query.path_type,
                ),
                params,
            )
            .await
        {
            Ok(response) => response,
            Err(e) => return self.give_up(params, "car leg", NoSolutionCode::NoSolution, e),
        };
        let Some(car_journey) = car.into_first() else {
            return Ok(self.nothing(
                params,
                NoSolutionCode::NoSolution,
                "no car path to the car park",
            ));
        };
        let parked_at = car_journey.arrival_date_time;

        let walking = match self
            .walking
            .direct_path(
                DirectPathQuery::new(
                    StreetNetworkMode::Walking,
                    parking,
                    query.destination,
                    PeriodExtremity::departure(parked_at + park),
                    query.path_type,
                ),
                params,
            )
            .await
        {
            Ok(response) => response,
            Err(e) => return self.give_up(params, "walking leg", NoSolutionCode::NoSolution, e),
        };
        let Some(walk_journey) = walking.into_first() else {
            return Ok(self.nothing(
                params,
                NoSolutionCode::NoSolution,
                "no walking path from the car park",
            ));
        };

        let journey = splice(car_journey, walk_journey, parking, park, query.extremity)
            .map_err(|e| StreetNetworkError::Technical(e.to_string()))?;
        Ok(DirectPathResponse::with_journeys(vec![journey]))
    }

    async fn routing_matrix(
        &self,
        origins: &[Place],
        destinations: &[Place],
        mode: StreetNetworkMode,
        max_duration: Duration,
        params: &RoutingParams,
    ) -> Result<Vec<RoutingMatrixRow>, StreetNetworkError> {
        self.car
            .routing_matrix(origins, destinations, mode, max_duration, params)
            .await
    }

    fn status(&self) -> BackendStatus {
        BackendStatus::new(&self.id, "CarWithPark", &self.modes)
            .with_delegate(self.car.status())
            .with_delegate(self.walking.status())
    }
}

/// Join the car and walking legs at `parking` and lay the result on the
/// caller's anchor.
fn splice(
    mut car: Journey,
    walk: Journey,
    parking: &Place,
    park: Duration,
    extremity: PeriodExtremity,
) -> Result<Journey, crate::domain::DomainError> {
    if let Some(last) = car.sections.last_mut() {
        last.destination = parking.clone();
    }
    let mut walk_sections = walk.sections;
    if let Some(first) = walk_sections.first_mut() {
        first.origin = parking.clone();
    }

    let mut sections = car.sections;
    sections.push(Section::stationary(
        SectionType::Park,
        parking.clone(),
        car.arrival_date_time,
        park,
    ));
    sections.extend(walk_sections);

    let mut journey = Journey::from_sections(sections)?;
    journey.anchor(extremity);
    Ok(journey)
}

#[cfg(test)]
#[path = "car_with_park_tests.rs"]
mod tests;
