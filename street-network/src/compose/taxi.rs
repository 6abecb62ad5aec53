//! Taxi: a car path with a waiting section.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tracing::debug;

use crate::domain::{
    Journey, Place, RoutingMatrixRow, Section, SectionType, StreetNetworkMode,
    StreetNetworkPathType,
};
use crate::network::{
    BackendStatus, DirectPathQuery, DirectPathResponse, RoutingParams, StreetNetworkError,
    StreetNetworkService,
};

use super::{driven_as, is_car};

/// Wraps a car-like backend and reports its answers as taxi.
///
/// The delegate drives at the taxi speed. On fallbacks a waiting section
/// (the dwell time) is added at the public transport side of the taxi leg:
///
/// ```text
/// beginning fallback:  [taxi][wait] -> PT
/// ending fallback:     PT -> [wait][taxi]
/// ```
pub struct Taxi {
    id: String,
    modes: Vec<StreetNetworkMode>,
    delegate: Arc<dyn StreetNetworkService>,
}

impl Taxi {
    pub fn new(
        id: impl Into<String>,
        modes: &[StreetNetworkMode],
        delegate: Arc<dyn StreetNetworkService>,
    ) -> Self {
        Self {
            id: id.into(),
            modes: modes.to_vec(),
            delegate,
        }
    }
}

/// Dwell time of a fallback taxi leg.
fn dwell(path_type: StreetNetworkPathType, params: &RoutingParams) -> Duration {
    match path_type {
        StreetNetworkPathType::Direct => Duration::zero(),
        StreetNetworkPathType::BeginningFallback => params.taxi_dwell_after_first_section(),
        StreetNetworkPathType::EndingFallback => params.taxi_dwell_before_last_section(),
    }
}

/// Add the waiting section to a taxi journey.
///
/// Before the public transport the wait follows the taxi leg at `place`;
/// after it the wait precedes the taxi leg, which is pushed back by `dwell`.
fn add_waiting(journey: &mut Journey, path_type: StreetNetworkPathType, place: &Place, dwell: Duration) {
    let waiting = match path_type {
        StreetNetworkPathType::Direct => return,
        StreetNetworkPathType::BeginningFallback => {
            let Some(last) = journey.sections.last_mut() else {
                return;
            };
            last.destination = place.clone();
            Section::stationary(SectionType::Waiting, place.clone(), last.end_date_time, dwell)
        }
        StreetNetworkPathType::EndingFallback => {
            let Some(first) = journey.sections.first_mut() else {
                return;
            };
            first.origin = place.clone();
            let begin = first.begin_date_time;
            for section in &mut journey.sections {
                section.shift(dwell);
            }
            Section::stationary(SectionType::Waiting, place.clone(), begin, dwell)
        }
    };

    journey.sections.push(waiting);
    journey.sort_sections();
    journey.renumber_sections();
    journey.recompute_totals();
}

#[async_trait]
impl StreetNetworkService for Taxi {
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
        let dwell = dwell(query.path_type, params);
        let with_wait = query.path_type.is_fallback() && dwell > Duration::zero();

        // An arrival anchor must still hold once the wait is added
        let extremity = if with_wait && !query.extremity.represents_start {
            query.extremity.shifted(-dwell)
        } else {
            query.extremity
        };

        let car_query = DirectPathQuery {
            mode: StreetNetworkMode::Car,
            extremity,
            ..query
        };
        let mut response = self
            .delegate
            .direct_path(car_query, &driven_as(params, StreetNetworkMode::Taxi))
            .await?;

        // The wait happens where the taxi meets the public transport
        let meeting_point = match query.path_type {
            StreetNetworkPathType::EndingFallback => query.origin,
            _ => query.destination,
        };

        for journey in &mut response.journeys {
            journey.reclassify_mode(is_car, StreetNetworkMode::Taxi);
            if with_wait {
                add_waiting(journey, query.path_type, meeting_point, dwell);
            }
        }

        debug!(
            backend = %self.id,
            request_id = %params.request_id,
            path_type = %query.path_type,
            journeys = response.journeys.len(),
            "taxi direct path"
        );
        Ok(response)
    }

    async fn routing_matrix(
        &self,
        origins: &[Place],
        destinations: &[Place],
        _mode: StreetNetworkMode,
        max_duration: Duration,
        params: &RoutingParams,
    ) -> Result<Vec<RoutingMatrixRow>, StreetNetworkError> {
        let mut rows = self
            .delegate
            .routing_matrix(
                origins,
                destinations,
                StreetNetworkMode::Car,
                max_duration,
                &driven_as(params, StreetNetworkMode::Taxi),
            )
            .await?;

        // One origin: the taxi leads to the public transport
        let dwell = if origins.len() == 1 {
            params.taxi_dwell_after_first_section()
        } else {
            params.taxi_dwell_before_last_section()
        };
        for row in &mut rows {
            row.add_duration(dwell);
        }
        Ok(rows)
    }

    fn status(&self) -> BackendStatus {
        BackendStatus::new(&self.id, "Taxi", &self.modes).with_delegate(self.delegate.status())
    }
}
