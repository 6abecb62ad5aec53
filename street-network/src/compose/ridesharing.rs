//! Ridesharing: a car path driven by someone else.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;

use crate::domain::{Place, RoutingMatrixRow, StreetNetworkMode};
use crate::network::{
    BackendStatus, DirectPathQuery, DirectPathResponse, RoutingParams, StreetNetworkError,
    StreetNetworkService,
};

use super::{driven_as, is_car};

/// Wraps a car-like backend, driving at the ridesharing speed and reporting
/// car sections as ridesharing.
pub struct Ridesharing {
    id: String,
    modes: Vec<StreetNetworkMode>,
    delegate: Arc<dyn StreetNetworkService>,
}

impl Ridesharing {
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

#[async_trait]
impl StreetNetworkService for Ridesharing {
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
        let car_query = DirectPathQuery {
            mode: StreetNetworkMode::Car,
            ..query
        };
        let mut response = self
            .delegate
            .direct_path(car_query, &driven_as(params, StreetNetworkMode::Ridesharing))
            .await?;

        for journey in &mut response.journeys {
            journey.reclassify_mode(is_car, StreetNetworkMode::Ridesharing);
        }
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
        self.delegate
            .routing_matrix(
                origins,
                destinations,
                StreetNetworkMode::Car,
                max_duration,
                &driven_as(params, StreetNetworkMode::Ridesharing),
            )
            .await
    }

    fn status(&self) -> BackendStatus {
        BackendStatus::new(&self.id, "Ridesharing", &self.modes)
            .with_delegate(self.delegate.status())
    }
}
