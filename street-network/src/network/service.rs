//! The contract every street-network backend implements.

use async_trait::async_trait;
use chrono::Duration;

use crate::domain::{
    PeriodExtremity, Place, PlaceKind, RoutingMatrixRow, StreetNetworkMode, StreetNetworkPathType,
};

use super::error::StreetNetworkError;
use super::key::StreetNetworkPathKey;
use super::params::RoutingParams;
use super::response::DirectPathResponse;
use super::status::BackendStatus;

/// A direct path query.
#[derive(Debug, Clone, Copy)]
pub struct DirectPathQuery<'a> {
    pub mode: StreetNetworkMode,
    pub origin: &'a Place,
    pub destination: &'a Place,
    pub extremity: PeriodExtremity,
    pub path_type: StreetNetworkPathType,
}

impl<'a> DirectPathQuery<'a> {
    pub fn new(
        mode: StreetNetworkMode,
        origin: &'a Place,
        destination: &'a Place,
        extremity: PeriodExtremity,
        path_type: StreetNetworkPathType,
    ) -> Self {
        Self {
            mode,
            origin,
            destination,
            extremity,
            path_type,
        }
    }
}

/// A street-network routing backend.
///
/// Implementations are shared between concurrent requests and must not
/// hold per-request state. Decorators hold their delegate(s) and forward
/// whatever they do not override.
#[async_trait]
pub trait StreetNetworkService: Send + Sync {
    /// Backend id, unique within a deployment.
    fn id(&self) -> &str;

    /// Modes this instance is configured to answer.
    fn modes(&self) -> &[StreetNetworkMode];

    /// Compute a point-to-point path anchored on `query.extremity`.
    async fn direct_path(
        &self,
        query: DirectPathQuery<'_>,
        params: &RoutingParams,
    ) -> Result<DirectPathResponse, StreetNetworkError>;

    /// Durations from one origin to many destinations, or many origins to
    /// one destination. Entries follow the order of the multi-valued side.
    async fn routing_matrix(
        &self,
        origins: &[Place],
        destinations: &[Place],
        mode: StreetNetworkMode,
        max_duration: Duration,
        params: &RoutingParams,
    ) -> Result<Vec<RoutingMatrixRow>, StreetNetworkError>;

    /// Diagnostics, without network I/O.
    fn status(&self) -> BackendStatus;

    /// Memoization key of a direct path. The default ignores the extremity.
    fn make_path_key(
        &self,
        mode: StreetNetworkMode,
        origin_uri: &str,
        destination_uri: &str,
        path_type: StreetNetworkPathType,
        _period_extremity: PeriodExtremity,
    ) -> StreetNetworkPathKey {
        StreetNetworkPathKey::new(mode, origin_uri, destination_uri, path_type, None)
    }
}

/// Reject matrices that are multi-valued on both sides.
pub fn check_matrix_cardinality(
    origins: &[Place],
    destinations: &[Place],
) -> Result<(), StreetNetworkError> {
    if origins.len() > 1 && destinations.len() > 1 {
        return Err(StreetNetworkError::CardinalityViolation {
            origins: origins.len(),
            destinations: destinations.len(),
        });
    }
    Ok(())
}

/// A nearest-feature query around a place.
#[derive(Debug, Clone)]
pub struct NearbyQuery<'a> {
    pub origin: &'a Place,
    pub mode: StreetNetworkMode,
    /// Search bound expressed as travel time in `mode`
    pub max_duration: Duration,
    pub max_count: usize,
    pub object_types: Vec<PlaceKind>,
    /// Keep only POIs of this type
    pub poi_type: Option<String>,
    pub forbidden_uris: Vec<String>,
    pub allowed_ids: Vec<String>,
}

impl NearbyQuery<'_> {
    /// Whether a returned place satisfies the filters of this query.
    pub fn accepts(&self, place: &Place) -> bool {
        if !self.object_types.is_empty() && !self.object_types.contains(&place.kind()) {
            return false;
        }
        if let Some(poi_type) = &self.poi_type
            && place.poi_type() != Some(poi_type.as_str())
        {
            return false;
        }
        if self.forbidden_uris.iter().any(|u| u == place.uri()) {
            return false;
        }
        self.allowed_ids.is_empty() || self.allowed_ids.iter().any(|u| u == place.uri())
    }
}

/// Source of candidate places around a point (e.g. park-and-ride).
#[async_trait]
pub trait NearbyPlaces: Send + Sync {
    async fn places_nearby(
        &self,
        query: &NearbyQuery<'_>,
        params: &RoutingParams,
    ) -> Result<Vec<Place>, StreetNetworkError>;
}
