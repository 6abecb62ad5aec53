//! Engine RPC DTOs.
//!
//! The engine's street-network sub-service speaks JSON: one request type
//! tagged with the API kind, one response type that carries journeys, a
//! matrix, nearby places or a typed error. Fields the engine may omit are
//! `Option` or `#[serde(default)]`.

use serde::{Deserialize, Serialize};

/// Which engine API a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestedApi {
    DirectPath,
    StreetNetworkRoutingMatrix,
    PlacesNearby,
}

/// Envelope of every engine request.
#[derive(Debug, Clone, Serialize)]
pub struct EngineRequest {
    pub requested_api: RequestedApi,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_path: Option<DirectPathRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sn_routing_matrix: Option<RoutingMatrixRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub places_nearby: Option<PlacesNearbyRequest>,
}

/// A place reference: a URI the engine can resolve (a `lon;lat` coord here).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineLocation {
    pub place: String,
    pub access_duration: i64,
}

/// Per-request street-network settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreetNetworkParams {
    pub origin_mode: String,
    pub destination_mode: String,
    pub walking_speed: f64,
    pub bike_speed: f64,
    pub bss_speed: f64,
    pub car_speed: f64,
    pub car_no_park_speed: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectPathRequest {
    pub origin: EngineLocation,
    pub destination: EngineLocation,
    /// Unix timestamp of the extremity
    pub datetime: i64,
    /// True when `datetime` is a departure
    pub clockwise: bool,
    pub streetnetwork_params: StreetNetworkParams,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoutingMatrixRequest {
    pub origins: Vec<EngineLocation>,
    pub destinations: Vec<EngineLocation>,
    pub mode: String,
    /// Seconds
    pub max_duration: i64,
    pub speed: f64,
    pub streetnetwork_params: StreetNetworkParams,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacesNearbyRequest {
    pub uri: String,
    /// Search radius in meters
    pub distance: f64,
    pub count: usize,
    pub types: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub filter: String,
}

/// Envelope of every engine response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineResponse {
    #[serde(default)]
    pub journeys: Vec<EngineJourney>,
    pub error: Option<EngineError>,
    pub sn_routing_matrix: Option<EngineMatrix>,
    #[serde(default)]
    pub places_nearby: Vec<EnginePlace>,
}

/// Typed error returned by the engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineError {
    pub id: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineJourney {
    pub duration: i64,
    pub departure_date_time: i64,
    pub arrival_date_time: i64,
    #[serde(default)]
    pub sections: Vec<EngineSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// `street_network`, `bss_rent`, `bss_put_back`, `park`, ...
    #[serde(rename = "type")]
    pub section_type: String,
    pub origin: EnginePlace,
    pub destination: EnginePlace,
    pub begin_date_time: i64,
    pub end_date_time: i64,
    pub duration: i64,
    #[serde(default)]
    pub length: f64,
    pub street_network: Option<EngineStreetNetwork>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineStreetNetwork {
    pub mode: String,
    #[serde(default)]
    pub coordinates: Vec<EngineCoord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnginePlace {
    pub uri: String,
    #[serde(default)]
    pub name: String,
    /// `stop_point`, `stop_area`, `address`, `poi`, ...
    pub embedded_type: Option<String>,
    pub coord: EngineCoord,
    pub poi_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct EngineCoord {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineMatrix {
    #[serde(default)]
    pub rows: Vec<EngineMatrixRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineMatrixRow {
    #[serde(default)]
    pub routing_response: Vec<EngineRoutingResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineRoutingResponse {
    pub duration: i64,
    /// `reached`, `unreached` or `unknown`
    pub routing_status: String,
}
