//! Journey endpoints and WGS84 coordinates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Earth radius used for crow-fly distances, in meters.
const EARTH_RADIUS_METERS: f64 = 6_372_797.560856;

/// Error returned when a coordinate is outside the WGS84 range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid coordinate ({lon}, {lat}): {reason}")]
pub struct InvalidCoord {
    lon: f64,
    lat: f64,
    reason: &'static str,
}

/// A WGS84 coordinate.
///
/// Longitude is always within `[-180, 180]` and latitude within `[-90, 90]`;
/// this is checked at construction (including deserialization).
///
/// # Examples
///
/// ```
/// use street_network::domain::Coord;
///
/// let paris = Coord::new(2.3522, 48.8566).unwrap();
/// assert_eq!(paris.lon(), 2.3522);
///
/// assert!(Coord::new(181.0, 0.0).is_err());
/// assert!(Coord::new(0.0, -91.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoord")]
pub struct Coord {
    lon: f64,
    lat: f64,
}

#[derive(Deserialize)]
struct RawCoord {
    lon: f64,
    lat: f64,
}

impl TryFrom<RawCoord> for Coord {
    type Error = InvalidCoord;

    fn try_from(raw: RawCoord) -> Result<Self, Self::Error> {
        Coord::new(raw.lon, raw.lat)
    }
}

impl Coord {
    /// Create a coordinate, validating its range.
    pub fn new(lon: f64, lat: f64) -> Result<Self, InvalidCoord> {
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(InvalidCoord {
                lon,
                lat,
                reason: "longitude must be within [-180, 180]",
            });
        }
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(InvalidCoord {
                lon,
                lat,
                reason: "latitude must be within [-90, 90]",
            });
        }
        Ok(Self { lon, lat })
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Great-circle (crow-fly) distance to another coordinate, in meters.
    pub fn distance_to(&self, other: &Coord) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lat = lat2 - lat1;
        let d_lon = (other.lon - self.lon).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_METERS * c
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.lon, self.lat)
    }
}

/// The kind of object a [`Place`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceKind {
    StopPoint,
    StopArea,
    Address,
    Poi,
    Coord,
}

/// A journey endpoint.
///
/// Places are immutable once built and identified by their URI.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    uri: String,
    name: String,
    kind: PlaceKind,
    coord: Coord,
    poi_type: Option<String>,
}

impl Place {
    /// Create a place with an empty display name.
    pub fn new(uri: impl Into<String>, kind: PlaceKind, coord: Coord) -> Self {
        Self {
            uri: uri.into(),
            name: String::new(),
            kind,
            coord,
            poi_type: None,
        }
    }

    /// Create a raw-coordinate place whose URI is derived from the coordinate.
    pub fn from_coord(coord: Coord) -> Self {
        Self::new(format!("{}", coord), PlaceKind::Coord, coord)
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the POI type (e.g. `poi_type:amenity:parking`).
    pub fn with_poi_type(mut self, poi_type: impl Into<String>) -> Self {
        self.poi_type = Some(poi_type.into());
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PlaceKind {
        self.kind
    }

    pub fn coord(&self) -> Coord {
        self.coord
    }

    pub fn poi_type(&self) -> Option<&str> {
        self.poi_type.as_deref()
    }

    /// Crow-fly distance to another place, in meters.
    pub fn distance_to(&self, other: &Place) -> f64 {
        self.coord.distance_to(&other.coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lon: f64, lat: f64) -> Coord {
        Coord::new(lon, lat).unwrap()
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(Coord::new(180.0, 90.0).is_ok());
        assert!(Coord::new(-180.0, -90.0).is_ok());
        assert!(Coord::new(180.1, 0.0).is_err());
        assert!(Coord::new(0.0, 90.1).is_err());
        assert!(Coord::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn error_display() {
        let err = Coord::new(200.0, 0.0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid coordinate (200, 0): longitude must be within [-180, 180]"
        );
    }

    #[test]
    fn crow_fly_distance_near_equator() {
        let d = coord(0.0, 0.0).distance_to(&coord(0.01, 0.01));
        assert!((d - 1572.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn crow_fly_distance_is_symmetric() {
        let a = coord(2.35, 48.85);
        let b = coord(4.83, 45.76);
        assert!((a.distance_to(&b) - b.distance_to(&a)).abs() < 1e-6);
        assert_eq!(a.distance_to(&a), 0.0);
    }

    #[test]
    fn deserialize_validates() {
        let ok: Result<Coord, _> = serde_json::from_str(r#"{"lon": 2.0, "lat": 48.0}"#);
        assert!(ok.is_ok());

        let bad: Result<Coord, _> = serde_json::from_str(r#"{"lon": 2.0, "lat": 148.0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn place_builders() {
        let place = Place::new("poi:1", PlaceKind::Poi, coord(1.0, 2.0))
            .with_name("Parking Gare")
            .with_poi_type("poi_type:amenity:parking");
        assert_eq!(place.uri(), "poi:1");
        assert_eq!(place.name(), "Parking Gare");
        assert_eq!(place.poi_type(), Some("poi_type:amenity:parking"));

        let raw = Place::from_coord(coord(1.5, 2.5));
        assert_eq!(raw.uri(), "1.5;2.5");
        assert_eq!(raw.kind(), PlaceKind::Coord);
    }
}
