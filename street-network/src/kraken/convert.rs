//! Conversion from engine DTOs to domain types.

use chrono::{DateTime, Duration, Utc};

use crate::domain::{
    Coord, DomainError, Journey, Place, PlaceKind, RoutingMatrixRow, Section, SectionType,
    StreetNetworkMode,
};

use super::types::{EngineCoord, EngineJourney, EngineMatrix, EnginePlace, EngineSection};

/// Error during DTO to domain conversion.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    #[error("invalid coordinate: {0}")]
    InvalidCoord(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(i64),

    #[error("unknown section type: {0}")]
    UnknownSectionType(String),

    #[error("unknown mode: {0}")]
    UnknownMode(String),

    #[error(transparent)]
    Journey(#[from] DomainError),
}

/// Convert an engine place.
pub fn convert_place(place: &EnginePlace) -> Result<Place, ConversionError> {
    let kind = match place.embedded_type.as_deref() {
        Some("stop_point") => PlaceKind::StopPoint,
        Some("stop_area") => PlaceKind::StopArea,
        Some("address") => PlaceKind::Address,
        Some("poi") => PlaceKind::Poi,
        _ => PlaceKind::Coord,
    };

    let mut converted =
        Place::new(&place.uri, kind, convert_coord(place.coord)?).with_name(&place.name);
    if let Some(poi_type) = &place.poi_type {
        converted = converted.with_poi_type(poi_type);
    }
    Ok(converted)
}

/// Convert an engine journey, keeping the engine's timestamps.
///
/// Section end times are derived from begin + duration so the result is
/// always internally consistent.
pub fn convert_journey(journey: &EngineJourney) -> Result<Journey, ConversionError> {
    let sections = journey
        .sections
        .iter()
        .map(convert_section)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Journey::from_sections(sections)?)
}

/// Convert the single row of a 1×n engine matrix.
pub fn convert_matrix(matrix: &EngineMatrix) -> Vec<RoutingMatrixRow> {
    let Some(row) = matrix.rows.first() else {
        return Vec::new();
    };

    row.routing_response
        .iter()
        .map(|r| match r.routing_status.as_str() {
            "reached" => RoutingMatrixRow::reached(Duration::seconds(r.duration)),
            "unreached" => RoutingMatrixRow::unreached(),
            _ => RoutingMatrixRow::unknown(),
        })
        .collect()
}

fn convert_section(section: &EngineSection) -> Result<Section, ConversionError> {
    let section_type = match section.section_type.as_str() {
        "street_network" => SectionType::StreetNetwork,
        "park" => SectionType::Park,
        "waiting" => SectionType::Waiting,
        "crow_fly" => SectionType::CrowFly,
        "transfer" => SectionType::Transfer,
        "leave_parking" => SectionType::LeaveParking,
        "bss_rent" => SectionType::BssRent,
        "bss_put_back" => SectionType::BssPutBack,
        other => return Err(ConversionError::UnknownSectionType(other.to_string())),
    };

    let origin = convert_place(&section.origin)?;
    let destination = convert_place(&section.destination)?;
    let begin = timestamp(section.begin_date_time)?;
    let duration = Duration::seconds(section.duration);

    let mut converted = match &section.street_network {
        Some(sn) => {
            let mode: StreetNetworkMode = sn
                .mode
                .parse()
                .map_err(|_| ConversionError::UnknownMode(sn.mode.clone()))?;
            let mut s = Section::street_network(
                mode,
                origin,
                destination,
                begin,
                duration,
                section.length,
            );
            s.coordinates = sn
                .coordinates
                .iter()
                .map(|c| convert_coord(*c))
                .collect::<Result<_, _>>()?;
            s
        }
        None => {
            let mut s = Section::stationary(section_type, origin, begin, duration);
            s.destination = destination;
            s.length = section.length;
            s
        }
    };
    converted.section_type = section_type;
    Ok(converted)
}

fn convert_coord(coord: EngineCoord) -> Result<Coord, ConversionError> {
    Coord::new(coord.lon, coord.lat).map_err(|e| ConversionError::InvalidCoord(e.to_string()))
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, ConversionError> {
    DateTime::from_timestamp(secs, 0).ok_or(ConversionError::InvalidTimestamp(secs))
}
