//! Domain types for the street-network layer.
//!
//! This module contains the model shared by every backend: places,
//! time anchors, modes, journeys and routing-matrix entries. Types that
//! carry invariants (coordinates, journeys) enforce or check them here so
//! adapters and composers can rely on them.

mod error;
mod extremity;
mod journey;
mod matrix;
mod mode;
mod place;

pub use error::DomainError;
pub use extremity::{PeriodExtremity, StreetNetworkPathType};
pub use journey::{Distances, Durations, Journey, Section, SectionType};
pub use matrix::{RoutingMatrixRow, RoutingStatus, fastest_reached};
pub use mode::{InvalidMode, StreetNetworkMode};
pub use place::{Coord, InvalidCoord, Place, PlaceKind};
