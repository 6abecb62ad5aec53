//! Backends composed from other backends.
//!
//! Each composer holds its delegate(s), forwards what it does not change and
//! overrides `direct_path`:
//! - [`CarWithPark`]: drive to a park-and-ride, park, walk to the destination
//! - [`Taxi`]: a car path reported as taxi, with a waiting section on fallbacks
//! - [`Ridesharing`]: a car path reported as ridesharing

mod car_with_park;
mod ridesharing;
mod taxi;

pub use car_with_park::{CarWithPark, CarWithParkConfig};
pub use ridesharing::Ridesharing;
pub use taxi::Taxi;

use crate::domain::StreetNetworkMode;
use crate::network::RoutingParams;

/// Parameters for a car delegate standing in for `mode`: it drives at the
/// speed of `mode` and is held to the direct path bounds of `mode`.
fn driven_as(params: &RoutingParams, mode: StreetNetworkMode) -> RoutingParams {
    params
        .clone()
        .with_speed(StreetNetworkMode::Car, params.speed(mode))
        .with_direct_path_bounds(
            StreetNetworkMode::Car,
            params.max_direct_path_distance.get(mode),
            params.max_direct_path_duration_secs.get(mode),
        )
}

fn is_car(mode: StreetNetworkMode) -> bool {
    matches!(mode, StreetNetworkMode::Car | StreetNetworkMode::CarNoPark)
}
