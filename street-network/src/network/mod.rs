//! The street-network backend contract.
//!
//! Every backend (the Kraken engine adapter, third-party HTTP services and
//! the composing decorators) implements [`StreetNetworkService`]:
//! - `direct_path`: one journey between two places, anchored on a time
//! - `routing_matrix`: batched 1×n / n×1 durations
//! - `status`: diagnostics, no I/O
//! - `make_path_key`: memoization identity, no I/O

mod error;
mod key;
#[cfg(test)]
pub mod mock;
mod params;
mod response;
mod service;
mod status;

pub use error::StreetNetworkError;
pub use key::StreetNetworkPathKey;
pub use params::{ModeTable, RoutingParams};
pub use response::{DirectPathResponse, NoSolution, NoSolutionCode};
pub use service::{
    DirectPathQuery, NearbyPlaces, NearbyQuery, StreetNetworkService, check_matrix_cardinality,
};
pub use status::BackendStatus;
