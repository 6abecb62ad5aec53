//! Diagnostics over HTTP.
//!
//! Exposes the status report of every street-network backend, per
//! deployment. Journey planning itself is served elsewhere.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
