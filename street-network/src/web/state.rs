//! Application state for the web layer.

use std::sync::Arc;

use crate::manager::StreetNetworkBackendManager;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Street-network backends of every deployment
    pub manager: Arc<StreetNetworkBackendManager>,
}

impl AppState {
    pub fn new(manager: Arc<StreetNetworkBackendManager>) -> Self {
        Self { manager }
    }
}
