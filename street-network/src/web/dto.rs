//! Data transfer objects for web responses.

use serde::Serialize;

use crate::network::BackendStatus;

/// Diagnostics of one deployment.
#[derive(Debug, Serialize)]
pub struct DeploymentStatusResponse {
    pub deployment: String,
    pub street_networks: Vec<BackendStatus>,
}

/// Registered deployments.
#[derive(Debug, Serialize)]
pub struct DeploymentsResponse {
    pub deployments: Vec<String>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}
