//! Adapters to third-party HTTP routing services.
//!
//! Each adapter translates the common contract into the service's API
//! (coordinates, costing/mode parameter, service-specific directives) and
//! its answers back into [`Journey`](crate::domain::Journey) sections:
//! polyline decoding and unit conversion to meters happen here.

mod here;
mod polyline;
mod transport;
mod valhalla;

pub use here::{Here, HereConfig};
pub use polyline::{PolylineError, decode_polyline};
pub use valhalla::{Valhalla, ValhallaConfig};

use url::Url;

/// Error building an HTTP adapter.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SetupError {
    #[error("service_url is missing")]
    MissingUrl,

    #[error("service_url {url} is not a valid URL: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Parse a service URL, dropping any trailing slash.
pub(crate) fn parse_service_url(url: Option<&str>) -> Result<Url, SetupError> {
    let raw = url.filter(|u| !u.is_empty()).ok_or(SetupError::MissingUrl)?;
    let parsed = Url::parse(raw.trim_end_matches('/')).map_err(|e| SetupError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if parsed.cannot_be_a_base() || parsed.host_str().is_none() {
        return Err(SetupError::InvalidUrl {
            url: raw.to_string(),
            reason: "not a base URL".to_string(),
        });
    }
    Ok(parsed)
}

/// Append a path segment to a base URL.
pub(crate) fn endpoint(base: &Url, path: &str) -> String {
    format!("{}/{}", base.as_str().trim_end_matches('/'), path)
}
