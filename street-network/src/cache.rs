//! Memoization of direct paths.
//!
//! A journey request asks for the same street-network legs many times
//! (every fallback combination shares its first and last legs). Paths are
//! cached by backend and [`StreetNetworkPathKey`]; backends decide through
//! `make_path_key` whether the departure time is part of the key.
//!
//! Street-network durations do not depend on the time of day unless the key
//! says so, so a hit is re-anchored on the extremity of the new query.

use std::time::Duration;

use moka::future::Cache as MokaCache;
use tracing::debug;

use crate::network::{
    DirectPathQuery, DirectPathResponse, RoutingParams, StreetNetworkError, StreetNetworkPathKey,
    StreetNetworkService,
};

/// Cache key: backend id and path key.
type PathKey = (String, StreetNetworkPathKey);

/// Configuration for the path cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            max_capacity: 1000,
        }
    }
}

/// Direct paths already computed, meant to live as long as one request.
pub struct PathCache {
    paths: MokaCache<PathKey, DirectPathResponse>,
}

impl PathCache {
    pub fn new(config: &CacheConfig) -> Self {
        let paths = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();
        Self { paths }
    }

    /// Answer from the cache, or ask `service` and remember its answer.
    ///
    /// Errors are not cached.
    pub async fn direct_path(
        &self,
        service: &dyn StreetNetworkService,
        query: DirectPathQuery<'_>,
        params: &RoutingParams,
    ) -> Result<DirectPathResponse, StreetNetworkError> {
        let key = (
            service.id().to_string(),
            service.make_path_key(
                query.mode,
                query.origin.uri(),
                query.destination.uri(),
                query.path_type,
                query.extremity,
            ),
        );

        if let Some(mut cached) = self.paths.get(&key).await {
            debug!(
                backend = %service.id(),
                request_id = %params.request_id,
                mode = %query.mode,
                "direct path from cache"
            );
            for journey in &mut cached.journeys {
                journey.anchor(query.extremity);
            }
            return Ok(cached);
        }

        let response = service.direct_path(query, params).await?;
        self.paths.insert(key, response.clone()).await;
        Ok(response)
    }

    pub fn invalidate_all(&self) {
        self.paths.invalidate_all();
    }
}

impl Default for PathCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
