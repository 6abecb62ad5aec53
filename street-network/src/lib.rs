//! Street-network routing composition layer.
//!
//! Puts heterogeneous street-network routing backends (the public transport
//! engine, third-party HTTP services) behind one contract, composes
//! multi-leg fallback paths no backend produces on its own (drive, park,
//! walk; taxi with waiting time) and keeps a hot-reloadable registry of
//! backend instances per deployment.

pub mod breaker;
pub mod cache;
pub mod compose;
pub mod domain;
pub mod http;
pub mod kraken;
pub mod manager;
pub mod network;
pub mod web;
