//! Adapter to the public transport engine's street-network sub-service.
//!
//! The engine is an opaque RPC peer: requests are tagged with the API kind
//! (direct path, routing matrix, places nearby) and carry place references,
//! the fallback mode, the time extremity and the mode speeds.
//!
//! Key characteristics of the engine:
//! - it only computes car paths forward from a fixed start
//! - it only answers 1×n matrices
//! - bike-share answers may come back as a plain walk

mod adapter;
mod client;
mod convert;
mod types;

pub use adapter::Kraken;
pub use client::{EngineClientConfig, EngineRpc, HttpEngineClient};
pub use convert::ConversionError;
pub use types::{EngineRequest, EngineResponse, RequestedApi};
