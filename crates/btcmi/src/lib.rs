//! Market-intelligence signal pipeline: feature normalization, weighted
//! scoring, network-rating aggregation and the engine generations that turn
//! a run payload into a result envelope.

pub mod clock;
pub mod config;
pub mod data;
pub mod domain;
pub mod engines;
pub mod error;
pub mod output;
pub mod research;
pub mod schema;
pub mod signal;
pub mod telemetry;

pub use engines::{EngineMode, EngineRegistry, ResultEnvelope, RunPayload};
