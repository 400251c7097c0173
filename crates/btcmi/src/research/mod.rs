//! Price-series research tooling that sits beside the signal engines.

pub mod fractal;

pub use fractal::{
    approximate_entropy, dfa, mfdfa, BacktestRun, FittedFeatures, FractalModel, ModelError,
};
