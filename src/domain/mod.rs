//! Shared domain types for histograms, models, and fit results.

pub mod types;

pub use types::*;
