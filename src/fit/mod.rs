//! Iterative peak fitting.
//!
//! Responsibilities:
//!
//! - compute narrowing windows around the current peak estimate
//! - refit the model inside each window, seeded from the previous result
//! - record non-fatal conditions (non-convergence, degenerate windows)
//!   on the result instead of raising

pub mod engine;
pub mod window;

pub use engine::*;
pub use window::*;
