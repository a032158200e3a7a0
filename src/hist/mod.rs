//! Histogram transformations: rebinning and normalization.
//!
//! Both are pure functions over [`crate::domain::BinnedDistribution`]; they
//! return new instances and never mutate their input, so a raw histogram can
//! safely feed several overlays at once.

pub mod normalize;
pub mod rebin;

pub use normalize::*;
pub use rebin::*;
