//! Overlay assembly for side-by-side distribution comparison.

pub mod builder;

pub use builder::*;
