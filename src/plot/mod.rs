//! ASCII rendering of overlays for terminal output.

pub mod ascii;

pub use ascii::*;
