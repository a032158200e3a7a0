//! Peak shape implementations (Gaussian, Breit-Wigner).
//!
//! Models are implemented as small, pure functions over a `ModelKind` so the
//! fit engine can stay generic across shapes.

pub mod model;

pub use model::*;
