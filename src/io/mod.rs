//! Result export (JSON).

pub mod export;

pub use export::*;
