//! Mathematical utilities: the damped least-squares optimizer.

pub mod lm;

pub use lm::*;
