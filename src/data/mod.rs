//! Synthetic data generation for demos and recovery tests.

pub mod sample;

pub use sample::*;
