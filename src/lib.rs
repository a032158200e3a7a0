//! `res-peaks` library crate.
//!
//! The binary (`respeaks`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - modules are reusable (e.g., driving fits from an external histogram
//!   store instead of synthetic samples)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod hist;
pub mod io;
pub mod math;
pub mod models;
pub mod overlay;
pub mod plot;
pub mod report;
