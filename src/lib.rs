//! Sessionflow - checkout session reload pipeline
//!
//! Turns append-only raw checkout sessions and discount effects into three
//! deduplicated, business-ready datasets, rebuilt atomically on every run.

pub mod config;
pub mod model;
pub mod normalize;
pub mod reload;
pub mod storage;
pub mod transform;
pub mod utils;

pub use reload::{ReloadController, ReloadError, Stage};
