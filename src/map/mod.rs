// src/map/mod.rs
//! Live map view state

pub mod projector;

pub use projector::{MapPoint, MapProjector};
