//! Core data models for the matcher.

pub mod point;
pub mod result;

pub use point::{GeoPoint, PointSet};
pub use result::{MatchResult, Neighbor, Neighbors};
