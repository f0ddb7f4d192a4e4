//! nearest-stop - batched great-circle nearest-neighbor matching
//!
//! For every point of a query set (e.g. building centroids), finds the
//! closest point of a candidate set (e.g. transit stops) through a spatial
//! index under the haversine metric.

pub mod config;
pub mod error;
pub mod join;
pub mod knn;
pub mod models;

pub use config::MatcherConfig;
pub use error::{MatchError, Result};
pub use knn::{get_nearest, nearest_neighbor, nearest_neighbor_with, IndexKind, NearestMatcher};
pub use models::{GeoPoint, MatchResult, Neighbors, PointSet};
