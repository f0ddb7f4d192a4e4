//! Great-circle nearest-neighbor search.
//!
//! Converts degree coordinates to radians, builds a spatial index over the
//! candidate points, and answers nearest / k-nearest / radius lookups under
//! the haversine metric.

mod ball_tree;
mod brute_force;
pub mod convert;
mod index;
mod matcher;
mod sphere_tree;

pub use ball_tree::BallTree;
pub use brute_force::BruteForce;
pub use convert::{haversine, haversine_m, to_radians, EARTH_RADIUS_M};
pub use index::{
    build, check_finite, check_k, par_query, query, radius_query, IndexKind, SpatialIndex,
    DEFAULT_LEAF_SIZE,
};
pub use matcher::{get_nearest, nearest_neighbor, nearest_neighbor_with, NearestMatcher};
pub use sphere_tree::SphereTree;
