//! Matcher tuning knobs.

use serde::{Deserialize, Serialize};

use crate::knn::convert::EARTH_RADIUS_M;
use crate::knn::{IndexKind, DEFAULT_LEAF_SIZE};

/// Query batches smaller than this stay on the calling thread.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Index structure built over the candidates
    pub index: IndexKind,
    /// Maximum points per ball tree leaf
    pub leaf_size: usize,
    /// Spread large query batches over the rayon pool
    pub parallel: bool,
    pub parallel_threshold: usize,
    /// Reject coordinates outside [-180, 180] x [-90, 90] instead of matching them
    pub validate_coordinates: bool,
    /// Sphere radius used to turn angles into meters
    pub earth_radius_m: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            index: IndexKind::default(),
            leaf_size: DEFAULT_LEAF_SIZE,
            parallel: true,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            validate_coordinates: false,
            earth_radius_m: EARTH_RADIUS_M,
        }
    }
}

impl MatcherConfig {
    /// Whether a batch of `queries` points should run in parallel.
    pub fn use_parallel(&self, queries: usize) -> bool {
        self.parallel && queries >= self.parallel_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: MatcherConfig = toml::from_str(
            r#"
            index = "sphere_tree"
            validate_coordinates = true
            "#,
        )
        .unwrap();

        assert_eq!(config.index, IndexKind::SphereTree);
        assert!(config.validate_coordinates);
        assert_eq!(config.leaf_size, DEFAULT_LEAF_SIZE);
        assert_eq!(config.earth_radius_m, EARTH_RADIUS_M);
    }

    #[test]
    fn test_use_parallel() {
        let config = MatcherConfig {
            parallel_threshold: 100,
            ..Default::default()
        };
        assert!(!config.use_parallel(99));
        assert!(config.use_parallel(100));

        let serial = MatcherConfig {
            parallel: false,
            ..config
        };
        assert!(!serial.use_parallel(1_000_000));
    }
}
