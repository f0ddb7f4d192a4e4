//! Nearest-neighbor matching between two point sets.

use tracing::debug;

use super::convert::{meters_to_rad, rad_to_meters, to_radians};
use super::index::{self, build, check_k, SpatialIndex, DEFAULT_LEAF_SIZE};
use super::IndexKind;
use crate::config::MatcherConfig;
use crate::error::{MatchError, Result};
use crate::models::{GeoPoint, MatchResult, Neighbors, PointSet};

/// Candidate set with a prebuilt index, reusable across query batches.
pub struct NearestMatcher {
    config: MatcherConfig,
    index: Box<dyn SpatialIndex>,
}

impl NearestMatcher {
    /// Build the index over `candidates`.
    pub fn new(candidates: &PointSet, config: MatcherConfig) -> Result<Self> {
        if candidates.is_empty() {
            return Err(MatchError::EmptyCandidateSet);
        }
        if config.validate_coordinates {
            candidates.validate_range()?;
        }

        let radians = to_radians(candidates);
        let index = build(&radians, config.index, config.leaf_size)?;

        Ok(Self { config, index })
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Number of candidates
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Which index was actually built
    pub fn index_kind(&self) -> IndexKind {
        self.index.kind()
    }

    /// Closest candidate for every query point, in query order.
    pub fn match_points(&self, query: &PointSet, return_distance: bool) -> Result<Vec<MatchResult>> {
        let neighbors = self.k_nearest(query, 1)?;
        let radius = self.config.earth_radius_m;

        let results = neighbors
            .rows()
            .map(|(distances, indices)| MatchResult {
                candidate_index: indices[0],
                distance_m: return_distance.then(|| rad_to_meters(distances[0], radius)),
            })
            .collect();

        Ok(results)
    }

    /// The `k` closest candidates per query point. Distances are in radians.
    pub fn k_nearest(&self, query: &PointSet, k: usize) -> Result<Neighbors> {
        check_k(k, self.len())?;
        if self.config.validate_coordinates {
            query.validate_range()?;
        }

        let radians = to_radians(query);
        let neighbors = if self.config.use_parallel(radians.len()) {
            index::par_query(self.index.as_ref(), &radians, k)?
        } else {
            index::query(self.index.as_ref(), &radians, k)?
        };

        debug!(
            "Matched {} query points against {} candidates",
            neighbors.len(),
            self.len()
        );

        Ok(neighbors)
    }

    /// All candidates within `meters` of `point`, closest first.
    pub fn within(&self, point: &GeoPoint, meters: f64) -> Result<Vec<MatchResult>> {
        let finite = point.lon.is_finite() && point.lat.is_finite();
        if !finite || (self.config.validate_coordinates && !point.is_in_range()) {
            return Err(MatchError::InvalidLookupPoint {
                lon: point.lon,
                lat: point.lat,
            });
        }

        let radius = self.config.earth_radius_m;
        let found = index::radius_query(
            self.index.as_ref(),
            &point.to_radians(),
            meters_to_rad(meters, radius),
        );

        Ok(found
            .into_iter()
            .map(|n| MatchResult {
                candidate_index: n.index,
                distance_m: Some(rad_to_meters(n.distance, radius)),
            })
            .collect())
    }
}

/// Closest candidate for every query point, using the default configuration.
///
/// The index is built for this call and dropped on return.
pub fn nearest_neighbor(
    query: &PointSet,
    candidates: &PointSet,
    return_distance: bool,
) -> Result<Vec<MatchResult>> {
    nearest_neighbor_with(query, candidates, return_distance, MatcherConfig::default())
}

/// [`nearest_neighbor`] with an explicit configuration.
pub fn nearest_neighbor_with(
    query: &PointSet,
    candidates: &PointSet,
    return_distance: bool,
    config: MatcherConfig,
) -> Result<Vec<MatchResult>> {
    if candidates.is_empty() {
        return Err(MatchError::EmptyCandidateSet);
    }
    if config.validate_coordinates {
        candidates.validate_range()?;
        query.validate_range()?;
    }
    if query.is_empty() {
        return Ok(Vec::new());
    }

    NearestMatcher::new(candidates, config)?.match_points(query, return_distance)
}

/// k nearest candidates for radian source points, distances in radians.
pub fn get_nearest(
    src_radians: &[[f64; 2]],
    candidates_radians: &[[f64; 2]],
    k: usize,
) -> Result<Neighbors> {
    if candidates_radians.is_empty() {
        return Err(MatchError::EmptyCandidateSet);
    }
    check_k(k, candidates_radians.len())?;

    let index = build(candidates_radians, IndexKind::BallTree, DEFAULT_LEAF_SIZE)?;
    index::query(index.as_ref(), src_radians, k)
}
