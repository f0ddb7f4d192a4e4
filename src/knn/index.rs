//! Spatial index construction and k-nearest-neighbor queries.
//!
//! All index kinds answer under the haversine metric on `[lon_rad, lat_rad]`
//! coordinates and return exactly what an exhaustive scan would, with ties
//! going to the lowest candidate index.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::ball_tree::BallTree;
use super::brute_force::BruteForce;
use super::sphere_tree::SphereTree;
use crate::error::{MatchError, Result};
use crate::models::{Neighbor, Neighbors};

/// Default number of points in a ball tree leaf.
pub const DEFAULT_LEAF_SIZE: usize = 40;

/// Nearest-neighbor index over candidate points in radians.
pub trait SpatialIndex: Send + Sync {
    /// Which structure this is
    fn kind(&self) -> IndexKind;

    /// Number of indexed candidates
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `k` closest candidates to `query`, ascending.
    ///
    /// Callers guarantee `1 <= k <= self.len()`.
    fn nearest(&self, query: &[f64; 2], k: usize) -> Vec<Neighbor>;

    /// All candidates within `radius` radians of `query`, ascending.
    fn within(&self, query: &[f64; 2], radius: f64) -> Vec<Neighbor>;
}

/// Available index structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Ball tree with haversine bounds
    #[default]
    BallTree,
    /// R-tree over 3-D unit vectors
    SphereTree,
    /// Exhaustive scan
    BruteForce,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::BallTree => write!(f, "ball_tree"),
            IndexKind::SphereTree => write!(f, "sphere_tree"),
            IndexKind::BruteForce => write!(f, "brute_force"),
        }
    }
}

impl FromStr for IndexKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "ball_tree" | "balltree" => Ok(IndexKind::BallTree),
            "sphere_tree" | "rtree" => Ok(IndexKind::SphereTree),
            "brute_force" | "brute" => Ok(IndexKind::BruteForce),
            other => Err(format!("unknown index kind '{}'", other)),
        }
    }
}

/// Build an index over `candidates`.
///
/// Candidate sets that fit in a single leaf are scanned exhaustively
/// whatever `kind` asks for.
pub fn build(
    candidates: &[[f64; 2]],
    kind: IndexKind,
    leaf_size: usize,
) -> Result<Box<dyn SpatialIndex>> {
    if candidates.is_empty() {
        return Err(MatchError::EmptyCandidateSet);
    }
    check_finite(candidates)?;

    let leaf_size = leaf_size.max(1);
    let index: Box<dyn SpatialIndex> = match kind {
        _ if candidates.len() <= leaf_size => Box::new(BruteForce::new(candidates.to_vec())),
        IndexKind::BallTree => Box::new(BallTree::build(candidates.to_vec(), leaf_size)),
        IndexKind::SphereTree => Box::new(SphereTree::build(candidates)),
        IndexKind::BruteForce => Box::new(BruteForce::new(candidates.to_vec())),
    };

    debug!(
        "Built {} index over {} candidates (requested {})",
        index.kind(),
        index.len(),
        kind
    );

    Ok(index)
}

/// Check `1 <= k <= candidates`.
pub fn check_k(k: usize, candidates: usize) -> Result<()> {
    if k == 0 || k > candidates {
        return Err(MatchError::InvalidK { k, candidates });
    }
    Ok(())
}

/// Fail on the first point with a NaN or infinite coordinate.
pub fn check_finite(points: &[[f64; 2]]) -> Result<()> {
    match points
        .iter()
        .position(|p| !(p[0].is_finite() && p[1].is_finite()))
    {
        Some(index) => Err(MatchError::NonFiniteCoordinate { index }),
        None => Ok(()),
    }
}

/// k-nearest-neighbor query for a batch of points, one at a time.
pub fn query(index: &dyn SpatialIndex, queries: &[[f64; 2]], k: usize) -> Result<Neighbors> {
    check_k(k, index.len())?;
    check_finite(queries)?;
    debug!("Querying {} points for k={}", queries.len(), k);

    let rows = queries.iter().map(|q| index.nearest(q, k)).collect();
    Ok(Neighbors::from_rows(k, rows))
}

/// Same as [`query`], spread over the rayon pool. Output is identical.
pub fn par_query(index: &dyn SpatialIndex, queries: &[[f64; 2]], k: usize) -> Result<Neighbors> {
    check_k(k, index.len())?;
    check_finite(queries)?;
    debug!("Querying {} points for k={} in parallel", queries.len(), k);

    let rows = queries.par_iter().map(|q| index.nearest(q, k)).collect();
    Ok(Neighbors::from_rows(k, rows))
}

/// All candidates within `radius` radians of `query`. Empty for a non-finite query point.
pub fn radius_query(index: &dyn SpatialIndex, query: &[f64; 2], radius: f64) -> Vec<Neighbor> {
    if radius < 0.0 || radius.is_nan() || !(query[0].is_finite() && query[1].is_finite()) {
        return Vec::new();
    }
    index.within(query, radius)
}

/// Keep the `k` smallest neighbors, sorted.
pub(crate) fn k_smallest(mut all: Vec<Neighbor>, k: usize) -> Vec<Neighbor> {
    if k == 0 {
        return Vec::new();
    }
    if k < all.len() {
        all.select_nth_unstable(k - 1);
        all.truncate(k);
    }
    all.sort_unstable();
    all
}

#[cfg(test)]
pub(crate) mod test_support {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::knn::convert::haversine;
    use crate::models::Neighbor;

    /// Random `[lon_rad, lat_rad]` points inside a degree window.
    pub fn random_radians(
        seed: u64,
        n: usize,
        lon: (f64, f64),
        lat: (f64, f64),
    ) -> Vec<[f64; 2]> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                [
                    rng.random_range(lon.0..lon.1).to_radians(),
                    rng.random_range(lat.0..lat.1).to_radians(),
                ]
            })
            .collect()
    }

    /// Reference answer by full sort.
    pub fn brute(candidates: &[[f64; 2]], q: &[f64; 2], k: usize) -> Vec<Neighbor> {
        let mut all: Vec<Neighbor> = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| Neighbor::new(i, haversine(q, c)))
            .collect();
        all.sort();
        all.truncate(k);
        all
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::knn::convert::haversine;

    const KINDS: [IndexKind; 3] = [
        IndexKind::BallTree,
        IndexKind::SphereTree,
        IndexKind::BruteForce,
    ];

    #[test]
    fn test_build_empty_fails() {
        for kind in KINDS {
            assert_eq!(
                build(&[], kind, DEFAULT_LEAF_SIZE).err(),
                Some(MatchError::EmptyCandidateSet)
            );
        }
    }

    #[test]
    fn test_small_sets_fall_back_to_brute_force() {
        let c = random_radians(1, 10, (24.0, 25.0), (60.0, 61.0));
        let index = build(&c, IndexKind::BallTree, DEFAULT_LEAF_SIZE).unwrap();
        assert_eq!(index.kind(), IndexKind::BruteForce);

        let index = build(&c, IndexKind::BallTree, 2).unwrap();
        assert_eq!(index.kind(), IndexKind::BallTree);
    }

    #[test]
    fn test_invalid_k() {
        let c = random_radians(2, 5, (0.0, 1.0), (0.0, 1.0));
        let index = build(&c, IndexKind::BallTree, 2).unwrap();
        let q = vec![[0.0, 0.0]];

        assert_eq!(
            query(index.as_ref(), &q, 0).err(),
            Some(MatchError::InvalidK { k: 0, candidates: 5 })
        );
        assert_eq!(
            query(index.as_ref(), &q, 6).err(),
            Some(MatchError::InvalidK { k: 6, candidates: 5 })
        );
        assert!(query(index.as_ref(), &q, 5).is_ok());
    }

    #[test]
    fn test_matches_brute_force_random_sets() {
        for seed in 0..8u64 {
            let c = random_radians(seed, 200, (24.5, 25.3), (60.0, 60.4));
            let q = random_radians(seed + 100, 150, (24.4, 25.4), (59.9, 60.5));

            for kind in KINDS {
                let index = build(&c, kind, 8).unwrap();
                for k in [1, 4] {
                    let got = query(index.as_ref(), &q, k).unwrap();
                    for (i, point) in q.iter().enumerate() {
                        let expected = brute(&c, point, k);
                        let idx: Vec<usize> = expected.iter().map(|n| n.index).collect();
                        assert_eq!(got.indices(i), idx.as_slice(), "{} seed {}", kind, seed);
                        for (d, e) in got.distances(i).iter().zip(&expected) {
                            assert!((d - e.distance).abs() < 1e-12);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_global_random_sets() {
        let c = random_radians(42, 200, (-180.0, 180.0), (-89.0, 89.0));
        let q = random_radians(43, 100, (-180.0, 180.0), (-89.0, 89.0));

        for kind in KINDS {
            let index = build(&c, kind, 5).unwrap();
            let got = query(index.as_ref(), &q, 1).unwrap();
            for (i, point) in q.iter().enumerate() {
                assert_eq!(got.indices(i)[0], brute(&c, point, 1)[0].index, "{}", kind);
            }
        }
    }

    #[test]
    fn test_k_of_five_sorted_unique() {
        let c = random_radians(7, 5, (10.0, 11.0), (50.0, 51.0));
        let q = random_radians(8, 20, (10.0, 11.0), (50.0, 51.0));

        for kind in KINDS {
            let index = build(&c, kind, 1).unwrap();
            let got = query(index.as_ref(), &q, 3).unwrap();
            assert_eq!(got.len(), 20);
            for (dists, idx) in got.rows() {
                assert_eq!(idx.len(), 3);
                assert!(idx.iter().all(|&i| i < 5));
                assert!(idx[0] != idx[1] && idx[1] != idx[2] && idx[0] != idx[2]);
                assert!(dists.windows(2).all(|w| w[0] <= w[1]));
            }
        }
    }

    #[test]
    fn test_ties_resolve_to_lowest_index() {
        // Four candidates at the same distance around the origin, duplicated.
        let d = 0.001;
        let c = vec![
            [d, 0.0],
            [0.0, d],
            [-d, 0.0],
            [0.0, -d],
            [d, 0.0],
            [0.0, d],
        ];
        let q = vec![[0.0, 0.0]];

        for kind in KINDS {
            let index = build(&c, kind, 1).unwrap();
            let first = query(index.as_ref(), &q, 2).unwrap();
            let again = query(index.as_ref(), &q, 2).unwrap();
            assert_eq!(first, again);
            assert_eq!(first.indices(0)[0], brute(&c, &q[0], 1)[0].index);
        }
    }

    #[test]
    fn test_single_candidate() {
        let c = vec![[0.3, 0.7]];
        let q = random_radians(9, 30, (-50.0, 50.0), (-50.0, 50.0));
        let index = build(&c, IndexKind::BallTree, DEFAULT_LEAF_SIZE).unwrap();
        let got = query(index.as_ref(), &q, 1).unwrap();
        for (i, point) in q.iter().enumerate() {
            assert_eq!(got.indices(i), &[0]);
            assert_eq!(got.distances(i)[0], haversine(point, &c[0]));
        }
    }

    #[test]
    fn test_empty_queries() {
        let c = random_radians(3, 50, (0.0, 1.0), (0.0, 1.0));
        let index = build(&c, IndexKind::SphereTree, 4).unwrap();
        let got = query(index.as_ref(), &[], 1).unwrap();
        assert!(got.is_empty());
    }

    #[test]
    fn test_parallel_matches_serial() {
        let c = random_radians(11, 500, (24.0, 26.0), (60.0, 61.0));
        let q = random_radians(12, 2_000, (24.0, 26.0), (60.0, 61.0));
        let index = build(&c, IndexKind::BallTree, DEFAULT_LEAF_SIZE).unwrap();

        let serial = query(index.as_ref(), &q, 2).unwrap();
        let parallel = par_query(index.as_ref(), &q, 2).unwrap();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn test_radius_query_matches_brute_force() {
        let c = random_radians(21, 300, (24.5, 25.3), (60.0, 60.4));
        let q = random_radians(22, 40, (24.5, 25.3), (60.0, 60.4));
        let radius = 0.02_f64.to_radians();

        for kind in KINDS {
            let index = build(&c, kind, 8).unwrap();
            for point in &q {
                let got: Vec<usize> = radius_query(index.as_ref(), point, radius)
                    .iter()
                    .map(|n| n.index)
                    .collect();
                let expected: Vec<usize> = brute(&c, point, c.len())
                    .into_iter()
                    .take_while(|n| n.distance <= radius)
                    .map(|n| n.index)
                    .collect();
                assert_eq!(got, expected, "{}", kind);
            }
        }
    }

    #[test]
    fn test_radius_query_negative_radius() {
        let c = random_radians(5, 10, (0.0, 1.0), (0.0, 1.0));
        let index = build(&c, IndexKind::BruteForce, 1).unwrap();
        assert!(radius_query(index.as_ref(), &c[0], -1.0).is_empty());
    }

    #[test]
    fn test_non_finite_candidates_rejected() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut c = random_radians(31, 300, (24.0, 25.0), (60.0, 61.0));
            c[17] = [bad, 0.0];

            for kind in KINDS {
                assert_eq!(
                    build(&c, kind, DEFAULT_LEAF_SIZE).err(),
                    Some(MatchError::NonFiniteCoordinate { index: 17 }),
                    "{}",
                    kind
                );
            }
        }
    }

    #[test]
    fn test_non_finite_queries_rejected() {
        let c = random_radians(32, 100, (24.0, 25.0), (60.0, 61.0));
        let mut q = random_radians(33, 10, (24.0, 25.0), (60.0, 61.0));
        q[4] = [0.4, f64::NAN];

        for kind in KINDS {
            let index = build(&c, kind, 8).unwrap();
            assert_eq!(
                query(index.as_ref(), &q, 1).err(),
                Some(MatchError::NonFiniteCoordinate { index: 4 })
            );
            assert_eq!(
                par_query(index.as_ref(), &q, 1).err(),
                Some(MatchError::NonFiniteCoordinate { index: 4 })
            );
            assert!(radius_query(index.as_ref(), &q[4], 1.0).is_empty());
        }
    }

    #[test]
    fn test_index_kind_parse() {
        assert_eq!("ball-tree".parse::<IndexKind>(), Ok(IndexKind::BallTree));
        assert_eq!("rtree".parse::<IndexKind>(), Ok(IndexKind::SphereTree));
        assert_eq!("BRUTE_FORCE".parse::<IndexKind>(), Ok(IndexKind::BruteForce));
        assert!("kd".parse::<IndexKind>().is_err());
        assert_eq!(IndexKind::SphereTree.to_string(), "sphere_tree");
    }
}
