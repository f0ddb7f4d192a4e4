//! R-tree over unit-sphere vectors.
//!
//! Chord length between two unit vectors is `2 sin(θ/2)`, which grows
//! monotonically with the great-circle angle `θ`. Euclidean nearest neighbors
//! in 3-D are therefore great-circle nearest neighbors, and a plain `rstar`
//! tree answers haversine queries without any longitude wrap-around handling.

use rstar::primitives::GeomWithData;
use rstar::RTree;

use super::convert::haversine;
use super::index::{IndexKind, SpatialIndex};
use crate::models::Neighbor;

type IndexedVector = GeomWithData<[f64; 3], usize>;

/// Relative slack on squared chord comparisons, wide enough to cover
/// rounding between the chord and haversine formulations.
const CHORD_SLACK: f64 = 1e-9;

pub struct SphereTree {
    points: Vec<[f64; 2]>,
    tree: RTree<IndexedVector>,
}

impl SphereTree {
    pub fn build(points: &[[f64; 2]]) -> Self {
        let vectors: Vec<IndexedVector> = points
            .iter()
            .enumerate()
            .map(|(i, p)| GeomWithData::new(unit_vector(p), i))
            .collect();

        Self {
            points: points.to_vec(),
            tree: RTree::bulk_load(vectors),
        }
    }

    fn neighbor(&self, query: &[f64; 2], index: usize) -> Neighbor {
        Neighbor::new(index, haversine(query, &self.points[index]))
    }
}

impl SpatialIndex for SphereTree {
    fn kind(&self) -> IndexKind {
        IndexKind::SphereTree
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    fn nearest(&self, query: &[f64; 2], k: usize) -> Vec<Neighbor> {
        let target = unit_vector(query);
        let mut found = Vec::with_capacity(k + 1);
        let mut cutoff = f64::INFINITY;

        // Keep pulling past the k-th hit while chords tie with it, then settle
        // the order with haversine distances.
        for (item, d2) in self.tree.nearest_neighbor_iter_with_distance_2(&target) {
            if d2 > cutoff {
                break;
            }
            found.push(self.neighbor(query, item.data));
            if found.len() == k {
                cutoff = d2 * (1.0 + CHORD_SLACK) + f64::EPSILON;
            }
        }

        found.sort_unstable();
        found.truncate(k);
        found
    }

    fn within(&self, query: &[f64; 2], radius: f64) -> Vec<Neighbor> {
        let chord = if radius >= std::f64::consts::PI {
            2.0
        } else {
            2.0 * (radius / 2.0).sin()
        };
        let max_d2 = chord * chord * (1.0 + CHORD_SLACK) + f64::EPSILON;

        let mut found: Vec<Neighbor> = self
            .tree
            .locate_within_distance(unit_vector(query), max_d2)
            .map(|item| self.neighbor(query, item.data))
            .filter(|n| n.distance <= radius)
            .collect();
        found.sort_unstable();
        found
    }
}

/// `[lon_rad, lat_rad]` to a Cartesian unit vector.
fn unit_vector(p: &[f64; 2]) -> [f64; 3] {
    let (lon, lat) = (p[0], p[1]);
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}
