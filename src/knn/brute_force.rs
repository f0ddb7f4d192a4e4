//! Exhaustive scan over all candidates.

use super::convert::haversine;
use super::index::{k_smallest, IndexKind, SpatialIndex};
use crate::models::Neighbor;

pub struct BruteForce {
    points: Vec<[f64; 2]>,
}

impl BruteForce {
    pub fn new(points: Vec<[f64; 2]>) -> Self {
        Self { points }
    }

    fn distances<'a>(&'a self, query: &'a [f64; 2]) -> impl Iterator<Item = Neighbor> + 'a {
        self.points
            .iter()
            .enumerate()
            .map(move |(i, p)| Neighbor::new(i, haversine(query, p)))
    }
}

impl SpatialIndex for BruteForce {
    fn kind(&self) -> IndexKind {
        IndexKind::BruteForce
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    fn nearest(&self, query: &[f64; 2], k: usize) -> Vec<Neighbor> {
        k_smallest(self.distances(query).collect(), k)
    }

    fn within(&self, query: &[f64; 2], radius: f64) -> Vec<Neighbor> {
        let mut found: Vec<Neighbor> = self
            .distances(query)
            .filter(|n| n.distance <= radius)
            .collect();
        found.sort_unstable();
        found
    }
}
