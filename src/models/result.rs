//! Matcher output types.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Closest candidate for one query point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Index into the candidate set
    pub candidate_index: usize,
    /// Great-circle distance in meters, present when distances were requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
}

/// A candidate and its angular distance (radians) to some query point.
///
/// Ordered by distance, then by candidate index, so equal distances always
/// resolve to the lowest index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f64,
}

impl Neighbor {
    pub fn new(index: usize, distance: f64) -> Self {
        Self { index, distance }
    }
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.index.cmp(&other.index))
    }
}

/// k-nearest-neighbor answer for a batch of queries.
///
/// Stored as two row-major `(queries, k)` matrices: row `i` holds the `k`
/// neighbors of query `i` in ascending distance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Neighbors {
    k: usize,
    distances: Vec<f64>,
    indices: Vec<usize>,
}

impl Neighbors {
    /// Assemble from per-query neighbor lists, each already sorted and of length `k`.
    pub fn from_rows(k: usize, rows: Vec<Vec<Neighbor>>) -> Self {
        let mut distances = Vec::with_capacity(rows.len() * k);
        let mut indices = Vec::with_capacity(rows.len() * k);
        for row in rows {
            debug_assert_eq!(row.len(), k);
            for n in row {
                distances.push(n.distance);
                indices.push(n.index);
            }
        }
        Self {
            k,
            distances,
            indices,
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of query rows
    pub fn len(&self) -> usize {
        if self.k == 0 {
            0
        } else {
            self.indices.len() / self.k
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Angular distances (radians) of query `row`
    pub fn distances(&self, row: usize) -> &[f64] {
        &self.distances[row * self.k..(row + 1) * self.k]
    }

    /// Candidate indices of query `row`
    pub fn indices(&self, row: usize) -> &[usize] {
        &self.indices[row * self.k..(row + 1) * self.k]
    }

    /// Iterate rows as `(distances, indices)` pairs.
    pub fn rows(&self) -> impl Iterator<Item = (&[f64], &[usize])> {
        let k = self.k.max(1);
        self.distances.chunks(k).zip(self.indices.chunks(k))
    }
}
