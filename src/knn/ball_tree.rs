//! Ball tree under the haversine metric.
//!
//! Nodes live in a flat vector and own a contiguous range of a shared
//! permutation of candidate indices. Each node is bounded by a ball (centre,
//! angular radius); since haversine is a metric, `d(q, c) - r` is a lower bound
//! on the distance from `q` to anything inside the ball.

use std::collections::BinaryHeap;

use super::convert::haversine;
use super::index::{IndexKind, SpatialIndex};
use crate::models::Neighbor;

/// Absorbs rounding in the triangle-inequality bound.
const BOUND_SLACK: f64 = 1e-12;

#[derive(Debug, Clone)]
struct Node {
    start: usize,
    end: usize,
    center: [f64; 2],
    radius: f64,
    children: Option<(usize, usize)>,
}

pub struct BallTree {
    points: Vec<[f64; 2]>,
    order: Vec<usize>,
    nodes: Vec<Node>,
}

impl BallTree {
    /// Build over `points`. Nodes holding more than `leaf_size` points are split
    /// at the median of their widest coordinate.
    pub fn build(points: Vec<[f64; 2]>, leaf_size: usize) -> Self {
        let n = points.len();
        let mut tree = Self {
            points,
            order: (0..n).collect(),
            nodes: Vec::with_capacity(2 * n / leaf_size.max(1) + 1),
        };
        if n > 0 {
            tree.build_node(0, n, leaf_size.max(1));
        }
        tree
    }

    fn build_node(&mut self, start: usize, end: usize, leaf_size: usize) -> usize {
        let members = &self.order[start..end];
        let center = centroid(&self.points, members);
        let radius = members
            .iter()
            .map(|&i| haversine(&center, &self.points[i]))
            .fold(0.0, f64::max);

        let id = self.nodes.len();
        self.nodes.push(Node {
            start,
            end,
            center,
            radius,
            children: None,
        });

        if end - start > leaf_size {
            let axis = self.widest_axis(start, end);
            let mid = start + (end - start) / 2;

            // Total order on (coordinate, index) keeps the split deterministic.
            let points = &self.points;
            self.order[start..end].select_nth_unstable_by(mid - start, |&a, &b| {
                points[a][axis]
                    .total_cmp(&points[b][axis])
                    .then(a.cmp(&b))
            });

            let left = self.build_node(start, mid, leaf_size);
            let right = self.build_node(mid, end, leaf_size);
            self.nodes[id].children = Some((left, right));
        }

        id
    }

    fn widest_axis(&self, start: usize, end: usize) -> usize {
        let mut min = [f64::INFINITY; 2];
        let mut max = [f64::NEG_INFINITY; 2];
        for &i in &self.order[start..end] {
            for axis in 0..2 {
                min[axis] = min[axis].min(self.points[i][axis]);
                max[axis] = max[axis].max(self.points[i][axis]);
            }
        }
        if max[1] - min[1] > max[0] - min[0] {
            1
        } else {
            0
        }
    }

    fn lower_bound(&self, node: usize, query: &[f64; 2]) -> f64 {
        let node = &self.nodes[node];
        (haversine(query, &node.center) - node.radius - BOUND_SLACK).max(0.0)
    }

    fn search_nearest(
        &self,
        id: usize,
        lower: f64,
        query: &[f64; 2],
        k: usize,
        heap: &mut BinaryHeap<Neighbor>,
    ) {
        // Strict comparison: a ball touching the current worst may still hold
        // an equally distant candidate with a lower index.
        if heap.len() == k && heap.peek().is_some_and(|worst| lower > worst.distance) {
            return;
        }

        let node = &self.nodes[id];
        match node.children {
            None => {
                for &i in &self.order[node.start..node.end] {
                    let candidate = Neighbor::new(i, haversine(query, &self.points[i]));
                    if heap.len() < k {
                        heap.push(candidate);
                    } else if heap.peek().is_some_and(|worst| candidate < *worst) {
                        heap.pop();
                        heap.push(candidate);
                    }
                }
            }
            Some((left, right)) => {
                let dl = self.lower_bound(left, query);
                let dr = self.lower_bound(right, query);
                if dl <= dr {
                    self.search_nearest(left, dl, query, k, heap);
                    self.search_nearest(right, dr, query, k, heap);
                } else {
                    self.search_nearest(right, dr, query, k, heap);
                    self.search_nearest(left, dl, query, k, heap);
                }
            }
        }
    }

    fn search_within(&self, id: usize, query: &[f64; 2], radius: f64, out: &mut Vec<Neighbor>) {
        if self.lower_bound(id, query) > radius {
            return;
        }

        let node = &self.nodes[id];
        match node.children {
            None => out.extend(
                self.order[node.start..node.end]
                    .iter()
                    .map(|&i| Neighbor::new(i, haversine(query, &self.points[i])))
                    .filter(|n| n.distance <= radius),
            ),
            Some((left, right)) => {
                self.search_within(left, query, radius, out);
                self.search_within(right, query, radius, out);
            }
        }
    }
}

impl SpatialIndex for BallTree {
    fn kind(&self) -> IndexKind {
        IndexKind::BallTree
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    fn nearest(&self, query: &[f64; 2], k: usize) -> Vec<Neighbor> {
        if self.nodes.is_empty() || k == 0 {
            return Vec::new();
        }
        let mut heap = BinaryHeap::with_capacity(k + 1);
        let lower = self.lower_bound(0, query);
        self.search_nearest(0, lower, query, k, &mut heap);
        heap.into_sorted_vec()
    }

    fn within(&self, query: &[f64; 2], radius: f64) -> Vec<Neighbor> {
        let mut out = Vec::new();
        if !self.nodes.is_empty() {
            self.search_within(0, query, radius, &mut out);
        }
        out.sort_unstable();
        out
    }
}

/// Mean of member coordinates. Any point works as a ball centre because the
/// radius is measured from it.
fn centroid(points: &[[f64; 2]], members: &[usize]) -> [f64; 2] {
    let n = members.len() as f64;
    let (lon, lat) = members.iter().fold((0.0, 0.0), |(lon, lat), &i| {
        (lon + points[i][0], lat + points[i][1])
    });
    [lon / n, lat / n]
}
