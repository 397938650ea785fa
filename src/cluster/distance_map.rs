//! In-memory cluster set backed by a map of item-pair distances.

use super::traits::{ClusterSet, Merge};
use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

/// Distance reported for item pairs missing from the map in both orders.
pub const DEFAULT_DISTANCE: f64 = 1.0;

/// A [`ClusterSet`] over an adjacency map `item -> (item -> distance)`.
///
/// The map does not need to be symmetric: a missing `(a, b)` entry is looked
/// up as `(b, a)`, and [`DEFAULT_DISTANCE`] is used when neither exists.
/// Every distinct item, outer or inner key, starts as a singleton cluster in
/// first-seen order.
///
/// Merging removes the higher index of the pair and moves the last cluster
/// into its slot, so indices stay dense.
#[derive(Debug, Clone)]
pub struct DistanceMap<T> {
    data: HashMap<T, HashMap<T, f64>>,
    clusters: Vec<Vec<T>>,
}

impl<T: Eq + Hash + Clone> DistanceMap<T> {
    /// Build a cluster set from `(item, [(other, distance), ..])` rows.
    ///
    /// Rows repeating an outer key are combined; a later distance for the
    /// same pair replaces the earlier one.
    pub fn new<I, J>(rows: I) -> Self
    where
        I: IntoIterator<Item = (T, J)>,
        J: IntoIterator<Item = (T, f64)>,
    {
        let mut data: HashMap<T, HashMap<T, f64>> = HashMap::new();
        let mut seen = HashSet::new();
        let mut clusters = Vec::new();

        for (from, row) in rows {
            if seen.insert(from.clone()) {
                clusters.push(vec![from.clone()]);
            }
            let entry = data.entry(from).or_default();
            for (to, dist) in row {
                if seen.insert(to.clone()) {
                    clusters.push(vec![to.clone()]);
                }
                entry.insert(to, dist);
            }
        }

        Self { data, clusters }
    }

    /// Like [`DistanceMap::new`], but rejects NaN and infinite distances.
    pub fn try_new<I, J>(rows: I) -> Result<Self>
    where
        T: fmt::Debug,
        I: IntoIterator<Item = (T, J)>,
        J: IntoIterator<Item = (T, f64)>,
    {
        let map = Self::new(rows);
        for (from, row) in &map.data {
            if let Some((to, &distance)) = row.iter().find(|(_, d)| !d.is_finite()) {
                return Err(Error::NonFiniteDistance {
                    from: format!("{from:?}"),
                    to: format!("{to:?}"),
                    distance,
                });
            }
        }
        Ok(map)
    }

    /// Members of every live cluster, indexed by cluster.
    pub fn clusters(&self) -> &[Vec<T>] {
        &self.clusters
    }

    /// Members of one cluster.
    pub fn items(&self, cluster: usize) -> &[T] {
        &self.clusters[cluster]
    }

    /// Total number of items across all clusters.
    pub fn item_count(&self) -> usize {
        self.clusters.iter().map(Vec::len).sum()
    }

    fn lookup(&self, row: Option<&HashMap<T, f64>>, item1: &T, item2: &T) -> f64 {
        row.and_then(|r| r.get(item2))
            .or_else(|| self.data.get(item2).and_then(|r| r.get(item1)))
            .copied()
            .unwrap_or(DEFAULT_DISTANCE)
    }
}

impl<T: Eq + Hash + Clone> ClusterSet for DistanceMap<T> {
    type Item = T;

    fn count(&self) -> usize {
        self.clusters.len()
    }

    fn each_cluster(&self, start: Option<usize>, visit: &mut dyn FnMut(usize)) {
        let first = start.map_or(0, |s| s + 1);
        for cluster in first..self.clusters.len() {
            visit(cluster);
        }
    }

    fn each_item(&self, cluster: usize, visit: &mut dyn FnMut(&T)) {
        for item in &self.clusters[cluster] {
            visit(item);
        }
    }

    fn distance(&self, _c1: usize, _c2: usize, item1: &T, item2: &T) -> f64 {
        self.lookup(self.data.get(item1), item1, item2)
    }

    fn each_item_distance(
        &self,
        _c1: usize,
        c2: usize,
        item1: &T,
        visit: &mut dyn FnMut(&T, f64),
    ) {
        // One row lookup per left item instead of one per pair.
        let row = self.data.get(item1);
        for item2 in &self.clusters[c2] {
            visit(item2, self.lookup(row, item1, item2));
        }
    }

    fn merge(&mut self, i: usize, j: usize) -> Merge {
        assert_ne!(i, j, "cannot merge a cluster with itself");
        let (i, j) = if j < i { (j, i) } else { (i, j) };

        let last = self.clusters.len() - 1;
        let moved = self.clusters.swap_remove(j);
        self.clusters[i].extend(moved);

        Merge {
            kept: i,
            swapped_in: last,
        }
    }

    fn cluster_size(&self, cluster: usize) -> usize {
        self.clusters[cluster].len()
    }
}
