//! The agglomerative merge loop.
//!
//! Each round scores every pair of live clusters with the configured
//! [`Linkage`], picks the lowest finite score (first found wins ties), asks
//! the [`Checker`] for permission, and merges.
//!
//! # Caching
//!
//! Pair scores are memoized in a [`DistanceCache`] keyed by `(min, max)`
//! cluster index. When the linkage provides [`LanceWilliams`] coefficients,
//! a merge updates the cache in `O(clusters)` instead of rescanning items:
//!
//! 1. snapshot `d(i,k)`, `d(j,k)` for every other cluster `k`, and `d(i,j)`;
//! 2. merge in the data source;
//! 3. drop entries of the merged pair and move the relocated cluster's
//!    entries (if the source moved one) into the freed slot;
//! 4. write the recurrence result for the merged cluster against every
//!    survivor whose snapshot scores are finite. Other pairs stay uncached
//!    and are scored from items on the next lookup.
//!
//! Without coefficients the cache is discarded after each merge, so every
//! round recomputes from items.
//!
//! # Concurrency
//!
//! A run holds the only mutable borrow of the cluster set. Callers must not
//! mutate the underlying data through other channels (interior mutability,
//! shared handles) while clustering.

use super::checker::Checker;
use super::linkage::{LanceWilliams, Linkage};
use super::traits::{ClusterSet, Merge};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Memoized linkage scores keyed by unordered cluster-index pair.
#[derive(Debug, Clone, Default)]
pub struct DistanceCache {
    scores: HashMap<(usize, usize), f64>,
}

#[inline]
fn key(i: usize, j: usize) -> (usize, usize) {
    if i <= j {
        (i, j)
    } else {
        (j, i)
    }
}

impl DistanceCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached score between `i` and `j`, in either order.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.scores.get(&key(i, j)).copied()
    }

    /// Store the score between `i` and `j`.
    pub fn insert(&mut self, i: usize, j: usize, score: f64) {
        self.scores.insert(key(i, j), score);
    }

    /// Drop every entry that references `cluster`.
    pub fn forget(&mut self, cluster: usize) {
        self.scores.retain(|&(a, b), _| a != cluster && b != cluster);
    }

    /// Re-key every entry of `from` onto `to`, and drop whatever `to` held.
    pub fn relocate(&mut self, from: usize, to: usize) {
        self.forget(to);
        let moved: Vec<(usize, f64)> = self
            .scores
            .iter()
            .filter_map(|(&(a, b), &s)| match (a == from, b == from) {
                (true, false) => Some((b, s)),
                (false, true) => Some((a, s)),
                _ => None,
            })
            .collect();
        self.forget(from);
        for (other, score) in moved {
            self.insert(to, other, score);
        }
    }

    /// Number of cached pairs.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Score clusters `i` and `j` from scratch.
fn linkage_score<S, L>(clusters: &S, linkage: &mut L, i: usize, j: usize) -> f64
where
    S: ClusterSet + ?Sized,
    L: Linkage<S::Item> + ?Sized,
{
    linkage.reset();
    clusters.each_item(i, &mut |a| {
        clusters.each_item_distance(i, j, a, &mut |b, dist| linkage.put(a, b, dist));
    });
    linkage.get()
}

/// Cache-aware score between `i` and `j`.
fn cached_score<S, L>(
    clusters: &S,
    linkage: &mut L,
    cache: &mut Option<DistanceCache>,
    i: usize,
    j: usize,
) -> f64
where
    S: ClusterSet + ?Sized,
    L: Linkage<S::Item> + ?Sized,
{
    let (i, j) = key(i, j);
    if let Some(score) = cache.as_ref().and_then(|c| c.get(i, j)) {
        return score;
    }
    let score = linkage_score(clusters, linkage, i, j);
    if let Some(c) = cache.as_mut() {
        c.insert(i, j, score);
    }
    score
}

/// Agglomerative clustering over a borrowed [`ClusterSet`].
///
/// The cluster set is merged in place; partial progress is kept when the
/// checker stops the run early.
pub struct HierarchicalClustering<'a, S: ?Sized, C, L> {
    clusters: &'a mut S,
    checker: C,
    linkage: L,
    incremental: bool,
    cache: Option<DistanceCache>,
    merges: usize,
}

impl<'a, S, C, L> HierarchicalClustering<'a, S, C, L>
where
    S: ClusterSet + ?Sized,
    C: Checker<S>,
    L: Linkage<S::Item>,
{
    /// Prepare a run over `clusters`.
    pub fn new(clusters: &'a mut S, checker: C, linkage: L) -> Self {
        Self {
            clusters,
            checker,
            linkage,
            incremental: true,
            cache: None,
            merges: 0,
        }
    }

    /// Enable or disable score caching with Lance–Williams updates.
    ///
    /// Disabled, every score is recomputed from items each time it is
    /// needed. Results are the same up to floating-point rounding.
    pub fn with_incremental(mut self, incremental: bool) -> Self {
        self.incremental = incremental;
        if !incremental {
            self.cache = None;
        }
        self
    }

    /// The cluster set being merged.
    pub fn clusters(&self) -> &S {
        &*self.clusters
    }

    /// Number of merges performed so far.
    pub fn merges(&self) -> usize {
        self.merges
    }

    /// Current linkage score between live clusters `i` and `j`.
    pub fn distance(&mut self, i: usize, j: usize) -> f64 {
        if self.incremental && self.cache.is_none() {
            self.cache = Some(DistanceCache::new());
        }
        cached_score(
            &*self.clusters,
            &mut self.linkage,
            &mut self.cache,
            i,
            j,
        )
    }

    /// Merge clusters until one remains or the checker says stop.
    ///
    /// Returns the number of merges performed by this call.
    pub fn run(&mut self) -> usize {
        let start = self.merges;
        while self.clusters.count() > 1 {
            if !self.merge_next() {
                break;
            }
        }
        debug!(
            merges = self.merges - start,
            clusters = self.clusters.count(),
            "clustering finished"
        );
        self.merges - start
    }

    /// Find the best pair, consult the checker, and merge it.
    ///
    /// Returns `false` when there is no pair with a finite score or the
    /// checker declines; nothing is merged in that case.
    pub fn merge_next(&mut self) -> bool {
        if self.incremental && self.cache.is_none() {
            self.cache = Some(DistanceCache::new());
        }

        let Some((i, j, score)) = self.best_pair() else {
            return false;
        };

        if !self.checker.check(&*self.clusters, i, j, score) {
            return false;
        }

        let recurrence = match self.cache {
            Some(_) => {
                let size_i = self.clusters.cluster_size(i);
                let size_j = self.clusters.cluster_size(j);
                self.linkage.lance_williams(size_i, size_j)
            }
            None => None,
        };

        let merge = match recurrence {
            Some(lw) => self.merge_and_update(i, j, lw),
            None => {
                self.cache = None;
                self.clusters.merge(i, j)
            }
        };

        self.merges += 1;
        trace!(
            i,
            j,
            score,
            kept = merge.kept,
            swapped_in = merge.swapped_in,
            "merged"
        );
        true
    }

    /// Lowest finite score over all live pairs, first found on ties.
    fn best_pair(&mut self) -> Option<(usize, usize, f64)> {
        let Self {
            clusters,
            linkage,
            cache,
            ..
        } = self;
        let clusters: &S = &**clusters;

        let mut best: Option<(usize, usize, f64)> = None;
        clusters.each_cluster(None, &mut |c1| {
            clusters.each_cluster(Some(c1), &mut |c2| {
                let score = cached_score(clusters, linkage, cache, c1, c2);
                if !score.is_finite() {
                    return;
                }
                if best.map_or(true, |(_, _, b)| score < b) {
                    best = Some((c1, c2, score));
                }
            });
        });
        best
    }

    fn merge_and_update(&mut self, i: usize, j: usize, lw: LanceWilliams) -> Merge {
        let mut others = Vec::with_capacity(self.clusters.count());
        self.clusters.each_cluster(None, &mut |k| {
            if k != i && k != j {
                others.push(k);
            }
        });

        let snapshot: Vec<(usize, f64, f64)> = others
            .into_iter()
            .map(|k| (k, self.distance(i, k), self.distance(j, k)))
            .collect();
        let d_ij = self.distance(i, j);

        let merge = self.clusters.merge(i, j);
        let freed = if merge.kept == i { j } else { i };

        let cache = self.cache.get_or_insert_with(DistanceCache::new);
        cache.forget(i);
        cache.forget(j);
        if merge.swapped_in != freed {
            cache.relocate(merge.swapped_in, freed);
        }

        for (k, d_ik, d_jk) in snapshot {
            // Infinite inputs make the recurrence NaN; leave the pair uncached
            // so the next lookup scores it from items.
            if !(d_ik.is_finite() && d_jk.is_finite()) {
                continue;
            }
            let k = if k == merge.swapped_in { freed } else { k };
            cache.insert(merge.kept, k, lw.update(d_ik, d_jk, d_ij));
        }
        merge
    }
}

/// Cluster `clusters` in place until one cluster remains or `checker`
/// stops the run.
///
/// Returns the number of merges performed.
pub fn cluster<S, C, L>(clusters: &mut S, checker: C, linkage: L) -> usize
where
    S: ClusterSet + ?Sized,
    C: Checker<S>,
    L: Linkage<S::Item>,
{
    HierarchicalClustering::new(clusters, checker, linkage).run()
}
