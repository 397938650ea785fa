//! The data-source contract consumed by the clustering engine.

use std::hash::Hash;

/// Outcome of [`ClusterSet::merge`].
///
/// After a merge the live indices are `0..count()` again. `kept` holds the
/// merged cluster. `swapped_in` is the index that stopped being live: if it
/// differs from the member of the merged pair that was not kept, the cluster
/// that used to live at `swapped_in` has moved into that freed slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Merge {
    /// Index now holding the merged cluster.
    pub kept: usize,
    /// Index that is no longer live (and whose cluster, if any, moved).
    pub swapped_in: usize,
}

/// A user-supplied collection of clusters.
///
/// Clusters are identified by dense indices `0..count()`. Indices are not
/// stable identities: a merge may move some other live cluster into the
/// freed index. Items are opaque tokens only ever compared and hashed.
///
/// Implementors must enumerate in a deterministic order within a run, and
/// must not be mutated by anything but the engine while a run is in
/// progress. Neither is checked.
pub trait ClusterSet {
    /// Item identity within clusters.
    type Item: Eq + Hash + Clone;

    /// Number of live clusters.
    fn count(&self) -> usize;

    /// Visit every live cluster index "after" `start`.
    ///
    /// `None` visits all clusters.
    fn each_cluster(&self, start: Option<usize>, visit: &mut dyn FnMut(usize));

    /// Visit every item of `cluster`.
    fn each_item(&self, cluster: usize, visit: &mut dyn FnMut(&Self::Item));

    /// Distance between `item1` (in `c1`) and `item2` (in `c2`).
    fn distance(&self, c1: usize, c2: usize, item1: &Self::Item, item2: &Self::Item) -> f64;

    /// Merge clusters `i` and `j`, reducing `count()` by one.
    ///
    /// `i` and `j` are distinct live indices; implementations may panic
    /// otherwise. The engine never asks to merge a cluster with itself.
    fn merge(&mut self, i: usize, j: usize) -> Merge;

    /// Visit `(item2, distance)` for every item of `c2` against `item1` of `c1`.
    ///
    /// Override this to amortize per-`item1` setup across a whole cluster.
    /// The provided body is equivalent to calling [`ClusterSet::distance`]
    /// once per item of `c2`.
    fn each_item_distance(
        &self,
        c1: usize,
        c2: usize,
        item1: &Self::Item,
        visit: &mut dyn FnMut(&Self::Item, f64),
    ) {
        self.each_item(c2, &mut |item2| {
            let dist = self.distance(c1, c2, item1, item2);
            visit(item2, dist);
        });
    }

    /// Number of items in `cluster`.
    fn cluster_size(&self, cluster: usize) -> usize {
        let mut n = 0;
        self.each_item(cluster, &mut |_| n += 1);
        n
    }
}
