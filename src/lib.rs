//! # hclust
//!
//! Agglomerative (bottom-up) hierarchical clustering over any data source.
//!
//! Callers implement [`ClusterSet`] for their data, pick a [`Linkage`] and a
//! stopping [`Checker`], and call [`cluster`]. The set is merged in place:
//! the closest pair of clusters is joined, round after round, until one
//! cluster remains or the checker stops the run.
//!
//! Scores between clusters are cached and updated with the Lance–Williams
//! recurrence after each merge, so only the first round scans item pairs.
//!
//! [`DistanceMap`] is a ready-made [`ClusterSet`] over an in-memory map of
//! item-pair distances.

pub mod cluster;
/// Error types used across `hclust`.
pub mod error;

#[cfg(test)]
mod clustering_tests;

pub use cluster::{
    cluster, AnyLinkage, AverageLinkage, Checker, ClusterSet, CompleteLinkage, DistanceCache,
    DistanceMap, HierarchicalClustering, LanceWilliams, Linkage, MaxClusters, Merge, Method,
    SingleLinkage, Threshold, TreeLog, DEFAULT_DISTANCE,
};
pub use error::{Error, Result};
