//! Agglomerative clustering over caller-supplied cluster sets.
//!
//! The engine never sees raw data. It talks to a [`ClusterSet`] that can
//! enumerate clusters and items, measure item-pair distances, and merge two
//! clusters. Everything else is pluggable:
//!
//! - a [`Linkage`] turns item-pair distances into one score per cluster pair;
//! - a [`Checker`] decides, before each merge, whether clustering goes on.
//!
//! ## The Loop
//!
//! Start from whatever clusters the set holds (usually singletons). Each
//! round:
//!
//! 1. score every pair of live clusters with the linkage;
//! 2. take the lowest finite score (first pair found on ties);
//! 3. ask the checker; stop if it declines;
//! 4. merge, and update cached scores.
//!
//! The count of clusters drops by exactly one per merge. The run ends when
//! one cluster is left or the checker stops it.
//!
//! ## Linkage Methods
//!
//! | Linkage | Distance | Effect |
//! |---------|----------|--------|
//! | Single | min(pairwise) | Chaining; elongated clusters |
//! | Complete | max(pairwise) | Compact, spherical clusters |
//! | Average (UPGMA) | mean(pairwise) | Balanced compromise |
//! | Weighted (WPGMA) | mean, merged clusters weighted equally | Ignores cluster size |
//!
//! All four supply Lance–Williams coefficients, so after the first round
//! each merge costs `O(clusters)` score updates rather than a rescan of
//! every item pair.
//!
//! ## Cluster Indices
//!
//! Cluster indices are dense (`0..count()`) and **not** stable: a merge
//! frees one index, and the set may move some other live cluster into it to
//! keep indices dense. [`Merge`] reports what happened so the engine can
//! re-key its cache. A merge tree, if you want one, is recorded from the
//! checker hook.
//!
//! ## Usage
//!
//! ```rust
//! use hclust::cluster::{cluster, ClusterSet, CompleteLinkage, DistanceMap, Threshold};
//!
//! // The map may be asymmetric: (b, a) is looked up when (a, b) is missing.
//! let mut set = DistanceMap::new([
//!     ("a", vec![("b", 0.0), ("c", 0.0), ("d", 1.0), ("e", 0.4)]),
//!     ("b", vec![("c", 0.1), ("d", 0.9), ("e", 0.4)]),
//!     ("c", vec![("d", 0.9), ("e", 0.2)]),
//!     ("d", vec![("e", 0.1)]),
//! ]);
//!
//! cluster(&mut set, Threshold(0.4), CompleteLinkage::new());
//!
//! assert_eq!(set.count(), 2);
//! assert_eq!(set.items(0), &["a", "b", "c"]);
//! assert_eq!(set.items(1), &["e", "d"]);
//! ```

mod checker;
mod distance_map;
mod engine;
mod linkage;
mod traits;

pub use checker::{Checker, MaxClusters, Threshold, TreeLog};
pub use distance_map::{DistanceMap, DEFAULT_DISTANCE};
pub use engine::{cluster, DistanceCache, HierarchicalClustering};
pub use linkage::{
    AnyLinkage, AverageLinkage, CompleteLinkage, LanceWilliams, Linkage, Method, SingleLinkage,
};
pub use traits::{ClusterSet, Merge};
