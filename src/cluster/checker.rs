//! Stopping criteria.
//!
//! A [`Checker`] is consulted before every prospective merge with the two
//! candidate cluster indices and their linkage score. Returning `false`
//! ends the run and the candidate merge is discarded.
//!
//! Criteria compose by wrapping: [`TreeLog`] decorates any other checker
//! without changing its decision. Any closure with the right shape is also
//! a checker, which is how callers record a merge tree:
//!
//! ```rust
//! use hclust::{cluster, CompleteLinkage, DistanceMap};
//!
//! let mut set = DistanceMap::new([("a", vec![("b", 0.2)]), ("b", vec![("c", 0.5)])]);
//! let mut heights = Vec::new();
//! cluster(
//!     &mut set,
//!     |_: &DistanceMap<&str>, _i: usize, _j: usize, score: f64| {
//!         heights.push(score);
//!         true
//!     },
//!     CompleteLinkage::new(),
//! );
//! assert_eq!(heights, vec![0.2, 1.0]);
//! ```

use super::traits::ClusterSet;
use std::fmt;
use tracing::{debug, info};

/// Decides whether the engine may perform the next merge.
pub trait Checker<S: ?Sized> {
    /// Return `true` to merge clusters `i` and `j` (scored `next_score`),
    /// `false` to stop clustering.
    fn check(&mut self, clusters: &S, i: usize, j: usize, next_score: f64) -> bool;
}

impl<S: ?Sized, F> Checker<S> for F
where
    F: FnMut(&S, usize, usize, f64) -> bool,
{
    fn check(&mut self, clusters: &S, i: usize, j: usize, next_score: f64) -> bool {
        self(clusters, i, j, next_score)
    }
}

/// Continue while the next merge score is at most the limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold(pub f64);

impl<S: ?Sized> Checker<S> for Threshold {
    fn check(&mut self, _clusters: &S, _i: usize, _j: usize, next_score: f64) -> bool {
        next_score <= self.0
    }
}

/// Continue while more than `limit` clusters remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxClusters(pub usize);

impl<S: ClusterSet + ?Sized> Checker<S> for MaxClusters {
    fn check(&mut self, clusters: &S, _i: usize, _j: usize, _next_score: f64) -> bool {
        clusters.count() > self.0
    }
}

/// Traces every decision of the wrapped checker.
///
/// Accepted merges are logged at `DEBUG` together with the whole cluster
/// set, the final stop at `INFO`. The decision is passed through unchanged.
#[derive(Debug, Clone)]
pub struct TreeLog<C> {
    inner: C,
}

impl<C> TreeLog<C> {
    /// Wrap `inner`.
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    /// Unwrap the decorated checker.
    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<S, C> Checker<S> for TreeLog<C>
where
    S: ClusterSet + fmt::Debug + ?Sized,
    C: Checker<S>,
{
    fn check(&mut self, clusters: &S, i: usize, j: usize, next_score: f64) -> bool {
        let proceed = self.inner.check(clusters, i, j, next_score);
        if proceed {
            debug!(
                i,
                j,
                score = next_score,
                clusters = clusters.count(),
                set = ?clusters,
                "merge"
            );
        } else {
            info!(i, j, score = next_score, clusters = clusters.count(), "stop");
        }
        proceed
    }
}
