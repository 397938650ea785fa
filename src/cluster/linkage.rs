//! Linkage strategies: how a pair of clusters is scored.
//!
//! A strategy is a small accumulator. The engine calls [`Linkage::reset`],
//! streams every cross-cluster item distance through [`Linkage::put`], then
//! reads the score with [`Linkage::get`]. Lower scores merge first.
//!
//! # Lance–Williams updates
//!
//! Once two clusters `i` and `j` are merged, the distance from the merged
//! cluster to any other cluster `k` can be derived from pre-merge scores
//! without rescanning items:
//!
//! ```text
//! d(i∪j, k) = αᵢ·d(i,k) + αⱼ·d(j,k) + β·d(i,j) + γ·|d(i,k) − d(j,k)|
//! ```
//!
//! | Linkage | αᵢ | αⱼ | β | γ |
//! |---------|----|----|---|---|
//! | Single | ½ | ½ | 0 | −½ |
//! | Complete | ½ | ½ | 0 | ½ |
//! | Average (UPGMA) | nᵢ/(nᵢ+nⱼ) | nⱼ/(nᵢ+nⱼ) | 0 | 0 |
//! | Weighted (WPGMA) | ½ | ½ | 0 | 0 |
//!
//! A strategy without a recurrence returns `None` from
//! [`Linkage::lance_williams`], and the engine falls back to recomputing
//! every score from items on each round.

use crate::error::{Error, Result};
use core::fmt;
use core::str::FromStr;

/// Lance–Williams recurrence coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LanceWilliams {
    /// Weight of `d(i,k)`.
    pub alpha_i: f64,
    /// Weight of `d(j,k)`.
    pub alpha_j: f64,
    /// Weight of `d(i,j)`.
    pub beta: f64,
    /// Weight of `|d(i,k) − d(j,k)|`.
    pub gamma: f64,
}

impl LanceWilliams {
    /// Create a coefficient set.
    pub const fn new(alpha_i: f64, alpha_j: f64, beta: f64, gamma: f64) -> Self {
        Self {
            alpha_i,
            alpha_j,
            beta,
            gamma,
        }
    }

    /// Distance from the merged cluster `i∪j` to `k`.
    #[inline]
    pub fn update(&self, d_ik: f64, d_jk: f64, d_ij: f64) -> f64 {
        self.alpha_i * d_ik
            + self.alpha_j * d_jk
            + self.beta * d_ij
            + self.gamma * (d_ik - d_jk).abs()
    }
}

/// Scores a candidate cluster pair from its item-pair distances.
pub trait Linkage<T: ?Sized> {
    /// Clear all accumulated state.
    fn reset(&mut self);

    /// Observe the distance between `item1` (left cluster) and `item2`
    /// (right cluster).
    fn put(&mut self, item1: &T, item2: &T, dist: f64);

    /// Score of everything observed since the last reset.
    ///
    /// A pair with no observations scores `f64::INFINITY`, which is never
    /// selected for merging.
    fn get(&self) -> f64;

    /// Recurrence coefficients for merging clusters of `size_i` and
    /// `size_j` items, or `None` to force full recomputation.
    fn lance_williams(&self, size_i: usize, size_j: usize) -> Option<LanceWilliams>;
}

impl<T: ?Sized, L: Linkage<T> + ?Sized> Linkage<T> for Box<L> {
    fn reset(&mut self) {
        (**self).reset();
    }

    fn put(&mut self, item1: &T, item2: &T, dist: f64) {
        (**self).put(item1, item2, dist);
    }

    fn get(&self) -> f64 {
        (**self).get()
    }

    fn lance_williams(&self, size_i: usize, size_j: usize) -> Option<LanceWilliams> {
        (**self).lance_williams(size_i, size_j)
    }
}

impl<T: ?Sized, L: Linkage<T> + ?Sized> Linkage<T> for &mut L {
    fn reset(&mut self) {
        (**self).reset();
    }

    fn put(&mut self, item1: &T, item2: &T, dist: f64) {
        (**self).put(item1, item2, dist);
    }

    fn get(&self) -> f64 {
        (**self).get()
    }

    fn lance_williams(&self, size_i: usize, size_j: usize) -> Option<LanceWilliams> {
        (**self).lance_williams(size_i, size_j)
    }
}

/// Complete linkage: the maximum item-pair distance.
///
/// Produces compact clusters; a single far-apart pair keeps two clusters
/// separate.
#[derive(Debug, Clone, Default)]
pub struct CompleteLinkage {
    max: Option<f64>,
}

impl CompleteLinkage {
    /// Create a complete-linkage accumulator.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: ?Sized> Linkage<T> for CompleteLinkage {
    fn reset(&mut self) {
        self.max = None;
    }

    fn put(&mut self, _item1: &T, _item2: &T, dist: f64) {
        self.max = Some(match self.max {
            Some(max) if max >= dist => max,
            _ => dist,
        });
    }

    fn get(&self) -> f64 {
        self.max.unwrap_or(f64::INFINITY)
    }

    fn lance_williams(&self, _size_i: usize, _size_j: usize) -> Option<LanceWilliams> {
        Some(LanceWilliams::new(0.5, 0.5, 0.0, 0.5))
    }
}

/// Single linkage: the minimum item-pair distance.
///
/// Prone to chaining: one close pair is enough to join two clusters.
#[derive(Debug, Clone, Default)]
pub struct SingleLinkage {
    min: Option<f64>,
}

impl SingleLinkage {
    /// Create a single-linkage accumulator.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: ?Sized> Linkage<T> for SingleLinkage {
    fn reset(&mut self) {
        self.min = None;
    }

    fn put(&mut self, _item1: &T, _item2: &T, dist: f64) {
        self.min = Some(match self.min {
            Some(min) if min <= dist => min,
            _ => dist,
        });
    }

    fn get(&self) -> f64 {
        self.min.unwrap_or(f64::INFINITY)
    }

    fn lance_williams(&self, _size_i: usize, _size_j: usize) -> Option<LanceWilliams> {
        Some(LanceWilliams::new(0.5, 0.5, 0.0, -0.5))
    }
}

/// Average linkage: the mean item-pair distance.
///
/// The unweighted form (UPGMA) weights the recurrence by cluster sizes, so
/// scores stay equal to the true mean over all item pairs. The weighted form
/// (WPGMA) treats each merged cluster as one unit regardless of size.
#[derive(Debug, Clone, Default)]
pub struct AverageLinkage {
    sum: f64,
    pairs: usize,
    weighted: bool,
}

impl AverageLinkage {
    /// Unweighted average linkage (UPGMA).
    pub fn new() -> Self {
        Self::default()
    }

    /// Weighted average linkage (WPGMA).
    pub fn weighted() -> Self {
        Self {
            weighted: true,
            ..Self::default()
        }
    }

    /// Whether this is the WPGMA variant.
    pub fn is_weighted(&self) -> bool {
        self.weighted
    }
}

impl<T: ?Sized> Linkage<T> for AverageLinkage {
    fn reset(&mut self) {
        self.sum = 0.0;
        self.pairs = 0;
    }

    fn put(&mut self, _item1: &T, _item2: &T, dist: f64) {
        self.sum += dist;
        self.pairs += 1;
    }

    fn get(&self) -> f64 {
        if self.pairs == 0 {
            return f64::INFINITY;
        }
        self.sum / self.pairs as f64
    }

    fn lance_williams(&self, size_i: usize, size_j: usize) -> Option<LanceWilliams> {
        if self.weighted {
            return Some(LanceWilliams::new(0.5, 0.5, 0.0, 0.0));
        }
        let total = (size_i + size_j) as f64;
        if total == 0.0 {
            return None;
        }
        Some(LanceWilliams::new(
            size_i as f64 / total,
            size_j as f64 / total,
            0.0,
            0.0,
        ))
    }
}

/// Built-in linkage methods, selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Single linkage: minimum distance between clusters.
    Single,
    /// Complete linkage: maximum distance between clusters.
    Complete,
    /// Average linkage (UPGMA): mean distance, size-weighted updates.
    Average,
    /// Weighted average linkage (WPGMA): mean distance, equal-weight updates.
    Weighted,
}

impl Method {
    /// All built-in methods.
    pub const ALL: [Method; 4] = [
        Method::Single,
        Method::Complete,
        Method::Average,
        Method::Weighted,
    ];

    /// Canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Method::Single => "single",
            Method::Complete => "complete",
            Method::Average => "average",
            Method::Weighted => "weighted",
        }
    }

    /// Build a fresh accumulator for this method.
    pub fn linkage(self) -> AnyLinkage {
        match self {
            Method::Single => AnyLinkage::Single(SingleLinkage::new()),
            Method::Complete => AnyLinkage::Complete(CompleteLinkage::new()),
            Method::Average => AnyLinkage::Average(AverageLinkage::new()),
            Method::Weighted => AnyLinkage::Average(AverageLinkage::weighted()),
        }
    }
}

/// A built-in linkage chosen at runtime, see [`Method::linkage`].
#[derive(Debug, Clone)]
pub enum AnyLinkage {
    /// Minimum distance.
    Single(SingleLinkage),
    /// Maximum distance.
    Complete(CompleteLinkage),
    /// Mean distance, weighted or not.
    Average(AverageLinkage),
}

impl<T: ?Sized> Linkage<T> for AnyLinkage {
    fn reset(&mut self) {
        match self {
            AnyLinkage::Single(l) => Linkage::<T>::reset(l),
            AnyLinkage::Complete(l) => Linkage::<T>::reset(l),
            AnyLinkage::Average(l) => Linkage::<T>::reset(l),
        }
    }

    fn put(&mut self, item1: &T, item2: &T, dist: f64) {
        match self {
            AnyLinkage::Single(l) => Linkage::<T>::put(l, item1, item2, dist),
            AnyLinkage::Complete(l) => Linkage::<T>::put(l, item1, item2, dist),
            AnyLinkage::Average(l) => Linkage::<T>::put(l, item1, item2, dist),
        }
    }

    fn get(&self) -> f64 {
        match self {
            AnyLinkage::Single(l) => Linkage::<T>::get(l),
            AnyLinkage::Complete(l) => Linkage::<T>::get(l),
            AnyLinkage::Average(l) => Linkage::<T>::get(l),
        }
    }

    fn lance_williams(&self, size_i: usize, size_j: usize) -> Option<LanceWilliams> {
        match self {
            AnyLinkage::Single(l) => Linkage::<T>::lance_williams(l, size_i, size_j),
            AnyLinkage::Complete(l) => Linkage::<T>::lance_williams(l, size_i, size_j),
            AnyLinkage::Average(l) => Linkage::<T>::lance_williams(l, size_i, size_j),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" | "min" => Ok(Method::Single),
            "complete" | "max" => Ok(Method::Complete),
            "average" | "upgma" => Ok(Method::Average),
            "weighted" | "wpgma" => Ok(Method::Weighted),
            _ => Err(Error::UnknownLinkage(s.to_string())),
        }
    }
}
