//! Logical time for the versioned runtime.
//!
//! This module defines:
//! - [`Version`]: a point in the partially ordered logical-time lattice. A
//!   version is a non-empty tuple of integers ordered pointwise, so `[1, 0]`
//!   and `[0, 1]` are incomparable while `[0, 0]` precedes both.
//! - [`Antichain`]: a *frontier* — a minimal set of versions such that no
//!   element is less-or-equal to another. A frontier `F` **covers** a version
//!   `v` when some element of `F` is `<= v`, meaning data at `v` may still
//!   arrive. Once a frontier stops covering `v`, every operator holding that
//!   frontier knows `v` is complete.
//!
//! Iteration scopes append a coordinate to every version in flight
//! ([`Version::extend`]) and strip it again on the way out
//! ([`Version::truncate`]); the feedback edge advances the innermost
//! coordinate ([`Version::apply_step`]).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A point in the logical-time lattice: a tuple of integers, dimension >= 1,
/// partially ordered by pointwise `<=`.
///
/// Versions are value types: they are created when data is produced and never
/// mutated. All lattice operations return new versions.
///
/// # Example
/// ```
/// use deltaflow::Version;
///
/// let a = Version::from([0, 1]);
/// let b = Version::from([1, 0]);
/// assert!(!a.less_equal(&b));
/// assert!(!b.less_equal(&a));
/// assert_eq!(a.join(&b), Version::from([1, 1]));
/// assert_eq!(a.meet(&b), Version::from([0, 0]));
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version(Vec<u64>);

impl Version {
    /// Build a version from its coordinates.
    ///
    /// # Panics
    /// Panics if `coords` is empty: versions always have dimension >= 1.
    pub fn new(coords: impl Into<Vec<u64>>) -> Self {
        let coords = coords.into();
        assert!(!coords.is_empty(), "a version needs at least one coordinate");
        Self(coords)
    }

    /// The zero version of the given dimension, the bottom of the lattice.
    pub fn root(dimensions: usize) -> Self {
        Self::new(vec![0; dimensions])
    }

    /// The raw coordinates.
    pub fn coords(&self) -> &[u64] {
        &self.0
    }

    /// Number of coordinates.
    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    /// Pointwise `<=`.
    ///
    /// # Panics
    /// Panics on dimension mismatch: versions from different scopes must not
    /// be compared.
    pub fn less_equal(&self, other: &Self) -> bool {
        assert_eq!(
            self.0.len(),
            other.0.len(),
            "cannot compare versions of different dimension ({:?} vs {:?})",
            self,
            other
        );
        self.0.iter().zip(&other.0).all(|(a, b)| a <= b)
    }

    /// Strict pointwise order: `<=` and not equal.
    pub fn less_than(&self, other: &Self) -> bool {
        self.less_equal(other) && self != other
    }

    /// Least upper bound: pointwise maximum.
    pub fn join(&self, other: &Self) -> Self {
        assert_eq!(self.0.len(), other.0.len(), "join of mismatched dimensions");
        Self(self.0.iter().zip(&other.0).map(|(a, b)| *a.max(b)).collect())
    }

    /// Greatest lower bound: pointwise minimum.
    pub fn meet(&self, other: &Self) -> Self {
        assert_eq!(self.0.len(), other.0.len(), "meet of mismatched dimensions");
        Self(self.0.iter().zip(&other.0).map(|(a, b)| *a.min(b)).collect())
    }

    /// Enter an iteration scope: append a zero coordinate.
    pub fn extend(&self) -> Self {
        let mut coords = self.0.clone();
        coords.push(0);
        Self(coords)
    }

    /// Leave an iteration scope: drop the innermost coordinate.
    ///
    /// # Panics
    /// Panics if the version is one-dimensional; there is no outer scope to
    /// return to.
    pub fn truncate(&self) -> Self {
        assert!(self.0.len() > 1, "cannot truncate a one-dimensional version");
        Self(self.0[..self.0.len() - 1].to_vec())
    }

    /// Advance the innermost coordinate, used by the feedback edge to move
    /// data to the next iteration sub-step.
    pub fn apply_step(&self, step: u64) -> Self {
        let mut coords = self.0.clone();
        *coords.last_mut().expect("versions are non-empty") += step;
        Self(coords)
    }

    /// The least version `>= self` that is also `>=` some element of
    /// `frontier`: `min` over `frontier` of `self.join(element)`.
    ///
    /// Once `frontier` is an operator's output frontier, `self` and
    /// `self.advance_by(frontier)` are indistinguishable to every future
    /// reconstruction, which is what makes index compaction safe.
    ///
    /// An empty frontier leaves the version unchanged.
    pub fn advance_by(&self, frontier: &Antichain) -> Self {
        let mut result = self.clone();
        let mut first = true;
        for element in frontier.elements() {
            let candidate = self.join(element);
            result = if first { candidate } else { result.meet(&candidate) };
            first = false;
        }
        result
    }

    /// A total order extending the pointwise partial order, used wherever
    /// completed versions must be processed in a consistent linear sequence.
    pub fn lex_cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl From<u64> for Version {
    fn from(coord: u64) -> Self {
        Self(vec![coord])
    }
}

impl<const N: usize> From<[u64; N]> for Version {
    fn from(coords: [u64; N]) -> Self {
        Self::new(coords.to_vec())
    }
}

impl From<Vec<u64>> for Version {
    fn from(coords: Vec<u64>) -> Self {
        Self::new(coords)
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{:?}", self.0)
    }
}

/// A frontier: an antichain of versions.
///
/// Constructed from any candidate set by dropping dominated elements, so two
/// frontiers describing the same down-set compare equal. The empty antichain
/// is the top of the lattice — it covers nothing, meaning every version is
/// complete; closing a producer handle advances its frontier to this value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Antichain {
    elements: Vec<Version>,
}

impl Antichain {
    /// Build a frontier from a candidate set, removing dominated elements and
    /// duplicates. The survivors are kept in a canonical (lexicographic)
    /// order so structural equality is semantic equality.
    pub fn new(candidates: Vec<Version>) -> Self {
        let mut elements: Vec<Version> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if elements.iter().any(|kept| kept.less_equal(&candidate)) {
                continue;
            }
            elements.retain(|kept| !candidate.less_equal(kept));
            elements.push(candidate);
        }
        elements.sort_by(|a, b| a.lex_cmp(b));
        Self { elements }
    }

    /// The top of the lattice: covers nothing.
    pub fn empty() -> Self {
        Self { elements: Vec::new() }
    }

    /// The minimal elements, in canonical order.
    pub fn elements(&self) -> &[Version] {
        &self.elements
    }

    /// True for the top of the lattice.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// True while data at `version` may still arrive: some element is
    /// `<= version`.
    pub fn covers(&self, version: &Version) -> bool {
        self.elements.iter().any(|element| element.less_equal(version))
    }

    /// Frontier dominance: `self <= other` when every element of `other` is
    /// `>=` some element of `self`. This is the order under which output
    /// frontiers must be monotone.
    pub fn less_equal(&self, other: &Antichain) -> bool {
        other
            .elements
            .iter()
            .all(|later| self.elements.iter().any(|earlier| earlier.less_equal(later)))
    }

    /// Greatest lower bound of two frontiers: the union of their elements,
    /// re-minimized. A binary operator's combined input frontier is the meet
    /// of its per-input frontiers.
    pub fn meet(&self, other: &Antichain) -> Antichain {
        let mut candidates = self.elements.clone();
        candidates.extend(other.elements.iter().cloned());
        Antichain::new(candidates)
    }

    /// Enter an iteration scope: extend every element.
    pub fn extend(&self) -> Antichain {
        Antichain::new(self.elements.iter().map(Version::extend).collect())
    }

    /// Leave an iteration scope: truncate every element.
    pub fn truncate(&self) -> Antichain {
        Antichain::new(self.elements.iter().map(Version::truncate).collect())
    }

    /// Advance the innermost coordinate of every element.
    pub fn apply_step(&self, step: u64) -> Antichain {
        Antichain::new(self.elements.iter().map(|v| v.apply_step(step)).collect())
    }
}

impl From<Version> for Antichain {
    fn from(version: Version) -> Self {
        Antichain::new(vec![version])
    }
}

impl<const N: usize> From<[u64; N]> for Antichain {
    fn from(coords: [u64; N]) -> Self {
        Antichain::from(Version::from(coords))
    }
}

impl fmt::Debug for Antichain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.elements).finish()
    }
}
