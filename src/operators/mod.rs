//! The operator set.
//!
//! Each submodule pairs the operator implementations with the
//! [`DeltaStream`](crate::DeltaStream) builder methods that wire them into a
//! dataflow:
//!
//! - `stateless`: `map`, `filter`, `negate`, `concat`, and the keyed
//!   conveniences (`key_by`, `unkey`, `map_values`, `filter_values`);
//! - `consolidate`: per-version canonicalization and `buffer`;
//! - `reduce`: the keyed reduce core plus `count`, `sum`, `min`, `max`,
//!   `avg`;
//! - `distinct`: multiplicity-to-presence, `distinct` and `distinct_by`;
//! - `join`: inner join and the derived `anti`/`left`/`right`/`full`
//!   variants;
//! - `topk`: ordered slices per key, with positional, fractional-index, and
//!   predecessor-reference variants, and the non-keyed `order_by` wrappers;
//! - `iterate`: the recursion primitives (ingress, egress, feedback) and
//!   `iterate`;
//! - `inspect`: `output`, `debug`, and the frontier probe.

pub(crate) mod consolidate;
pub(crate) mod distinct;
pub(crate) mod inspect;
pub(crate) mod iterate;
pub(crate) mod join;
pub(crate) mod reduce;
pub(crate) mod stateless;
pub(crate) mod topk;
