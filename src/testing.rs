//! Testing utilities for dataflow pipelines.
//!
//! This module provides the facilities the crate's own tests are written
//! with, and that end-users can reuse for theirs:
//!
//! - **Assertions**: compare collections up to consolidation
//! - **Test data builders**: construct delta collections fluently
//! - **Capture**: record everything a stream emits and fold it up
//!
//! # Quick Start
//!
//! ```
//! use deltaflow::{BatchFlow, Multiset};
//! use deltaflow::testing::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let flow = BatchFlow::new();
//! let (input, values) = flow.new_input::<i64>();
//! let doubled = values.map(|x| x * 2).capture();
//! flow.finalize()?;
//!
//! input.send(Multiset::from(vec![(1, 1), (2, 1)]))?;
//! flow.run()?;
//!
//! assert_multisets_equal(&doubled.accumulated(), &Multiset::from(vec![(2, 1), (4, 1)]));
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod builders;
pub mod capture;

// Re-export commonly used items
pub use assertions::*;
pub use builders::*;
pub use capture::*;
