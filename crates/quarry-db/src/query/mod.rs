//! Query building and compilation.
//!
//! - [`path`] - relation-path parsing (`.` and `__` separators)
//! - [`join_tree`] - per-query join deduplication and aliasing
//! - [`builder`] - the immutable [`QueryBuilder`] and SQL compilation

pub mod builder;
pub mod join_tree;
pub mod path;

pub use builder::{FilterValue, QueryBuilder, QueryKind, QueryOutcome};
pub use join_tree::{ColumnRef, JoinKind, JoinTree, ResolvedField};
pub use path::{split_path, PathSeg};
