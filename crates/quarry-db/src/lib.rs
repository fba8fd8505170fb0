//! # quarry-db
//!
//! The ORM core of quarry. Models are declared at runtime with
//! [`Model::define`](model::Model::define), composed of typed
//! [`FieldSpec`](fields::FieldSpec)s; queries are built through the
//! immutable, chainable [`QueryBuilder`](query::QueryBuilder) and compile to
//! parameterized PostgreSQL-flavored SQL.
//!
//! ## Architecture
//!
//! Compilation is pure and synchronous: the builder resolves every relation
//! path through a per-query [`JoinTree`](query::JoinTree) (deduplicating and
//! aliasing joins), renders the statement for its kind, and numbers
//! parameters strictly left-to-right, continuing through nested subqueries.
//! The terminal [`execute`](query::QueryBuilder::execute) call hands the SQL
//! and parameters to an [`Executor`](executor::Executor) and normalizes the
//! result.
//!
//! ## Module Overview
//!
//! - [`fields`] - [`FieldSpec`](fields::FieldSpec) and the closed
//!   [`FieldKind`](fields::FieldKind) set
//! - [`model`] - [`Model`](model::Model) handles and
//!   [`ModelSchema`](model::ModelSchema)
//! - [`value`] - the backend-agnostic [`Value`](value::Value) enum
//! - [`query`] - path parsing, join resolution, and the query builder
//! - [`executor`] - the async [`Executor`](executor::Executor) seam and
//!   [`Row`](executor::Row)

// These clippy lints are intentionally allowed for the ORM crate:
// - result_large_err: QuarryError is the engine error type and is used consistently
// - format_push_string: format! with push_str is clearer than write! for SQL assembly
// - doc_markdown: backtick requirements for documentation items are too strict
#![allow(clippy::result_large_err)]
#![allow(clippy::format_push_string)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]

pub mod executor;
pub mod fields;
pub mod model;
pub mod query;
pub mod value;

// Re-export the most commonly used types at the crate root.
pub use quarry_core::{QuarryError, QuarryResult};

pub use executor::{Executor, FromValue, QueryOutput, Row};
pub use fields::{DefaultValue, FieldKind, FieldSpec, OnDelete};
pub use model::{Model, ModelOptions, ModelSchema};
pub use query::{
    ColumnRef, FilterValue, JoinKind, JoinTree, PathSeg, QueryBuilder, QueryKind, QueryOutcome,
    ResolvedField,
};
pub use value::Value;
