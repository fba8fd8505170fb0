//! # quarry
//!
//! A relational-object mapping query engine for Rust.
//!
//! This is the meta-crate that re-exports the sub-crates for convenient
//! access. Depend on `quarry` to get the whole engine, or on the individual
//! crates for finer-grained control.
//!
//! ```
//! use quarry::db::fields::FieldSpec;
//! use quarry::db::model::Model;
//!
//! let customer = Model::define(
//!     "Customer",
//!     [
//!         ("id", FieldSpec::auto_serial().primary_key().not_null()),
//!         ("first", FieldSpec::text().not_null()),
//!     ],
//! )
//! .unwrap();
//!
//! let (sql, _params) = customer.query().to_sql().unwrap();
//! assert!(sql.starts_with("SELECT"));
//! ```

/// Foundation types: error taxonomy, settings, and logging.
pub use quarry_core as core;

/// ORM core: field specs, model schemas, join resolution, and the query
/// builder.
pub use quarry_db as db;
