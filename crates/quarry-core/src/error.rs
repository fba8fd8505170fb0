//! Core error types for the quarry engine.
//!
//! This module provides [`QuarryError`], the single error enum shared by the
//! schema layer, the query builder, and executors, together with the
//! [`QuarryResult`] alias used across the workspace.

use thiserror::Error;

/// The primary error type for the quarry engine.
///
/// Errors fall into three groups:
///
/// - **Schema definition** errors, raised while a model is being declared.
///   They abort registration of that model and are fatal for it.
/// - **Query build** errors, raised synchronously while a query is being
///   assembled or compiled. Every variant carries the model name; variants
///   that reject a field name also list the valid alternatives.
/// - **Execution** errors, an opaque passthrough from the [`Executor`] the
///   query was dispatched to. This is the only failure delivered
///   asynchronously.
///
/// A compile failure never sends SQL; there is no partial success.
///
/// [`Executor`]: https://docs.rs/quarry-db
#[derive(Error, Debug)]
pub enum QuarryError {
    /// A model or field declaration is invalid.
    #[error("{model} model: {message}")]
    SchemaDefinition {
        /// The model being declared.
        model: String,
        /// What was wrong with the declaration.
        message: String,
    },

    /// A relation path named a field that does not exist at that position.
    #[error("field '{field}' does not exist in {model} model. choices are: {}", choices.join(", "))]
    FieldNotFound {
        /// The model the lookup ran against.
        model: String,
        /// The unknown field name.
        field: String,
        /// Every name that would have been valid at that position.
        choices: Vec<String>,
    },

    /// A statement form that cannot join received a joined relation path.
    #[error("{model} model: joins are not allowed for field '{field}'")]
    JoinsNotAllowed {
        /// The model the query is bound to.
        model: String,
        /// The offending relation path.
        field: String,
    },

    /// A builder call implied a query kind conflicting with the one already
    /// fixed by an earlier call.
    #[error("{model} model: query is already {current}, cannot chain {requested}")]
    QueryTypeConflict {
        /// The model the query is bound to.
        model: String,
        /// The kind the query was fixed to.
        current: &'static str,
        /// The kind the rejected call implied.
        requested: &'static str,
    },

    /// A builder argument was malformed (empty path, empty path segment,
    /// or a hop through a non-relation field).
    #[error("{model} model: {message}")]
    ArgumentType {
        /// The model the query is bound to.
        model: String,
        /// What was wrong with the argument.
        message: String,
    },

    /// A filter value was a nested builder whose kind is not SELECT.
    #[error("{model} model: subquery filters must be SELECT queries")]
    SubqueryKind {
        /// The model of the outer query.
        model: String,
    },

    /// The executor rejected the dispatched statement.
    #[error("execution failed: {0}")]
    Execution(String),
}

impl QuarryError {
    /// Returns `true` for errors raised while declaring a model.
    pub const fn is_schema_error(&self) -> bool {
        matches!(self, Self::SchemaDefinition { .. })
    }

    /// Returns `true` for errors raised while building or compiling a query.
    pub const fn is_query_error(&self) -> bool {
        matches!(
            self,
            Self::FieldNotFound { .. }
                | Self::JoinsNotAllowed { .. }
                | Self::QueryTypeConflict { .. }
                | Self::ArgumentType { .. }
                | Self::SubqueryKind { .. }
        )
    }
}

/// A convenience type alias for `Result<T, QuarryError>`.
pub type QuarryResult<T> = Result<T, QuarryError>;
