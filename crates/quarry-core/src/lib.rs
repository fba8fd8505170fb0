//! # quarry-core
//!
//! Foundation types for the quarry engine: the error taxonomy, application
//! settings, and logging integration. This crate has no knowledge of models
//! or SQL; everything query-shaped lives in `quarry-db`.
//!
//! ## Modules
//!
//! - [`error`] - [`QuarryError`] and the [`QuarryResult`] alias
//! - [`settings`] - [`Settings`](settings::Settings) and the global slot
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;

// Re-export the most commonly used types at the crate root.
pub use error::{QuarryError, QuarryResult};
pub use settings::{init_settings, settings, DatabaseSettings, Settings};
