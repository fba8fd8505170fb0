//! Field definitions and types for the engine.
//!
//! This module provides the [`FieldSpec`] struct and [`FieldKind`] enum that
//! describe model fields, their validation rules, and their database column
//! mappings.

pub mod types;

pub use types::{DefaultValue, FieldKind, FieldSpec, OnDelete};
