//! Field type definitions for the engine.
//!
//! Each [`FieldKind`] variant corresponds to one column type the engine can
//! declare, and [`FieldSpec`] captures all metadata about a single model
//! field: its kind, constraints, default, and — once the owning model is
//! defined — its binding (field name and physical column name).

use std::fmt;
use std::sync::Arc;

use quarry_core::{QuarryError, QuarryResult};

use crate::model::Model;
use crate::value::Value;

/// Behavior when a referenced row is deleted (ON DELETE action).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OnDelete {
    /// Set the foreign key to NULL.
    SetNull,
    /// Set the foreign key to its column default.
    SetDefault,
    /// Delete the referencing rows.
    Cascade,
    /// Prevent deletion while referencing rows exist.
    Restrict,
    /// Take no action (may cause integrity errors).
    NoAction,
}

impl OnDelete {
    /// Returns the SQL keywords for this action.
    pub const fn sql_keyword(self) -> &'static str {
        match self {
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
            Self::NoAction => "NO ACTION",
        }
    }
}

/// A column default: either a literal value or a zero-arg generator invoked
/// when the default is rendered.
#[derive(Clone)]
pub enum DefaultValue {
    /// A literal value.
    Value(Value),
    /// A generator producing the value on demand.
    Generator(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    /// Resolves the default to a concrete value.
    pub fn resolve(&self) -> Value {
        match self {
            Self::Value(v) => v.clone(),
            Self::Generator(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Generator(_) => f.write_str("Generator(..)"),
        }
    }
}

/// The type of a model field, determining its SQL column type and behavior.
///
/// Relational kinds carry the models they connect. `Related` is synthetic:
/// it is created only by [`Model::define`] when registering the reverse side
/// of a `ForeignKey` and cannot be constructed by user code.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// Variable-length string with a maximum size.
    Varchar {
        /// Maximum character length.
        max_size: u32,
    },
    /// Unlimited-length text.
    Text,
    /// Case-insensitive text (`citext`).
    CiText,
    /// 16-bit signed integer.
    SmallInt,
    /// 32-bit signed integer.
    Integer,
    /// 64-bit signed integer.
    BigInt,
    /// Boolean (true/false).
    Boolean,
    /// Timestamp, optionally zoned.
    DateTime,
    /// Auto-incrementing 64-bit integer (`bigserial`).
    AutoSerial,
    /// Many-to-one relationship.
    ForeignKey {
        /// The referenced model.
        target: Model,
    },
    /// The reverse side of an inbound `ForeignKey` from another model.
    Related {
        /// The model that declared the foreign key.
        source: Model,
        /// The physical foreign-key column on the source table.
        fk_column: String,
    },
}

impl FieldKind {
    /// Returns the kind name used in error messages.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Varchar { .. } => "Varchar",
            Self::Text => "Text",
            Self::CiText => "CIText",
            Self::SmallInt => "SmallInt",
            Self::Integer => "Integer",
            Self::BigInt => "BigInt",
            Self::Boolean => "Boolean",
            Self::DateTime => "DateTime",
            Self::AutoSerial => "AutoSerial",
            Self::ForeignKey { .. } => "ForeignKey",
            Self::Related { .. } => "Related",
        }
    }

    /// Returns `true` if this kind connects to another model.
    pub const fn is_relation(&self) -> bool {
        matches!(self, Self::ForeignKey { .. } | Self::Related { .. })
    }
}

/// Constraint and default options shared by every field kind.
#[derive(Debug, Clone)]
struct FieldOptions {
    nullable: bool,
    primary_key: bool,
    unique: bool,
    default: Option<DefaultValue>,
    db_name: Option<String>,
    // kind-specific; rejected at bind time when applied to the wrong kind
    on_delete: Option<OnDelete>,
    reverse: Option<String>,
    auto_now: bool,
    time_zone: Option<String>,
}

impl Default for FieldOptions {
    fn default() -> Self {
        Self {
            nullable: true,
            primary_key: false,
            unique: false,
            default: None,
            db_name: None,
            on_delete: None,
            reverse: None,
            auto_now: false,
            time_zone: None,
        }
    }
}

/// The association between a field and its owning model, established exactly
/// once during [`Model::define`].
#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub(crate) field_name: String,
    pub(crate) db_name: String,
    pub(crate) model_name: String,
    pub(crate) table_name: String,
    /// Resolved reverse-relation name (ForeignKey only).
    pub(crate) reverse: Option<String>,
}

/// A typed column descriptor: kind, constraints, default, and SQL rendering.
///
/// Construct one with the kind constructors (`FieldSpec::varchar(..)`,
/// `FieldSpec::text()`, ...) and refine it with the builder methods. The
/// field is validated and bound when the owning model is defined; it is
/// immutable afterwards.
///
/// # Examples
///
/// ```
/// use quarry_db::fields::FieldSpec;
///
/// let id = FieldSpec::auto_serial().primary_key().not_null();
/// let email = FieldSpec::citext().unique();
/// let title = FieldSpec::varchar(120).not_null().default("untitled");
/// ```
#[derive(Debug, Clone)]
pub struct FieldSpec {
    kind: FieldKind,
    options: FieldOptions,
    binding: Option<Binding>,
}

// ── Kind constructors ──────────────────────────────────────────────────

impl FieldSpec {
    fn with_kind(kind: FieldKind) -> Self {
        Self {
            kind,
            options: FieldOptions::default(),
            binding: None,
        }
    }

    /// A `varchar(max_size)` column.
    pub fn varchar(max_size: u32) -> Self {
        Self::with_kind(FieldKind::Varchar { max_size })
    }

    /// A `text` column.
    pub fn text() -> Self {
        Self::with_kind(FieldKind::Text)
    }

    /// A case-insensitive `citext` column.
    pub fn citext() -> Self {
        Self::with_kind(FieldKind::CiText)
    }

    /// A `smallint` column.
    pub fn small_int() -> Self {
        Self::with_kind(FieldKind::SmallInt)
    }

    /// An `integer` column.
    pub fn integer() -> Self {
        Self::with_kind(FieldKind::Integer)
    }

    /// A `bigint` column.
    pub fn big_int() -> Self {
        Self::with_kind(FieldKind::BigInt)
    }

    /// A `boolean` column.
    pub fn boolean() -> Self {
        Self::with_kind(FieldKind::Boolean)
    }

    /// A timestamp column.
    pub fn date_time() -> Self {
        Self::with_kind(FieldKind::DateTime)
    }

    /// An auto-incrementing `bigserial` column.
    pub fn auto_serial() -> Self {
        Self::with_kind(FieldKind::AutoSerial)
    }

    /// A foreign key referencing `target`'s primary key.
    pub fn foreign_key(target: &Model) -> Self {
        Self::with_kind(FieldKind::ForeignKey {
            target: target.clone(),
        })
    }

    /// The synthesized reverse side of an inbound foreign key. Created only
    /// by model definition.
    pub(crate) fn related(
        reverse_name: &str,
        source: Model,
        fk_column: String,
        owner_model: &str,
        owner_table: &str,
    ) -> Self {
        let mut spec = Self::with_kind(FieldKind::Related { source, fk_column });
        spec.binding = Some(Binding {
            field_name: reverse_name.to_string(),
            db_name: reverse_name.to_string(),
            model_name: owner_model.to_string(),
            table_name: owner_table.to_string(),
            reverse: None,
        });
        spec
    }
}

// ── Builder options ────────────────────────────────────────────────────

impl FieldSpec {
    /// Marks this field as the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.options.primary_key = true;
        self
    }

    /// Disallows NULL values (fields are nullable by default).
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.options.nullable = false;
        self
    }

    /// Explicitly allows NULL values (the default).
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.options.nullable = true;
        self
    }

    /// Adds a UNIQUE constraint.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.options.unique = true;
        self
    }

    /// Sets a literal column default.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.options.default = Some(DefaultValue::Value(value.into()));
        self
    }

    /// Sets a generated column default, invoked when DDL is rendered.
    #[must_use]
    pub fn default_fn(mut self, f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.options.default = Some(DefaultValue::Generator(Arc::new(f)));
        self
    }

    /// Overrides the physical column name.
    #[must_use]
    pub fn db_name(mut self, name: impl Into<String>) -> Self {
        self.options.db_name = Some(name.into());
        self
    }

    /// Sets the ON DELETE action (ForeignKey only).
    #[must_use]
    pub const fn on_delete(mut self, action: OnDelete) -> Self {
        self.options.on_delete = Some(action);
        self
    }

    /// Names the reverse relation registered on the target model
    /// (ForeignKey only; defaults to the owning table name).
    #[must_use]
    pub fn reverse(mut self, name: impl Into<String>) -> Self {
        self.options.reverse = Some(name.into());
        self
    }

    /// Defaults the column to the statement timestamp (DateTime only).
    #[must_use]
    pub const fn auto_now(mut self) -> Self {
        self.options.auto_now = true;
        self
    }

    /// Renders the column zoned and shifts `now()` defaults into the given
    /// zone (DateTime only).
    #[must_use]
    pub fn time_zone(mut self, tz: impl Into<String>) -> Self {
        self.options.time_zone = Some(tz.into());
        self
    }
}

// ── Accessors ──────────────────────────────────────────────────────────

impl FieldSpec {
    /// The field kind.
    pub const fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Whether this field is the primary key.
    pub const fn is_primary_key(&self) -> bool {
        self.options.primary_key
    }

    /// Whether NULL is allowed.
    pub const fn is_nullable(&self) -> bool {
        self.options.nullable
    }

    /// Whether a UNIQUE constraint applies.
    pub const fn is_unique(&self) -> bool {
        self.options.unique
    }

    /// The declared field name. Empty until the field is bound to a model.
    pub fn field_name(&self) -> &str {
        self.binding.as_ref().map_or("", |b| &b.field_name)
    }

    /// The resolved physical column name. Empty until the field is bound.
    pub fn column_name(&self) -> &str {
        self.binding.as_ref().map_or("", |b| &b.db_name)
    }

    /// The resolved reverse-relation name (ForeignKey only; set by the
    /// second binding phase).
    pub fn reverse_name(&self) -> Option<&str> {
        self.binding.as_ref().and_then(|b| b.reverse.as_deref())
    }

    /// Returns a copy with the binding cleared, for reuse in another model.
    pub(crate) fn unbound_clone(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            options: self.options.clone(),
            binding: None,
        }
    }
}

// ── Validation ─────────────────────────────────────────────────────────

/// Inclusive range check shared by the integer kinds. Uses 128-bit
/// arithmetic so the ±2^63 boundary is exact.
fn int_within_width(value: i64, bits: u32) -> bool {
    let bound = 1_i128 << (bits - 1);
    (-bound..=bound).contains(&i128::from(value))
}

impl FieldSpec {
    fn schema_err(&self, field_name: &str, model_name: &str, detail: &str) -> QuarryError {
        QuarryError::SchemaDefinition {
            model: model_name.to_string(),
            message: format!("{} field '{field_name}' {detail}", self.kind.name()),
        }
    }

    /// Validates the options for this kind and binds the field to its owning
    /// model. Re-validation with identical inputs is a no-op; binding to a
    /// second model is an error.
    pub(crate) fn validate(
        &mut self,
        field_name: &str,
        model_name: &str,
        table_name: &str,
    ) -> QuarryResult<()> {
        if let Some(bound) = &self.binding {
            if bound.field_name != field_name || bound.model_name != model_name {
                return Err(self.schema_err(
                    field_name,
                    model_name,
                    &format!(
                        "is already bound to model '{}' as '{}'",
                        bound.model_name, bound.field_name
                    ),
                ));
            }
        }

        let opts = &self.options;
        if opts.primary_key && opts.unique {
            return Err(self.schema_err(
                field_name,
                model_name,
                "is marked primary key and unique. choose only one",
            ));
        }
        if opts.primary_key && opts.nullable {
            return Err(self.schema_err(
                field_name,
                model_name,
                "cannot be a primary key and be nullable",
            ));
        }

        self.validate_kind_options(field_name, model_name)?;
        self.validate_default(field_name, model_name)?;

        let db_name = self.options.db_name.clone().unwrap_or_else(|| {
            if matches!(self.kind, FieldKind::ForeignKey { .. }) {
                format!("{field_name}_id")
            } else {
                field_name.to_string()
            }
        });
        self.binding = Some(Binding {
            field_name: field_name.to_string(),
            db_name,
            model_name: model_name.to_string(),
            table_name: table_name.to_string(),
            reverse: self.options.reverse.clone(),
        });
        Ok(())
    }

    /// Rejects kind-specific options applied to the wrong kind, and enforces
    /// the per-kind structural rules.
    fn validate_kind_options(&self, field_name: &str, model_name: &str) -> QuarryResult<()> {
        let opts = &self.options;
        let is_fk = matches!(self.kind, FieldKind::ForeignKey { .. });
        let is_datetime = matches!(self.kind, FieldKind::DateTime);

        if opts.on_delete.is_some() && !is_fk {
            return Err(self.schema_err(
                field_name,
                model_name,
                "does not accept the on_delete option",
            ));
        }
        if opts.reverse.is_some() && !is_fk {
            return Err(self.schema_err(
                field_name,
                model_name,
                "does not accept the reverse option",
            ));
        }
        if (opts.auto_now || opts.time_zone.is_some()) && !is_datetime {
            return Err(self.schema_err(
                field_name,
                model_name,
                "does not accept the auto_now/time_zone options",
            ));
        }

        match &self.kind {
            FieldKind::Varchar { max_size } if *max_size == 0 => Err(self.schema_err(
                field_name,
                model_name,
                "maxSize must be greater than 0",
            )),
            FieldKind::ForeignKey { .. } if opts.primary_key => {
                Err(self.schema_err(field_name, model_name, "cannot be a primary key"))
            }
            _ => Ok(()),
        }
    }

    /// Validates the default value against the field kind.
    fn validate_default(&self, field_name: &str, model_name: &str) -> QuarryResult<()> {
        let opts = &self.options;

        if matches!(self.kind, FieldKind::DateTime) {
            if opts.auto_now && opts.default.is_some() {
                return Err(self.schema_err(
                    field_name,
                    model_name,
                    "auto_now used with a default value. choose only one",
                ));
            }
            if let Some(default) = &opts.default {
                // generators are invoked once here to type-check their output
                if !matches!(default.resolve(), Value::DateTime(_)) {
                    return Err(self.schema_err(
                        field_name,
                        model_name,
                        "default value must be a timestamp or a timestamp-producing function",
                    ));
                }
            }
            return Ok(());
        }

        let Some(default) = &opts.default else {
            return Ok(());
        };
        let DefaultValue::Value(value) = default else {
            return Err(self.schema_err(
                field_name,
                model_name,
                "only DateTime fields accept a generated default",
            ));
        };

        match &self.kind {
            FieldKind::Varchar { .. } => match value {
                Value::String(_) => Ok(()),
                _ => Err(self.schema_err(field_name, model_name, "default value must be a string")),
            },
            FieldKind::SmallInt | FieldKind::Integer | FieldKind::BigInt => {
                let bits = match self.kind {
                    FieldKind::SmallInt => 16,
                    FieldKind::Integer => 32,
                    _ => 64,
                };
                match value {
                    Value::Int(v) if int_within_width(*v, bits) => Ok(()),
                    Value::Int(_) => Err(self.schema_err(
                        field_name,
                        model_name,
                        &format!("default value out of range (\u{b1}2^{})", bits - 1),
                    )),
                    _ => Err(self.schema_err(
                        field_name,
                        model_name,
                        "default value must be an integer",
                    )),
                }
            }
            FieldKind::Boolean => match value {
                Value::Bool(_) => Ok(()),
                _ => {
                    Err(self.schema_err(field_name, model_name, "default value must be a boolean"))
                }
            },
            _ => Ok(()),
        }
    }

    /// Second binding phase, run after the whole model is assembled. For
    /// ForeignKey the reverse-relation name defaults to the owning table
    /// name, which is only known once the model's metadata is resolved.
    pub(crate) fn init_binding(&mut self) {
        if !matches!(self.kind, FieldKind::ForeignKey { .. }) {
            return;
        }
        if let Some(binding) = self.binding.as_mut() {
            if binding.reverse.is_none() {
                binding.reverse = Some(binding.table_name.clone());
            }
        }
    }
}

// ── SQL rendering ──────────────────────────────────────────────────────

/// Quotes a string literal for direct embedding in DDL.
fn quote_literal(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}

impl FieldSpec {
    /// Renders the SQL column type.
    pub fn type_to_sql(&self) -> String {
        match &self.kind {
            FieldKind::Varchar { max_size } => format!("varchar({max_size})"),
            FieldKind::Text => "text".to_string(),
            FieldKind::CiText => "citext".to_string(),
            FieldKind::SmallInt => "smallint".to_string(),
            FieldKind::Integer => "integer".to_string(),
            FieldKind::BigInt => "bigint".to_string(),
            FieldKind::Boolean => "boolean".to_string(),
            FieldKind::AutoSerial => "bigserial".to_string(),
            FieldKind::DateTime => {
                let zoned = self.options.time_zone.as_ref().is_some_and(|tz| !tz.is_empty());
                let with = if zoned { "WITH" } else { "WITHOUT" };
                format!("TIMESTAMP {with} TIME ZONE")
            }
            FieldKind::ForeignKey { target } => {
                let mut sql = format!("bigint REFERENCES {}", target.table_name());
                if let Some(action) = self.options.on_delete {
                    sql.push_str(" ON DELETE ");
                    sql.push_str(action.sql_keyword());
                }
                sql
            }
            FieldKind::Related { .. } => String::new(),
        }
    }

    /// Renders the DEFAULT expression, if any.
    pub fn default_to_sql(&self) -> Option<String> {
        if self.options.auto_now {
            let zone = self
                .options
                .time_zone
                .as_ref()
                .filter(|tz| !tz.is_empty())
                .map_or_else(String::new, |tz| format!(" at time zone '{tz}'"));
            return Some(format!("(now(){zone})"));
        }

        let default = self.options.default.as_ref()?;
        Some(match default.resolve() {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => quote_literal(&s),
            Value::DateTime(dt) => quote_literal(&dt.to_rfc3339()),
            Value::List(_) => "NULL".to_string(),
        })
    }

    /// Renders the complete column clause for CREATE TABLE.
    pub fn to_table_sql(&self) -> String {
        let mut sql = format!("{} {}", self.column_name(), self.type_to_sql());
        if !self.options.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = self.default_to_sql() {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default);
        }
        if self.options.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if self.options.unique {
            sql.push_str(" UNIQUE");
        }
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bind(mut spec: FieldSpec, name: &str) -> QuarryResult<FieldSpec> {
        spec.validate(name, "Test", "test")?;
        Ok(spec)
    }

    #[test]
    fn varchar_renders_size() {
        let f = bind(FieldSpec::varchar(40), "title").unwrap();
        assert_eq!(f.type_to_sql(), "varchar(40)");
        assert_eq!(f.column_name(), "title");
    }

    #[test]
    fn varchar_rejects_zero_max_size() {
        let err = bind(FieldSpec::varchar(0), "title").unwrap_err();
        assert!(err.to_string().contains("maxSize must be greater than 0"));
    }

    #[test]
    fn varchar_rejects_non_string_default() {
        let err = bind(FieldSpec::varchar(10).default(5), "title").unwrap_err();
        assert!(err.to_string().contains("default value must be a string"));
    }

    #[test]
    fn small_int_range() {
        assert!(bind(FieldSpec::small_int().default(1000), "n").is_ok());
        assert!(bind(FieldSpec::small_int().default(32768), "n").is_ok());
        let err = bind(FieldSpec::small_int().default(32769), "n").unwrap_err();
        assert!(err.to_string().contains("out of range"));
        assert!(bind(FieldSpec::small_int().default(-32768), "n").is_ok());
        assert!(bind(FieldSpec::small_int().default(-32769), "n").is_err());
    }

    #[test]
    fn integer_range() {
        assert!(bind(FieldSpec::integer().default(2_147_483_648_i64), "n").is_ok());
        assert!(bind(FieldSpec::integer().default(2_147_483_649_i64), "n").is_err());
        assert!(bind(FieldSpec::integer().default(-2_147_483_649_i64), "n").is_err());
    }

    #[test]
    fn big_int_accepts_i64_extremes() {
        assert!(bind(FieldSpec::big_int().default(i64::MAX), "n").is_ok());
        assert!(bind(FieldSpec::big_int().default(i64::MIN), "n").is_ok());
    }

    #[test]
    fn int_rejects_non_integer_default() {
        let err = bind(FieldSpec::integer().default("five"), "n").unwrap_err();
        assert!(err.to_string().contains("must be an integer"));
    }

    #[test]
    fn int_width_boundaries_are_exact() {
        assert!(int_within_width(i64::MAX, 64));
        assert!(int_within_width(i64::MIN, 64));
        assert!(int_within_width(1 << 15, 16));
        assert!(!int_within_width((1 << 15) + 1, 16));
        assert!(int_within_width(-(1 << 31), 32));
        assert!(!int_within_width(-(1 << 31) - 1, 32));
    }

    #[test]
    fn boolean_default() {
        assert!(bind(FieldSpec::boolean().default(true), "b").is_ok());
        let err = bind(FieldSpec::boolean().default("yes"), "b").unwrap_err();
        assert!(err.to_string().contains("must be a boolean"));
    }

    #[test]
    fn primary_key_excludes_unique_and_nullable() {
        let err = bind(FieldSpec::auto_serial().primary_key().not_null().unique(), "id")
            .unwrap_err();
        assert!(err.to_string().contains("choose only one"));

        let err = bind(FieldSpec::auto_serial().primary_key(), "id").unwrap_err();
        assert!(err
            .to_string()
            .contains("cannot be a primary key and be nullable"));
    }

    #[test]
    fn datetime_auto_now_excludes_default() {
        let err = bind(
            FieldSpec::date_time().auto_now().default(Utc::now()),
            "created",
        )
        .unwrap_err();
        assert!(err.to_string().contains("choose only one"));
    }

    #[test]
    fn datetime_generator_default() {
        let f = bind(
            FieldSpec::date_time().default_fn(|| Value::from(Utc::now())),
            "created",
        )
        .unwrap();
        assert!(f.default_to_sql().is_some());
    }

    #[test]
    fn datetime_generator_must_produce_timestamp() {
        let err = bind(
            FieldSpec::date_time().default_fn(|| Value::Int(0)),
            "created",
        )
        .unwrap_err();
        assert!(err.to_string().contains("timestamp"));
    }

    #[test]
    fn datetime_auto_now_sql() {
        let f = bind(FieldSpec::date_time().auto_now(), "created").unwrap();
        assert_eq!(f.default_to_sql().as_deref(), Some("(now())"));
        assert_eq!(f.type_to_sql(), "TIMESTAMP WITHOUT TIME ZONE");

        let f = bind(FieldSpec::date_time().auto_now().time_zone("CST"), "created").unwrap();
        assert_eq!(f.default_to_sql().as_deref(), Some("(now() at time zone 'CST')"));
        assert_eq!(f.type_to_sql(), "TIMESTAMP WITH TIME ZONE");
    }

    #[test]
    fn auto_now_rejected_off_datetime() {
        let err = bind(FieldSpec::text().auto_now(), "t").unwrap_err();
        assert!(err.to_string().contains("auto_now"));
    }

    #[test]
    fn foreign_key_column_default_and_pk_rule() {
        let target = Model::define(
            "Customer",
            [("id", FieldSpec::auto_serial().primary_key().not_null())],
        )
        .unwrap();

        let f = bind(FieldSpec::foreign_key(&target), "customer").unwrap();
        assert_eq!(f.column_name(), "customer_id");
        assert_eq!(f.type_to_sql(), "bigint REFERENCES customer");

        let err = bind(FieldSpec::foreign_key(&target).primary_key().not_null(), "customer")
            .unwrap_err();
        assert!(err.to_string().contains("cannot be a primary key"));
    }

    #[test]
    fn foreign_key_on_delete() {
        let target = Model::define(
            "Customer",
            [("id", FieldSpec::auto_serial().primary_key().not_null())],
        )
        .unwrap();
        let f = bind(
            FieldSpec::foreign_key(&target).on_delete(OnDelete::Cascade),
            "customer",
        )
        .unwrap();
        assert_eq!(f.type_to_sql(), "bigint REFERENCES customer ON DELETE CASCADE");
    }

    #[test]
    fn on_delete_rejected_off_foreign_key() {
        let err = bind(FieldSpec::text().on_delete(OnDelete::Cascade), "t").unwrap_err();
        assert!(err.to_string().contains("on_delete"));
    }

    #[test]
    fn init_binding_defaults_reverse_to_owner_table() {
        let target = Model::define(
            "Customer",
            [("id", FieldSpec::auto_serial().primary_key().not_null())],
        )
        .unwrap();
        let mut f = FieldSpec::foreign_key(&target);
        f.validate("customer", "Order", "order").unwrap();
        f.init_binding();
        assert_eq!(f.reverse_name(), Some("order"));
    }

    #[test]
    fn validate_is_idempotent() {
        let mut f = FieldSpec::varchar(12).default("x");
        f.validate("title", "Test", "test").unwrap();
        let first = f.to_table_sql();
        f.validate("title", "Test", "test").unwrap();
        assert_eq!(f.to_table_sql(), first);
    }

    #[test]
    fn rebinding_to_another_model_fails() {
        let mut f = FieldSpec::varchar(12);
        f.validate("title", "Test", "test").unwrap();
        let err = f.validate("title", "Other", "other").unwrap_err();
        assert!(err.to_string().contains("already bound"));
    }

    #[test]
    fn table_sql_clause_order() {
        let f = bind(FieldSpec::varchar(16).not_null().default("n/a").unique(), "code").unwrap();
        assert_eq!(
            f.to_table_sql(),
            "code varchar(16) NOT NULL DEFAULT 'n/a' UNIQUE"
        );
    }

    #[test]
    fn string_default_is_escaped() {
        let f = bind(FieldSpec::text().default("it's"), "note").unwrap();
        assert_eq!(f.default_to_sql().as_deref(), Some("'it''s'"));
    }
}
