//! Model handles and compiled schema metadata.
//!
//! A [`Model`] is a cheaply-clonable handle to the frozen [`ModelSchema`]
//! produced by [`Model::define`]. Definition runs in two phases: every field
//! is validated and bound first, then cross-model relation registration adds
//! a synthesized reverse relation to each foreign-key target, in declaration
//! order. After definition the schema is append-only for reverse relations
//! contributed by later-declared models and offers no other mutation.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use quarry_core::{QuarryError, QuarryResult};

use crate::fields::{FieldKind, FieldSpec};
use crate::query::QueryBuilder;

/// Model-level declaration options.
#[derive(Debug, Clone, Default)]
pub struct ModelOptions {
    /// Overrides the physical table name (default: lowercased model name).
    pub db_name: Option<String>,
}

/// A named relational entity mapping 1:1 to a table.
///
/// Handles are cheap to clone and compare by identity.
///
/// # Examples
///
/// ```
/// use quarry_db::fields::FieldSpec;
/// use quarry_db::model::Model;
///
/// let customer = Model::define(
///     "Customer",
///     [
///         ("id", FieldSpec::auto_serial().primary_key().not_null()),
///         ("first", FieldSpec::text().not_null()),
///         ("last", FieldSpec::text()),
///     ],
/// )
/// .unwrap();
/// assert_eq!(customer.table_name(), "customer");
/// ```
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

struct ModelInner {
    schema: ModelSchema,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Model").field(&self.name()).finish()
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Model {}

/// Per-model compiled metadata: field registry, primary key, table name, and
/// the reverse-relation map.
pub struct ModelSchema {
    model_name: String,
    table_name: String,
    fields: Vec<FieldSpec>,
    pk_index: usize,
    /// Reverse name -> synthesized `Related` field, one per inbound foreign
    /// key, in registration order. Appended to by later-declared models.
    relations: RwLock<Vec<(String, FieldSpec)>>,
}

impl fmt::Debug for ModelSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSchema")
            .field("model_name", &self.model_name)
            .field("table_name", &self.table_name)
            .field("fields", &self.fields.len())
            .finish_non_exhaustive()
    }
}

fn schema_err(model: &str, message: impl Into<String>) -> QuarryError {
    QuarryError::SchemaDefinition {
        model: model.to_string(),
        message: message.into(),
    }
}

impl Model {
    /// Declares a model with default options.
    pub fn define<S, I>(name: &str, fields: I) -> QuarryResult<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, FieldSpec)>,
    {
        Self::define_with(name, fields, ModelOptions::default())
    }

    /// Declares a model.
    ///
    /// Requires a non-empty name, at least one field, and exactly one primary
    /// key. Registers a reverse relation on every foreign-key target; a
    /// reverse-name collision fails the whole definition before any
    /// registration is committed.
    pub fn define_with<S, I>(name: &str, fields: I, options: ModelOptions) -> QuarryResult<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, FieldSpec)>,
    {
        if name.is_empty() {
            return Err(schema_err("<anonymous>", "model name not provided"));
        }

        let mut declared: Vec<(String, FieldSpec)> = fields
            .into_iter()
            .map(|(n, spec)| (n.into(), spec))
            .collect();
        if declared.is_empty() {
            return Err(schema_err(name, "has no fields"));
        }

        let table_name = options
            .db_name
            .unwrap_or_else(|| name.to_lowercase());

        for i in 1..declared.len() {
            let (fname, _) = &declared[i];
            if declared[..i].iter().any(|(n, _)| n == fname) {
                return Err(schema_err(name, format!("duplicate field '{fname}'")));
            }
        }

        // phase 1: per-field validation and binding
        for (fname, spec) in &mut declared {
            spec.validate(fname, name, &table_name)?;
        }

        let pk_count = declared
            .iter()
            .filter(|(_, s)| s.is_primary_key())
            .count();
        if pk_count == 0 {
            return Err(schema_err(name, "does not have a primary key"));
        }
        if pk_count > 1 {
            return Err(schema_err(name, "contains more than one primary key"));
        }

        // phase 2a: post-assembly field hooks
        for (_, spec) in &mut declared {
            spec.init_binding();
        }

        let fields: Vec<FieldSpec> = declared.into_iter().map(|(_, s)| s).collect();
        let pk_index = fields
            .iter()
            .position(FieldSpec::is_primary_key)
            .unwrap_or(0);

        let model = Self {
            inner: Arc::new(ModelInner {
                schema: ModelSchema {
                    model_name: name.to_string(),
                    table_name,
                    fields,
                    pk_index,
                    relations: RwLock::new(Vec::new()),
                },
            }),
        };

        model.register_reverse_relations()?;
        Ok(model)
    }

    /// Declares a model reusing this model's field specs. Fields in the new
    /// map override same-named inherited fields; the new model owns an
    /// independent table and schema.
    pub fn extend<S, I>(&self, name: &str, fields: I) -> QuarryResult<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, FieldSpec)>,
    {
        self.extend_with(name, fields, ModelOptions::default())
    }

    /// [`Model::extend`] with explicit options.
    pub fn extend_with<S, I>(
        &self,
        name: &str,
        fields: I,
        options: ModelOptions,
    ) -> QuarryResult<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, FieldSpec)>,
    {
        let mut merged: Vec<(String, FieldSpec)> = self
            .schema()
            .fields
            .iter()
            .map(|f| (f.field_name().to_string(), f.unbound_clone()))
            .collect();
        for (fname, spec) in fields {
            let fname = fname.into();
            if let Some(pos) = merged.iter().position(|(n, _)| *n == fname) {
                merged[pos] = (fname, spec);
            } else {
                merged.push((fname, spec));
            }
        }
        Self::define_with(name, merged, options)
    }

    /// Validates reverse names against every target, then commits the
    /// registrations. Collision checks run first so a failed definition
    /// leaves no partial registration behind.
    fn register_reverse_relations(&self) -> QuarryResult<()> {
        let schema = self.schema();
        let mut planned: Vec<(Model, String, String)> = Vec::new();

        for field in &schema.fields {
            let FieldKind::ForeignKey { target } = field.kind() else {
                continue;
            };
            let reverse = field
                .reverse_name()
                .unwrap_or(&schema.table_name)
                .to_string();

            if let Some(existing) = target.schema().relation_source(&reverse) {
                return Err(schema_err(
                    &schema.model_name,
                    format!(
                        "reverse name '{reverse}' already exists on model '{}' (from {existing} Model)",
                        target.name()
                    ),
                ));
            }
            if planned
                .iter()
                .any(|(t, r, _)| t == target && *r == reverse)
            {
                return Err(schema_err(
                    &schema.model_name,
                    format!(
                        "reverse name '{reverse}' already exists on model '{}' (from {} Model)",
                        target.name(),
                        schema.model_name
                    ),
                ));
            }
            planned.push((
                target.clone(),
                reverse,
                field.column_name().to_string(),
            ));
        }

        for (target, reverse, fk_column) in planned {
            let related = FieldSpec::related(
                &reverse,
                self.clone(),
                fk_column,
                target.name(),
                target.table_name(),
            );
            target.schema().register_relation(reverse, related);
        }
        Ok(())
    }

    /// The declared model name.
    pub fn name(&self) -> &str {
        &self.inner.schema.model_name
    }

    /// The physical table name.
    pub fn table_name(&self) -> &str {
        &self.inner.schema.table_name
    }

    /// The compiled schema metadata.
    pub fn schema(&self) -> &ModelSchema {
        &self.inner.schema
    }

    /// A fresh query builder bound to this model.
    pub fn query(&self) -> QueryBuilder {
        QueryBuilder::new(self.clone())
    }
}

impl ModelSchema {
    /// The declared model name.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// The physical table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// The declared fields, in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// The primary-key field.
    pub fn primary_key(&self) -> FieldSpec {
        self.fields[self.pk_index].clone()
    }

    /// Resolves a field by declared name, by physical column name where that
    /// differs, and finally (when `include_related` is set) by reverse
    /// relation name.
    pub fn field_by_name(&self, name: &str, include_related: bool) -> Option<FieldSpec> {
        if let Some(field) = self.fields.iter().find(|f| f.field_name() == name) {
            return Some(field.clone());
        }
        if let Some(field) = self
            .fields
            .iter()
            .find(|f| f.column_name() == name && f.column_name() != f.field_name())
        {
            return Some(field.clone());
        }
        if include_related {
            let relations = self.read_relations();
            return relations
                .iter()
                .find(|(rname, _)| rname == name)
                .map(|(_, spec)| spec.clone());
        }
        None
    }

    /// Ordered physical column names; drives selection of all root columns.
    pub fn db_field_names(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|f| f.column_name().to_string())
            .collect()
    }

    /// Every name a relation path may use at this model: declared field
    /// names, physical column names where distinct, and relation names.
    pub fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .fields
            .iter()
            .map(|f| f.field_name().to_string())
            .collect();
        names.extend(
            self.fields
                .iter()
                .filter(|f| f.column_name() != f.field_name())
                .map(|f| f.column_name().to_string()),
        );
        names.extend(
            self.read_relations()
                .iter()
                .map(|(rname, _)| rname.clone()),
        );
        names
    }

    /// Renders the CREATE TABLE statement for this model. The table name is
    /// quoted so reserved words (e.g. `order`) stay valid.
    pub fn generate_table_sql(&self) -> String {
        let columns: Vec<String> = self.fields.iter().map(FieldSpec::to_table_sql).collect();
        format!(
            "CREATE TABLE \"{}\" (\n  {}\n);",
            self.table_name,
            columns.join(", \n  ")
        )
    }

    /// The model that claimed the given reverse name, if any.
    fn relation_source(&self, reverse: &str) -> Option<String> {
        self.read_relations()
            .iter()
            .find(|(rname, _)| rname == reverse)
            .and_then(|(_, spec)| match spec.kind() {
                FieldKind::Related { source, .. } => Some(source.name().to_string()),
                _ => None,
            })
    }

    fn register_relation(&self, reverse: String, spec: FieldSpec) {
        self.relations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((reverse, spec));
    }

    fn read_relations(&self) -> std::sync::RwLockReadGuard<'_, Vec<(String, FieldSpec)>> {
        self.relations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> Model {
        Model::define(
            "Customer",
            [
                ("id", FieldSpec::auto_serial().primary_key().not_null()),
                ("first", FieldSpec::text().not_null()),
                ("last", FieldSpec::text()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn table_name_defaults_to_lowercase() {
        let m = customer();
        assert_eq!(m.name(), "Customer");
        assert_eq!(m.table_name(), "customer");
    }

    #[test]
    fn table_name_override() {
        let m = Model::define_with(
            "OrderItem",
            [("id", FieldSpec::auto_serial().primary_key().not_null())],
            ModelOptions {
                db_name: Some("order_item".to_string()),
            },
        )
        .unwrap();
        assert_eq!(m.table_name(), "order_item");
    }

    #[test]
    fn missing_name_and_fields() {
        let err = Model::define::<&str, _>("", []).unwrap_err();
        assert!(err.to_string().contains("model name not provided"));

        let err = Model::define::<&str, _>("Empty", []).unwrap_err();
        assert!(err.to_string().contains("has no fields"));
    }

    #[test]
    fn primary_key_discovery() {
        let err = Model::define(
            "Test",
            [("text_field", FieldSpec::text()), ("int_field", FieldSpec::big_int())],
        )
        .unwrap_err();
        assert!(err.to_string().contains("does not have a primary key"));

        let err = Model::define(
            "Test",
            [
                ("a", FieldSpec::text().primary_key().not_null()),
                ("b", FieldSpec::big_int().primary_key().not_null()),
            ],
        )
        .unwrap_err();
        assert!(err.to_string().contains("contains more than one primary key"));
    }

    #[test]
    fn duplicate_field_names_rejected() {
        let err = Model::define(
            "Test",
            [
                ("id", FieldSpec::auto_serial().primary_key().not_null()),
                ("id", FieldSpec::text()),
            ],
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate field 'id'"));
    }

    #[test]
    fn reverse_relation_registered_on_target() {
        let cust = customer();
        let _order = Model::define(
            "Order",
            [
                ("id", FieldSpec::auto_serial().primary_key().not_null()),
                ("customer", FieldSpec::foreign_key(&cust).not_null()),
            ],
        )
        .unwrap();

        let related = cust.schema().field_by_name("order", true).unwrap();
        assert!(matches!(related.kind(), FieldKind::Related { .. }));
        assert!(cust.schema().field_by_name("order", false).is_none());
        assert_eq!(
            cust.schema().field_names(),
            vec!["id", "first", "last", "order"]
        );
    }

    #[test]
    fn reverse_name_collision_names_both_models() {
        let parent = Model::define(
            "Parent",
            [("id", FieldSpec::auto_serial().primary_key().not_null())],
        )
        .unwrap();
        let _child1 = Model::define(
            "Child1",
            [
                ("id", FieldSpec::auto_serial().primary_key().not_null()),
                ("parent", FieldSpec::foreign_key(&parent).reverse("child")),
            ],
        )
        .unwrap();
        let err = Model::define(
            "Child2",
            [
                ("id", FieldSpec::auto_serial().primary_key().not_null()),
                ("parent", FieldSpec::foreign_key(&parent).reverse("child")),
            ],
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Child2 model: reverse name 'child' already exists on model 'Parent' (from Child1 Model)"
        );
    }

    #[test]
    fn failed_definition_commits_no_registration() {
        let parent = Model::define(
            "Parent2",
            [("id", FieldSpec::auto_serial().primary_key().not_null())],
        )
        .unwrap();
        // second FK to the same target without an explicit reverse name
        // collides with the first inside one definition
        let err = Model::define(
            "Child",
            [
                ("id", FieldSpec::auto_serial().primary_key().not_null()),
                ("a", FieldSpec::foreign_key(&parent)),
                ("b", FieldSpec::foreign_key(&parent)),
            ],
        )
        .unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert!(parent.schema().field_by_name("child", true).is_none());
    }

    #[test]
    fn field_lookup_by_column_name() {
        let cust = customer();
        let order = Model::define(
            "Order3",
            [
                ("id", FieldSpec::auto_serial().primary_key().not_null()),
                ("customer", FieldSpec::foreign_key(&cust).reverse("order3")),
            ],
        )
        .unwrap();
        // declared name and the derived `_id` column both resolve
        assert!(order.schema().field_by_name("customer", true).is_some());
        let by_column = order.schema().field_by_name("customer_id", true).unwrap();
        assert_eq!(by_column.field_name(), "customer");
    }

    #[test]
    fn db_field_names_in_declaration_order() {
        let cust = customer();
        assert_eq!(cust.schema().db_field_names(), vec!["id", "first", "last"]);
    }

    #[test]
    fn generate_table_sql() {
        let m = Model::define(
            "Account",
            [
                ("id", FieldSpec::auto_serial().primary_key().not_null()),
                ("email", FieldSpec::citext().unique()),
            ],
        )
        .unwrap();
        assert_eq!(
            m.schema().generate_table_sql(),
            "CREATE TABLE \"account\" (\n  id bigserial NOT NULL PRIMARY KEY, \n  email citext UNIQUE\n);"
        );
    }

    #[test]
    fn extend_reuses_and_overrides_fields() {
        let base = customer();
        let extended = base
            .extend(
                "Vip",
                [
                    ("tier", FieldSpec::integer().not_null().default(1)),
                    ("last", FieldSpec::varchar(64)),
                ],
            )
            .unwrap();
        assert_eq!(extended.table_name(), "vip");
        assert_eq!(
            extended.schema().db_field_names(),
            vec!["id", "first", "last", "tier"]
        );
        let last = extended.schema().field_by_name("last", false).unwrap();
        assert!(matches!(last.kind(), FieldKind::Varchar { .. }));
        // parent untouched
        let parent_last = base.schema().field_by_name("last", false).unwrap();
        assert!(matches!(parent_last.kind(), FieldKind::Text));
    }

    #[test]
    fn handles_compare_by_identity() {
        let a = customer();
        let b = a.clone();
        assert_eq!(a, b);
        let c = customer();
        assert_ne!(a, c);
    }
}
