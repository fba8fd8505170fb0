//! The immutable query builder and its SQL compilation.
//!
//! A [`QueryBuilder`] is a declarative query specification bound to a
//! [`Model`]. Every mutator validates its arguments, then returns a
//! structurally independent clone; the receiver is never touched, so any
//! intermediate builder can be reused and forked freely.
//!
//! The builder is a state machine over its query kind: the first
//! kind-implying call (`values_list`, `distinct`, `insert`, `update`,
//! `delete`) fixes the kind, a later call implying a different kind fails,
//! and a repeated call of the same kind replaces its field list.
//!
//! Compilation is synchronous and pure; the terminal [`execute`] call is the
//! only suspension point, awaiting the [`Executor`].
//!
//! [`execute`]: QueryBuilder::execute

use chrono::{DateTime, Utc};
use quarry_core::{QuarryError, QuarryResult};

use crate::executor::{Executor, Row};
use crate::fields::FieldKind;
use crate::model::Model;
use crate::value::Value;

use super::join_tree::JoinTree;
use super::path::{split_path, PathSeg};

/// The statement form a builder compiles to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// `SELECT ...`
    Select,
    /// `INSERT INTO ... RETURNING *`
    Insert,
    /// `UPDATE ... SET ...`
    Update,
    /// `DELETE FROM ...`
    Delete,
}

impl QueryKind {
    /// The SQL verb, used in error messages.
    pub const fn sql_name(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

/// The right-hand side of a filter predicate.
///
/// - a `Null` value renders `IS NULL`
/// - a list renders `IN (...)`
/// - a nested SELECT builder renders `IN (<subquery>)`, its parameters
///   numbered after the outer query's
/// - anything else renders positional equality `= $n`
#[derive(Debug, Clone)]
pub enum FilterValue {
    /// Equality against a scalar (`IS NULL` for `Value::Null`).
    Eq(Value),
    /// Membership in a literal list.
    In(Vec<Value>),
    /// Membership in a nested subquery.
    Subquery(Box<QueryBuilder>),
}

impl FilterValue {
    /// The `IS NULL` predicate value.
    pub const fn null() -> Self {
        Self::Eq(Value::Null)
    }

    /// Builds an `IN (...)` list from anything convertible to values.
    pub fn any_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::In(values.into_iter().map(Into::into).collect())
    }
}

impl From<Value> for FilterValue {
    fn from(v: Value) -> Self {
        Self::Eq(v)
    }
}

impl From<Vec<Value>> for FilterValue {
    fn from(v: Vec<Value>) -> Self {
        Self::In(v)
    }
}

impl From<QueryBuilder> for FilterValue {
    fn from(qb: QueryBuilder) -> Self {
        Self::Subquery(Box::new(qb))
    }
}

macro_rules! filter_value_from_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for FilterValue {
                fn from(v: $ty) -> Self {
                    Self::Eq(Value::from(v))
                }
            }
        )*
    };
}

filter_value_from_scalar!(bool, i16, i32, i64, f64, &str, String, DateTime<Utc>);

/// A normalized result: row sets for SELECT/INSERT, an affected-row count
/// for UPDATE/DELETE.
#[derive(Debug)]
pub enum QueryOutcome {
    /// Rows returned by SELECT or `INSERT ... RETURNING`.
    Rows(Vec<Row>),
    /// Rows affected by UPDATE or DELETE.
    Affected(u64),
}

impl QueryOutcome {
    /// The returned rows; empty for UPDATE/DELETE outcomes.
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            Self::Rows(rows) => rows,
            Self::Affected(_) => Vec::new(),
        }
    }

    /// The affected-row count, if this outcome carries one.
    pub const fn as_affected(&self) -> Option<u64> {
        match self {
            Self::Affected(n) => Some(*n),
            Self::Rows(_) => None,
        }
    }
}

/// A parsed, validated relation path.
#[derive(Debug, Clone)]
struct ParsedPath {
    raw: String,
    segs: Vec<PathSeg>,
}

/// One ORDER BY term.
#[derive(Debug, Clone)]
struct OrderTerm {
    path: ParsedPath,
    descending: bool,
}

/// One WHERE predicate.
#[derive(Debug, Clone)]
struct Predicate {
    path: ParsedPath,
    value: FilterValue,
}

/// An immutable, chainable query specification bound to a model.
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
///     ],
/// )
/// .unwrap();
///
/// let (sql, params) = customer
///     .query()
///     .values_list(["first"])
///     .unwrap()
///     .filter([("id", 5.into())])
///     .unwrap()
///     .to_sql()
///     .unwrap();
/// assert_eq!(
///     sql,
///     "SELECT \"customer\".\"first\" FROM \"customer\" WHERE \"customer\".\"id\" = $1"
/// );
/// assert_eq!(params.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    model: Model,
    kind: Option<QueryKind>,
    select_paths: Vec<ParsedPath>,
    is_distinct: bool,
    distinct_on: Vec<ParsedPath>,
    order: Vec<OrderTerm>,
    filters: Vec<Predicate>,
    excludes: Vec<Predicate>,
    /// Insert or update payload, depending on the kind.
    write_values: Vec<(ParsedPath, Value)>,
}

impl QueryBuilder {
    pub(crate) fn new(model: Model) -> Self {
        Self {
            model,
            kind: None,
            select_paths: Vec::new(),
            is_distinct: false,
            distinct_on: Vec::new(),
            order: Vec::new(),
            filters: Vec::new(),
            excludes: Vec::new(),
            write_values: Vec::new(),
        }
    }

    /// The model this query is bound to.
    pub const fn model(&self) -> &Model {
        &self.model
    }

    /// The fixed query kind, if any call has implied one yet.
    pub const fn kind(&self) -> Option<QueryKind> {
        self.kind
    }

    fn with_kind(&self, kind: QueryKind) -> QuarryResult<Self> {
        if let Some(current) = self.kind {
            if current != kind {
                return Err(QuarryError::QueryTypeConflict {
                    model: self.model.name().to_string(),
                    current: current.sql_name(),
                    requested: kind.sql_name(),
                });
            }
        }
        let mut next = self.clone();
        next.kind = Some(kind);
        Ok(next)
    }

    /// Parses a path and checks every hop against the schema.
    fn parse_path(&self, raw: &str, allow_joins: bool) -> QuarryResult<ParsedPath> {
        let segs = split_path(self.model.name(), raw)?;
        if segs.len() > 1 && !allow_joins {
            return Err(QuarryError::JoinsNotAllowed {
                model: self.model.name().to_string(),
                field: raw.to_string(),
            });
        }

        let mut model = self.model.clone();
        for (i, seg) in segs.iter().enumerate() {
            let terminal = i + 1 == segs.len();
            let field = model
                .schema()
                .field_by_name(&seg.name, true)
                .ok_or_else(|| QuarryError::FieldNotFound {
                    model: model.name().to_string(),
                    field: seg.name.clone(),
                    choices: model.schema().field_names(),
                })?;
            match field.kind() {
                FieldKind::ForeignKey { target } => model = target.clone(),
                FieldKind::Related { source, .. } => model = source.clone(),
                _ => {
                    if !terminal {
                        return Err(QuarryError::ArgumentType {
                            model: model.name().to_string(),
                            message: format!(
                                "field '{}' is not a relation and cannot be joined through",
                                seg.name
                            ),
                        });
                    }
                }
            }
        }
        Ok(ParsedPath {
            raw: raw.to_string(),
            segs,
        })
    }

    /// Validates an insert/update target: a single local column, never a
    /// joined path or a reverse relation.
    fn parse_write_target(&self, raw: &str) -> QuarryResult<ParsedPath> {
        let parsed = self.parse_path(raw, false)?;
        let field = self
            .model
            .schema()
            .field_by_name(&parsed.segs[0].name, true)
            .ok_or_else(|| QuarryError::FieldNotFound {
                model: self.model.name().to_string(),
                field: parsed.segs[0].name.clone(),
                choices: self.model.schema().field_names(),
            })?;
        if matches!(field.kind(), FieldKind::Related { .. }) {
            return Err(QuarryError::ArgumentType {
                model: self.model.name().to_string(),
                message: format!("cannot write to reverse relation '{raw}'"),
            });
        }
        Ok(parsed)
    }

    fn parse_predicates<I, K>(&self, pairs: I) -> QuarryResult<Vec<Predicate>>
    where
        I: IntoIterator<Item = (K, FilterValue)>,
        K: AsRef<str>,
    {
        pairs
            .into_iter()
            .map(|(key, value)| {
                Ok(Predicate {
                    path: self.parse_path(key.as_ref(), true)?,
                    value,
                })
            })
            .collect()
    }

    // ── Fluent specification ─────────────────────────────────────────

    /// Records positive predicates keyed by relation paths (joins
    /// permitted). Each call replaces the positive list.
    pub fn filter<I, K>(&self, pairs: I) -> QuarryResult<Self>
    where
        I: IntoIterator<Item = (K, FilterValue)>,
        K: AsRef<str>,
    {
        let predicates = self.parse_predicates(pairs)?;
        let mut next = self.clone();
        next.filters = predicates;
        Ok(next)
    }

    /// Records negated predicates, rendered as `NOT a AND NOT b`. Each call
    /// replaces the negated list.
    pub fn exclude<I, K>(&self, pairs: I) -> QuarryResult<Self>
    where
        I: IntoIterator<Item = (K, FilterValue)>,
        K: AsRef<str>,
    {
        let predicates = self.parse_predicates(pairs)?;
        let mut next = self.clone();
        next.excludes = predicates;
        Ok(next)
    }

    /// Sets the SELECT projection (joins permitted). An empty projection
    /// selects all declared root columns. Implies SELECT; last call wins.
    pub fn values_list<I, S>(&self, paths: I) -> QuarryResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut next = self.with_kind(QueryKind::Select)?;
        next.select_paths = paths
            .into_iter()
            .map(|p| self.parse_path(p.as_ref(), true))
            .collect::<QuarryResult<_>>()?;
        Ok(next)
    }

    /// Adds `DISTINCT` (no paths) or `DISTINCT ON (...)`. Implies SELECT;
    /// last call wins.
    pub fn distinct<I, S>(&self, paths: I) -> QuarryResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut next = self.with_kind(QueryKind::Select)?;
        next.is_distinct = true;
        next.distinct_on = paths
            .into_iter()
            .map(|p| self.parse_path(p.as_ref(), true))
            .collect::<QuarryResult<_>>()?;
        Ok(next)
    }

    /// Sets the ordering; a `-` prefix selects DESC. Joins permitted.
    /// Rendered for SELECT statements only. Each call replaces the list.
    pub fn order_by<I, S>(&self, paths: I) -> QuarryResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut terms = Vec::new();
        for raw in paths {
            let raw = raw.as_ref();
            let (descending, name) = raw
                .strip_prefix('-')
                .map_or((false, raw), |stripped| (true, stripped));
            terms.push(OrderTerm {
                path: self.parse_path(name, true)?,
                descending,
            });
        }
        let mut next = self.clone();
        next.order = terms;
        Ok(next)
    }

    /// Sets the INSERT payload. Relation paths with joins are rejected.
    /// Implies INSERT; last call wins.
    pub fn insert<I, K>(&self, pairs: I) -> QuarryResult<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut next = self.with_kind(QueryKind::Insert)?;
        next.write_values = pairs
            .into_iter()
            .map(|(key, value)| Ok((self.parse_write_target(key.as_ref())?, value)))
            .collect::<QuarryResult<_>>()?;
        Ok(next)
    }

    /// Sets the UPDATE payload. Relation paths with joins are rejected.
    /// Implies UPDATE; last call wins.
    pub fn update<I, K>(&self, pairs: I) -> QuarryResult<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut next = self.with_kind(QueryKind::Update)?;
        next.write_values = pairs
            .into_iter()
            .map(|(key, value)| Ok((self.parse_write_target(key.as_ref())?, value)))
            .collect::<QuarryResult<_>>()?;
        Ok(next)
    }

    /// Marks the query as a DELETE.
    pub fn delete(&self) -> QuarryResult<Self> {
        self.with_kind(QueryKind::Delete)
    }

    // ── Compilation ──────────────────────────────────────────────────

    /// Compiles the builder into SQL text and its positional parameters
    /// without executing anything.
    pub fn to_sql(&self) -> QuarryResult<(String, Vec<Value>)> {
        let mut params = Vec::new();
        let sql = self.compile(&mut params, 0)?;
        Ok((sql, params))
    }

    fn compile(&self, params: &mut Vec<Value>, depth: usize) -> QuarryResult<String> {
        if depth > 0 && !matches!(self.kind, None | Some(QueryKind::Select)) {
            return Err(QuarryError::SubqueryKind {
                model: self.model.name().to_string(),
            });
        }
        let kind = self.kind.unwrap_or(QueryKind::Select);

        // 1. the join plan, fed by every path that may traverse relations
        let mut tree = JoinTree::new(self.model.clone());
        if kind == QueryKind::Select {
            for path in &self.select_paths {
                tree.add_path(&path.segs)?;
            }
        }
        for path in &self.distinct_on {
            tree.add_path(&path.segs)?;
        }
        for term in &self.order {
            tree.add_path(&term.path.segs)?;
        }
        for predicate in &self.filters {
            tree.add_path(&predicate.path.segs)?;
        }
        for predicate in &self.excludes {
            tree.add_path(&predicate.path.segs)?;
        }

        // 2. UPDATE/DELETE cannot join directly; re-scope the filters as a
        //    primary-key subquery instead of dropping them
        if !tree.is_empty() && matches!(kind, QueryKind::Update | QueryKind::Delete) {
            return self.compile_join_rewrite(params, depth);
        }

        if kind == QueryKind::Insert && !(self.filters.is_empty() && self.excludes.is_empty()) {
            return Err(QuarryError::QueryTypeConflict {
                model: self.model.name().to_string(),
                current: "INSERT",
                requested: "WHERE filter",
            });
        }

        // 3. statement body
        let mut sql = match kind {
            QueryKind::Select => self.render_select(&tree, depth)?,
            QueryKind::Insert => self.render_insert(params)?,
            QueryKind::Update => self.render_update(params)?,
            QueryKind::Delete => format!("DELETE FROM \"{}\"", self.model.table_name()),
        };

        // 4./5. joins directly after FROM, then the WHERE clause
        if kind == QueryKind::Select && !tree.is_empty() {
            sql.push(' ');
            sql.push_str(&tree.render_sql());
        }

        let where_sql = self.render_where(&tree, params, depth)?;
        if !where_sql.is_empty() {
            sql.push(' ');
            sql.push_str(&where_sql);
        }

        // 6. ordering applies to row sets only
        if kind == QueryKind::Select && !self.order.is_empty() {
            sql.push(' ');
            sql.push_str(&self.render_order(&tree)?);
        }

        Ok(sql)
    }

    /// Replaces a joined UPDATE/DELETE with
    /// `WHERE <pk> IN (SELECT <pk> ... <same filters and joins>)`.
    /// The inner builder re-resolves every original path, so the identical
    /// join chain is reproduced at any depth.
    fn compile_join_rewrite(&self, params: &mut Vec<Value>, depth: usize) -> QuarryResult<String> {
        let mut inner = self.clone();
        inner.kind = Some(QueryKind::Select);
        inner.select_paths.clear();
        inner.write_values.clear();
        inner.is_distinct = false;
        inner.distinct_on.clear();

        let pk = self.model.schema().primary_key();
        let pk_path = self.parse_path(pk.column_name(), false)?;

        let mut outer = self.clone();
        outer.filters = vec![Predicate {
            path: pk_path,
            value: FilterValue::Subquery(Box::new(inner)),
        }];
        outer.excludes.clear();
        outer.order.clear();
        outer.compile(params, depth)
    }

    fn render_select(&self, tree: &JoinTree, depth: usize) -> QuarryResult<String> {
        let schema = self.model.schema();
        let table = schema.table_name();

        let columns: Vec<String> = if self.select_paths.is_empty() {
            if depth > 0 {
                // a subquery with no explicit projection yields the pk
                vec![format!(
                    "\"{table}\".\"{}\"",
                    schema.primary_key().column_name()
                )]
            } else {
                schema
                    .db_field_names()
                    .iter()
                    .map(|column| format!("\"{table}\".\"{column}\""))
                    .collect()
            }
        } else {
            self.select_paths
                .iter()
                .map(|path| Ok(tree.find_field(&path.segs)?.column_ref.to_sql()))
                .collect::<QuarryResult<_>>()?
        };

        let mut sql = String::from("SELECT ");
        if self.is_distinct {
            if self.distinct_on.is_empty() {
                sql.push_str("DISTINCT ");
            } else {
                let on: Vec<String> = self
                    .distinct_on
                    .iter()
                    .map(|path| Ok(tree.find_field(&path.segs)?.column_ref.to_sql()))
                    .collect::<QuarryResult<_>>()?;
                sql.push_str(&format!("DISTINCT ON ({}) ", on.join(", ")));
            }
        }
        sql.push_str(&columns.join(", "));
        sql.push_str(&format!(" FROM \"{table}\""));
        Ok(sql)
    }

    fn write_columns(&self) -> QuarryResult<Vec<String>> {
        if self.write_values.is_empty() {
            return Err(QuarryError::ArgumentType {
                model: self.model.name().to_string(),
                message: "requires at least one field".to_string(),
            });
        }
        self.write_values
            .iter()
            .map(|(path, _)| {
                let field = self
                    .model
                    .schema()
                    .field_by_name(&path.segs[0].name, false)
                    .ok_or_else(|| QuarryError::FieldNotFound {
                        model: self.model.name().to_string(),
                        field: path.raw.clone(),
                        choices: self.model.schema().field_names(),
                    })?;
                Ok(field.column_name().to_string())
            })
            .collect()
    }

    fn render_insert(&self, params: &mut Vec<Value>) -> QuarryResult<String> {
        let columns = self.write_columns()?;
        let mut placeholders = Vec::with_capacity(columns.len());
        for (_, value) in &self.write_values {
            params.push(value.clone());
            placeholders.push(format!("${}", params.len()));
        }
        let quoted: Vec<String> = columns.iter().map(|c| format!("\"{c}\"")).collect();
        Ok(format!(
            "INSERT INTO \"{}\" ({}) VALUES ({}) RETURNING *",
            self.model.table_name(),
            quoted.join(", "),
            placeholders.join(", ")
        ))
    }

    fn render_update(&self, params: &mut Vec<Value>) -> QuarryResult<String> {
        let columns = self.write_columns()?;
        let mut assignments = Vec::with_capacity(columns.len());
        for (column, (_, value)) in columns.iter().zip(&self.write_values) {
            params.push(value.clone());
            assignments.push(format!("\"{column}\" = ${}", params.len()));
        }
        Ok(format!(
            "UPDATE \"{}\" SET {}",
            self.model.table_name(),
            assignments.join(", ")
        ))
    }

    fn render_predicates(
        &self,
        predicates: &[Predicate],
        tree: &JoinTree,
        params: &mut Vec<Value>,
        depth: usize,
    ) -> QuarryResult<Vec<String>> {
        let mut clauses = Vec::with_capacity(predicates.len());
        for predicate in predicates {
            let column = tree.find_field(&predicate.path.segs)?.column_ref.to_sql();
            let clause = match &predicate.value {
                FilterValue::Eq(Value::Null) => format!("{column} IS NULL"),
                FilterValue::Eq(value) => {
                    params.push(value.clone());
                    format!("{column} = ${}", params.len())
                }
                FilterValue::In(values) => {
                    if values.is_empty() {
                        // PostgreSQL rejects `IN ()`; an empty list matches nothing
                        "1 = 0".to_string()
                    } else {
                        let mut placeholders = Vec::with_capacity(values.len());
                        for value in values {
                            params.push(value.clone());
                            placeholders.push(format!("${}", params.len()));
                        }
                        format!("{column} IN ({})", placeholders.join(", "))
                    }
                }
                FilterValue::Subquery(builder) => {
                    let sub_sql = builder.compile(params, depth + 1)?;
                    format!("{column} IN ({sub_sql})")
                }
            };
            clauses.push(clause);
        }
        Ok(clauses)
    }

    fn render_where(
        &self,
        tree: &JoinTree,
        params: &mut Vec<Value>,
        depth: usize,
    ) -> QuarryResult<String> {
        let positive = self.render_predicates(&self.filters, tree, params, depth)?;
        let negative = self.render_predicates(&self.excludes, tree, params, depth)?;

        let mut parts = Vec::new();
        if !positive.is_empty() {
            parts.push(positive.join(" AND "));
        }
        if !negative.is_empty() {
            let negated: Vec<String> = negative.iter().map(|c| format!("NOT {c}")).collect();
            parts.push(negated.join(" AND "));
        }
        if parts.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("WHERE {}", parts.join(" AND ")))
    }

    fn render_order(&self, tree: &JoinTree) -> QuarryResult<String> {
        let terms: Vec<String> = self
            .order
            .iter()
            .map(|term| {
                let column = tree.find_field(&term.path.segs)?.column_ref.to_sql();
                Ok(if term.descending {
                    format!("{column} DESC")
                } else {
                    column
                })
            })
            .collect::<QuarryResult<_>>()?;
        Ok(format!("ORDER BY {}", terms.join(", ")))
    }

    // ── Execution ────────────────────────────────────────────────────

    /// Compiles the query, dispatches it to the executor, and normalizes
    /// the result: row sets for SELECT/INSERT, an affected-row count for
    /// UPDATE/DELETE.
    pub async fn execute(&self, db: &dyn Executor) -> QuarryResult<QueryOutcome> {
        let (sql, params) = self.to_sql()?;
        let output = db.execute(&sql, &params).await?;
        Ok(match self.kind.unwrap_or(QueryKind::Select) {
            QueryKind::Select | QueryKind::Insert => QueryOutcome::Rows(output.rows),
            QueryKind::Update | QueryKind::Delete => QueryOutcome::Affected(output.row_count),
        })
    }
}
