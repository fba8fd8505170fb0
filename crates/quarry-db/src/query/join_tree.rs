//! Per-query join resolution.
//!
//! The [`JoinTree`] turns relation paths into a deduplicated, aliased join
//! plan. Nodes at a tree position are keyed by `(target table, join kind)`;
//! a second distinct position reaching the same table allocates `table__T2`,
//! `table__T3`, and so on, so one query may join the same physical table
//! through several relationship paths without ambiguity.
//!
//! A tree belongs to exactly one compilation: the builder constructs a fresh
//! tree each time it compiles, so sibling builders never share alias state.

use std::collections::HashMap;

use quarry_core::{QuarryError, QuarryResult};

use crate::fields::{FieldKind, FieldSpec};
use crate::model::Model;

use super::path::PathSeg;

/// SQL join kinds a relation path can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    /// `INNER JOIN`, requested by a `.` separator.
    Inner,
    /// `LEFT JOIN`, requested by a `__` separator.
    Left,
}

impl JoinKind {
    /// Returns the SQL keywords for this join kind.
    pub const fn sql_keyword(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
        }
    }
}

/// A fully-qualified column reference, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// The table alias (equal to the table name for unaliased tables).
    pub alias: String,
    /// The physical column name.
    pub column: String,
}

impl ColumnRef {
    /// Renders `"alias"."column"`.
    pub fn to_sql(&self) -> String {
        format!("\"{}\".\"{}\"", self.alias, self.column)
    }
}

/// What a relation path resolves to: the field it lands on and the column
/// reference used to render it.
#[derive(Debug, Clone)]
pub struct ResolvedField {
    /// The terminal field.
    pub field: FieldSpec,
    /// The reference to render.
    pub column_ref: ColumnRef,
}

#[derive(Debug, Clone)]
struct JoinNode {
    table: String,
    kind: JoinKind,
    alias: String,
    /// Column on the joined table the ON clause compares.
    on_column: String,
    parent_alias: String,
    parent_column: String,
    /// The model reached by this hop.
    model: Model,
    children: Vec<JoinNode>,
}

/// The per-query join plan.
#[derive(Debug, Clone)]
pub struct JoinTree {
    model: Model,
    /// Per-table alias counter; the root table is pre-seeded so a join back
    /// to it aliases as `<root>__T2`.
    table_counts: HashMap<String, u32>,
    children: Vec<JoinNode>,
}

fn field_not_found(model: &Model, name: &str) -> QuarryError {
    QuarryError::FieldNotFound {
        model: model.name().to_string(),
        field: name.to_string(),
        choices: model.schema().field_names(),
    }
}

fn not_a_relation(model: &Model, name: &str) -> QuarryError {
    QuarryError::ArgumentType {
        model: model.name().to_string(),
        message: format!("field '{name}' is not a relation and cannot be joined through"),
    }
}

fn unresolved(model: &Model) -> QuarryError {
    QuarryError::ArgumentType {
        model: model.name().to_string(),
        message: "relation path was not resolved into the join plan".to_string(),
    }
}

fn lookup_field(model: &Model, name: &str) -> QuarryResult<FieldSpec> {
    model
        .schema()
        .field_by_name(name, true)
        .ok_or_else(|| field_not_found(model, name))
}

fn find_or_create(
    children: &mut Vec<JoinNode>,
    counts: &mut HashMap<String, u32>,
    target: &Model,
    kind: JoinKind,
    on_column: String,
    parent_alias: &str,
    parent_column: String,
) -> usize {
    let table = target.table_name();
    if let Some(idx) = children
        .iter()
        .position(|n| n.table == table && n.kind == kind)
    {
        return idx;
    }

    let count = counts
        .entry(table.to_string())
        .and_modify(|c| *c += 1)
        .or_insert(1);
    let alias = if *count == 1 {
        table.to_string()
    } else {
        format!("{table}__T{count}")
    };

    children.push(JoinNode {
        table: table.to_string(),
        kind,
        alias,
        on_column,
        parent_alias: parent_alias.to_string(),
        parent_column,
        model: target.clone(),
        children: Vec::new(),
    });
    children.len() - 1
}

impl JoinTree {
    /// Creates an empty tree rooted at `model`.
    pub fn new(model: Model) -> Self {
        let mut table_counts = HashMap::new();
        table_counts.insert(model.table_name().to_string(), 1);
        Self {
            model,
            table_counts,
            children: Vec::new(),
        }
    }

    /// Returns `true` when no joins have been recorded.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Records the joins a relation path implies, reusing nodes already
    /// created for identical `(table, kind)` hops at the same position.
    ///
    /// A terminal forward foreign key creates no join (the local FK column
    /// already carries the value); a terminal reverse relation joins its
    /// source table.
    pub fn add_path(&mut self, segs: &[PathSeg]) -> QuarryResult<()> {
        let counts = &mut self.table_counts;
        let mut children = &mut self.children;
        let mut model = self.model.clone();
        let mut parent_alias = model.table_name().to_string();

        for (i, seg) in segs.iter().enumerate() {
            let terminal = i + 1 == segs.len();
            let field = lookup_field(&model, &seg.name)?;

            match field.kind() {
                FieldKind::ForeignKey { target } => {
                    if terminal {
                        break;
                    }
                    let kind = seg.join.unwrap_or(JoinKind::Inner);
                    let on_column = target.schema().primary_key().column_name().to_string();
                    let parent_column = field.column_name().to_string();
                    let idx = find_or_create(
                        children,
                        counts,
                        target,
                        kind,
                        on_column,
                        &parent_alias,
                        parent_column,
                    );
                    parent_alias = children[idx].alias.clone();
                    model = children[idx].model.clone();
                    children = &mut children[idx].children;
                }
                FieldKind::Related { source, fk_column } => {
                    let kind = seg.join.unwrap_or(JoinKind::Inner);
                    let on_column = fk_column.clone();
                    let parent_column = model.schema().primary_key().column_name().to_string();
                    let idx = find_or_create(
                        children,
                        counts,
                        source,
                        kind,
                        on_column,
                        &parent_alias,
                        parent_column,
                    );
                    parent_alias = children[idx].alias.clone();
                    model = children[idx].model.clone();
                    children = &mut children[idx].children;
                    if terminal {
                        break;
                    }
                }
                _ => {
                    if !terminal {
                        return Err(not_a_relation(&model, &seg.name));
                    }
                }
            }
        }
        Ok(())
    }

    /// Resolves a previously-recorded path to the field it lands on and the
    /// aliased column reference that renders it.
    pub fn find_field(&self, segs: &[PathSeg]) -> QuarryResult<ResolvedField> {
        let mut children = &self.children;
        let mut model = self.model.clone();
        let mut alias = model.table_name().to_string();

        for (i, seg) in segs.iter().enumerate() {
            let terminal = i + 1 == segs.len();
            let field = lookup_field(&model, &seg.name)?;

            match field.kind() {
                FieldKind::ForeignKey { target } => {
                    if terminal {
                        let column_ref = ColumnRef {
                            alias,
                            column: field.column_name().to_string(),
                        };
                        return Ok(ResolvedField { field, column_ref });
                    }
                    let kind = seg.join.unwrap_or(JoinKind::Inner);
                    let node = children
                        .iter()
                        .find(|n| n.table == target.table_name() && n.kind == kind)
                        .ok_or_else(|| unresolved(&model))?;
                    alias = node.alias.clone();
                    model = node.model.clone();
                    children = &node.children;
                }
                FieldKind::Related { source, .. } => {
                    let kind = seg.join.unwrap_or(JoinKind::Inner);
                    let node = children
                        .iter()
                        .find(|n| n.table == source.table_name() && n.kind == kind)
                        .ok_or_else(|| unresolved(&model))?;
                    alias = node.alias.clone();
                    if terminal {
                        let pk = node.model.schema().primary_key();
                        let column_ref = ColumnRef {
                            alias,
                            column: pk.column_name().to_string(),
                        };
                        return Ok(ResolvedField {
                            field: pk,
                            column_ref,
                        });
                    }
                    model = node.model.clone();
                    children = &node.children;
                }
                _ => {
                    let column_ref = ColumnRef {
                        alias,
                        column: field.column_name().to_string(),
                    };
                    return Ok(ResolvedField { field, column_ref });
                }
            }
        }
        Err(unresolved(&self.model))
    }

    /// Renders the JOIN clauses, depth-first in insertion order.
    pub fn render_sql(&self) -> String {
        fn render_node(node: &JoinNode, out: &mut Vec<String>) {
            let mut sql = format!("{} \"{}\"", node.kind.sql_keyword(), node.table);
            if node.alias != node.table {
                sql.push_str(&format!(" \"{}\"", node.alias));
            }
            sql.push_str(&format!(
                " ON \"{}\".\"{}\" = \"{}\".\"{}\"",
                node.alias, node.on_column, node.parent_alias, node.parent_column
            ));
            out.push(sql);
            for child in &node.children {
                render_node(child, out);
            }
        }

        let mut clauses = Vec::new();
        for node in &self.children {
            render_node(node, &mut clauses);
        }
        clauses.join(" ")
    }
}
