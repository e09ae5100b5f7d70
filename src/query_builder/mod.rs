//! Declarative query descriptions and their rendering into parameterized SQL.
//!
//! A [`QueryBuilder`] validates every identifier as it is added and yields an immutable
//! [`Query`]. Rendering is a pure function of the `Query`: the same query always renders to
//! the same SQL text and the same ordered bindings, because every list inside it keeps
//! insertion order.
//!
//! ```rust
//! use sqlite_rowmap::prelude::*;
//!
//! # fn demo() -> Result<(), RowmapError> {
//! let query = QueryBuilder::select("users")?
//!     .columns(["id", "name"])?
//!     .filter("name", "alice")?
//!     .filter_in("status", ["active", "invited"])?
//!     .build();
//! let rendered = query.render_select_sql()?;
//! assert_eq!(
//!     rendered.sql,
//!     "SELECT id, name FROM users WHERE name = ? AND status IN (?, ?)"
//! );
//! assert_eq!(rendered.bindings.len(), 3);
//! # Ok(())
//! # }
//! ```
//!
//! Each statement only takes the parts it can express: a projection belongs to a select, a
//! value set to an insert or update. Adding a part the query's kind cannot use fails at
//! that call, and rendering a query as a statement that would have to drop one of its
//! parts fails too.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::RowmapError;
use crate::types::RowValues;

mod dml;
mod render;
mod select;

pub use render::{RenderedSql, SqlRenderer};

lazy_static! {
    // plain or schema-qualified identifier, no quoting or escaping needed
    static ref IDENTIFIER: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
            .expect("identifier pattern is valid");

    // SQLite keywords; an identifier segment spelled like one is rendered double-quoted
    static ref KEYWORDS: HashSet<&'static str> = [
        "ABORT", "ACTION", "ADD", "AFTER", "ALL", "ALTER", "ALWAYS", "ANALYZE", "AND", "AS",
        "ASC", "ATTACH", "AUTOINCREMENT", "BEFORE", "BEGIN", "BETWEEN", "BY", "CASCADE",
        "CASE", "CAST", "CHECK", "COLLATE", "COLUMN", "COMMIT", "CONFLICT", "CONSTRAINT",
        "CREATE", "CROSS", "CURRENT", "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP",
        "DATABASE", "DEFAULT", "DEFERRABLE", "DEFERRED", "DELETE", "DESC", "DETACH",
        "DISTINCT", "DO", "DROP", "EACH", "ELSE", "END", "ESCAPE", "EXCEPT", "EXCLUDE",
        "EXCLUSIVE", "EXISTS", "EXPLAIN", "FAIL", "FILTER", "FIRST", "FOLLOWING", "FOR",
        "FOREIGN", "FROM", "FULL", "GENERATED", "GLOB", "GROUP", "GROUPS", "HAVING", "IF",
        "IGNORE", "IMMEDIATE", "IN", "INDEX", "INDEXED", "INITIALLY", "INNER", "INSERT",
        "INSTEAD", "INTERSECT", "INTO", "IS", "ISNULL", "JOIN", "KEY", "LAST", "LEFT", "LIKE",
        "LIMIT", "MATCH", "MATERIALIZED", "NATURAL", "NO", "NOT", "NOTHING", "NOTNULL",
        "NULL", "NULLS", "OF", "OFFSET", "ON", "OR", "ORDER", "OTHERS", "OUTER", "OVER",
        "PARTITION", "PLAN", "PRAGMA", "PRECEDING", "PRIMARY", "QUERY", "RAISE", "RANGE",
        "RECURSIVE", "REFERENCES", "REGEXP", "REINDEX", "RELEASE", "RENAME", "REPLACE",
        "RESTRICT", "RETURNING", "RIGHT", "ROLLBACK", "ROW", "ROWS", "SAVEPOINT", "SELECT",
        "SET", "TABLE", "TEMP", "TEMPORARY", "THEN", "TIES", "TO", "TRANSACTION", "TRIGGER",
        "UNBOUNDED", "UNION", "UNIQUE", "UPDATE", "USING", "VACUUM", "VALUES", "VIEW",
        "VIRTUAL", "WHEN", "WHERE", "WINDOW", "WITH", "WITHOUT",
    ]
    .into_iter()
    .collect();
}

/// Check that `name` is a plain or schema-qualified identifier that is safe to render.
///
/// Segments spelled like an SQL keyword (`order`, `group`) are accepted and rendered
/// double-quoted.
///
/// # Errors
/// Returns `RowmapError::InvalidArgument` naming `what` when the identifier is empty or unsafe.
pub fn validate_identifier(name: &str, what: &str) -> Result<(), RowmapError> {
    if name.is_empty() {
        return Err(RowmapError::invalid_argument(format!("{what} name is empty")));
    }
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(RowmapError::invalid_argument(format!(
            "{what} name {name:?} is not a safe identifier"
        )))
    }
}

/// Which statement a query renders to by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl QueryKind {
    #[must_use]
    pub fn is_select(self) -> bool {
        matches!(self, QueryKind::Select)
    }
}

/// One predicate entry. Entries are joined with `AND`.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = ?`
    Eq(RowValues),
    /// `column IN (?, ?, ...)`; never empty
    In(Vec<RowValues>),
}

impl Filter {
    /// Number of placeholders this entry renders.
    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        match self {
            Filter::Eq(_) => 1,
            Filter::In(values) => values.len(),
        }
    }
}

/// Immutable description of a table, a projection, a value set and a filter.
///
/// Built with [`QueryBuilder`]; rendered with [`Query::render`] or the kind-specific
/// `render_*_sql` methods.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    kind: QueryKind,
    table: String,
    columns: Vec<String>,
    values: Vec<(String, RowValues)>,
    filter: Vec<(String, Filter)>,
}

impl Query {
    #[must_use]
    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Projection; empty means every column.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Value set for inserts and updates, in insertion order.
    #[must_use]
    pub fn values(&self) -> &[(String, RowValues)] {
        &self.values
    }

    /// Filter entries, in insertion order.
    #[must_use]
    pub fn filter(&self) -> &[(String, Filter)] {
        &self.filter
    }

    /// Render the statement matching this query's kind.
    ///
    /// # Errors
    /// Returns `RowmapError::InvalidArgument` when the query cannot be rendered as its kind
    /// (see the `render_*_sql` methods).
    pub fn render(&self) -> Result<RenderedSql, RowmapError> {
        match self.kind {
            QueryKind::Select => self.render_select_sql(),
            QueryKind::Insert => self.render_insert_sql(),
            QueryKind::Update => self.render_update_sql(),
            QueryKind::Delete => self.render_delete_sql(),
        }
    }

    /// Fail when the query carries a part that `statement` would have to drop.
    pub(crate) fn check_parts(&self, statement: QueryKind) -> Result<(), RowmapError> {
        let has_projection = !self.columns.is_empty();
        let has_values = !self.values.is_empty();
        let stray = match statement {
            QueryKind::Select => has_values.then_some("a value set"),
            QueryKind::Insert if has_projection => Some("a projection"),
            QueryKind::Insert => {
                (has_values && !self.filter.is_empty()).then_some("both a value set and a filter")
            }
            QueryKind::Update => has_projection.then_some("a projection"),
            QueryKind::Delete if has_projection => Some("a projection"),
            QueryKind::Delete => has_values.then_some("a value set"),
        };
        match stray {
            Some(part) => Err(RowmapError::invalid_argument(format!(
                "{statement:?} on {} cannot use {part}",
                self.table
            ))),
            None => Ok(()),
        }
    }

    /// Append ` WHERE ...` for the filter, if any, pushing its bindings in the same order.
    fn push_where(&self, sql: &mut String, bindings: &mut Vec<RowValues>) {
        if self.filter.is_empty() {
            return;
        }
        sql.push_str(" WHERE ");
        for (i, (column, filter)) in self.filter.iter().enumerate() {
            if i > 0 {
                sql.push_str(" AND ");
            }
            push_identifier(sql, column);
            match filter {
                Filter::Eq(value) => {
                    sql.push_str(" = ?");
                    bindings.push(value.clone());
                }
                Filter::In(values) => {
                    sql.push_str(" IN (");
                    sql.push_str(&placeholders(values.len()));
                    sql.push(')');
                    bindings.extend(values.iter().cloned());
                }
            }
        }
    }
}

/// Append a validated identifier, double-quoting every segment that is a keyword.
pub(crate) fn push_identifier(sql: &mut String, name: &str) {
    for (i, segment) in name.split('.').enumerate() {
        if i > 0 {
            sql.push('.');
        }
        if KEYWORDS.contains(segment.to_ascii_uppercase().as_str()) {
            sql.push('"');
            sql.push_str(segment);
            sql.push('"');
        } else {
            sql.push_str(segment);
        }
    }
}

/// Append `names` as a comma-separated identifier list.
pub(crate) fn push_identifier_list<'a>(sql: &mut String, names: impl IntoIterator<Item = &'a str>) {
    for (i, name) in names.into_iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        push_identifier(sql, name);
    }
}

/// `?, ?, ?` for `count` placeholders.
pub(crate) fn placeholders(count: usize) -> String {
    let mut out = String::with_capacity(count * 3);
    for i in 0..count {
        if i > 0 {
            out.push_str(", ");
        }
        out.push('?');
    }
    out
}

/// Insert `key` or replace its value in place, keeping first-insertion order.
fn upsert<V>(entries: &mut Vec<(String, V)>, key: String, value: V) {
    if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == key) {
        slot.1 = value;
    } else {
        entries.push((key, value));
    }
}

/// Fluent builder for [`Query`].
///
/// Every method validates its identifiers and fails with `RowmapError::InvalidArgument`
/// before anything can reach the driver.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    fn with_kind(kind: QueryKind, table: &str) -> Result<Self, RowmapError> {
        validate_identifier(table, "table")?;
        Ok(Self {
            query: Query {
                kind,
                table: table.to_owned(),
                columns: Vec::new(),
                values: Vec::new(),
                filter: Vec::new(),
            },
        })
    }

    /// Select-shaped builder with an optional projection; `None` and an empty list both mean
    /// every column.
    ///
    /// # Errors
    /// Returns `RowmapError::InvalidArgument` if the table or a column name is unsafe.
    pub fn new<I, S>(table: &str, columns: Option<I>) -> Result<Self, RowmapError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let builder = Self::with_kind(QueryKind::Select, table)?;
        match columns {
            Some(columns) => builder.columns(columns),
            None => Ok(builder),
        }
    }

    /// # Errors
    /// Returns `RowmapError::InvalidArgument` if the table name is empty or unsafe.
    pub fn select(table: &str) -> Result<Self, RowmapError> {
        Self::with_kind(QueryKind::Select, table)
    }

    /// # Errors
    /// Returns `RowmapError::InvalidArgument` if the table name is empty or unsafe.
    pub fn insert(table: &str) -> Result<Self, RowmapError> {
        Self::with_kind(QueryKind::Insert, table)
    }

    /// # Errors
    /// Returns `RowmapError::InvalidArgument` if the table name is empty or unsafe.
    pub fn update(table: &str) -> Result<Self, RowmapError> {
        Self::with_kind(QueryKind::Update, table)
    }

    /// # Errors
    /// Returns `RowmapError::InvalidArgument` if the table name is empty or unsafe.
    pub fn delete(table: &str) -> Result<Self, RowmapError> {
        Self::with_kind(QueryKind::Delete, table)
    }

    /// Append columns to the projection. Only selects take one.
    ///
    /// # Errors
    /// Returns `RowmapError::InvalidArgument` if a column name is unsafe or the query is not a
    /// select.
    pub fn columns<I, S>(mut self, columns: I) -> Result<Self, RowmapError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for column in columns {
            let column = column.as_ref();
            validate_identifier(column, "column")?;
            self.query.columns.push(column.to_owned());
        }
        self.checked()
    }

    /// # Errors
    /// Returns `RowmapError::InvalidArgument` if the column name is unsafe.
    pub fn column(self, column: &str) -> Result<Self, RowmapError> {
        self.columns([column])
    }

    /// Add or replace an equality filter entry.
    ///
    /// On an insert, equality entries stand in for the value set and cannot be mixed with it.
    ///
    /// # Errors
    /// Returns `RowmapError::InvalidArgument` if the column name is unsafe, or the query is
    /// an insert that already has a value set.
    pub fn filter(mut self, column: &str, value: impl Into<RowValues>) -> Result<Self, RowmapError> {
        validate_identifier(column, "filter column")?;
        upsert(
            &mut self.query.filter,
            column.to_owned(),
            Filter::Eq(value.into()),
        );
        self.checked()
    }

    /// Add or replace an `IN` filter entry.
    ///
    /// # Errors
    /// Returns `RowmapError::InvalidArgument` if the column name is unsafe or `values` is empty.
    pub fn filter_in<I, V>(mut self, column: &str, values: I) -> Result<Self, RowmapError>
    where
        I: IntoIterator<Item = V>,
        V: Into<RowValues>,
    {
        validate_identifier(column, "filter column")?;
        let values: Vec<RowValues> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(RowmapError::invalid_argument(format!(
                "IN filter on {column} has no values"
            )));
        }
        upsert(&mut self.query.filter, column.to_owned(), Filter::In(values));
        self.checked()
    }

    /// Merge equality filter entries in iteration order.
    ///
    /// # Errors
    /// Returns `RowmapError::InvalidArgument` if any column name is unsafe.
    pub fn filters<I, K, V>(self, entries: I) -> Result<Self, RowmapError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<RowValues>,
    {
        entries
            .into_iter()
            .try_fold(self, |builder, (column, value)| {
                builder.filter(column.as_ref(), value)
            })
    }

    /// Add or replace a value in the insert/update value set.
    ///
    /// # Errors
    /// Returns `RowmapError::InvalidArgument` if the column name is unsafe, the query is a
    /// select or delete, or it is an insert that already has filter entries.
    pub fn value(mut self, column: &str, value: impl Into<RowValues>) -> Result<Self, RowmapError> {
        validate_identifier(column, "value column")?;
        upsert(&mut self.query.values, column.to_owned(), value.into());
        self.checked()
    }

    /// Merge values in iteration order.
    ///
    /// # Errors
    /// Returns `RowmapError::InvalidArgument` if any column name is unsafe.
    pub fn values<I, K, V>(self, entries: I) -> Result<Self, RowmapError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<RowValues>,
    {
        entries
            .into_iter()
            .try_fold(self, |builder, (column, value)| {
                builder.value(column.as_ref(), value)
            })
    }

    fn checked(self) -> Result<Self, RowmapError> {
        self.query.check_parts(self.query.kind)?;
        Ok(self)
    }

    #[must_use]
    pub fn build(self) -> Query {
        self.query
    }
}
