use crate::error::RowmapError;
use crate::types::RowValues;

use super::{
    Filter, Query, QueryKind, RenderedSql, placeholders, push_identifier, push_identifier_list,
};

impl Query {
    /// Render `INSERT INTO <table> (<cols>) VALUES (?, ...)`.
    ///
    /// Columns come from the value set. A query without a value set inserts its equality
    /// filter entries instead; with neither, `DEFAULT VALUES` is rendered.
    ///
    /// # Errors
    /// Returns `RowmapError::InvalidArgument` if the query has a projection, has both a value
    /// set and a filter, or an `IN` filter would have to be inserted.
    pub fn render_insert_sql(&self) -> Result<RenderedSql, RowmapError> {
        self.check_parts(QueryKind::Insert)?;
        let pairs: Vec<(&str, &RowValues)> = if self.values.is_empty() {
            self.filter
                .iter()
                .map(|(column, filter)| match filter {
                    Filter::Eq(value) => Ok((column.as_str(), value)),
                    Filter::In(_) => Err(RowmapError::invalid_argument(format!(
                        "IN filter on {column} cannot be inserted into {}",
                        self.table
                    ))),
                })
                .collect::<Result<_, _>>()?
        } else {
            self.values
                .iter()
                .map(|(column, value)| (column.as_str(), value))
                .collect()
        };

        let mut sql = String::with_capacity(32 + self.table.len());
        sql.push_str("INSERT INTO ");
        push_identifier(&mut sql, &self.table);

        if pairs.is_empty() {
            sql.push_str(" DEFAULT VALUES");
            return Ok(RenderedSql {
                kind: QueryKind::Insert,
                sql,
                bindings: Vec::new(),
            });
        }

        sql.push_str(" (");
        push_identifier_list(&mut sql, pairs.iter().map(|(column, _)| *column));
        sql.push_str(") VALUES (");
        sql.push_str(&placeholders(pairs.len()));
        sql.push(')');

        Ok(RenderedSql {
            kind: QueryKind::Insert,
            sql,
            bindings: pairs.into_iter().map(|(_, value)| value.clone()).collect(),
        })
    }

    /// Render `UPDATE <table> SET <col> = ?, ... [WHERE ...]`.
    ///
    /// Bindings are the value set in order, followed by the filter in order.
    ///
    /// # Errors
    /// Returns `RowmapError::InvalidArgument` if the value set is empty or the query has a
    /// projection.
    pub fn render_update_sql(&self) -> Result<RenderedSql, RowmapError> {
        self.check_parts(QueryKind::Update)?;
        if self.values.is_empty() {
            return Err(RowmapError::invalid_argument(format!(
                "update of {} has no values to set",
                self.table
            )));
        }

        let mut sql = String::with_capacity(32 + self.table.len());
        sql.push_str("UPDATE ");
        push_identifier(&mut sql, &self.table);
        sql.push_str(" SET ");
        let mut bindings = Vec::with_capacity(self.values.len() + self.filter.len());
        for (i, (column, value)) in self.values.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            push_identifier(&mut sql, column);
            sql.push_str(" = ?");
            bindings.push(value.clone());
        }
        self.push_where(&mut sql, &mut bindings);

        Ok(RenderedSql {
            kind: QueryKind::Update,
            sql,
            bindings,
        })
    }

    /// Render `DELETE FROM <table> [WHERE ...]`.
    ///
    /// # Errors
    /// Returns `RowmapError::InvalidArgument` if the query has a projection or a value set.
    pub fn render_delete_sql(&self) -> Result<RenderedSql, RowmapError> {
        self.check_parts(QueryKind::Delete)?;

        let mut sql = String::with_capacity(16 + self.table.len());
        sql.push_str("DELETE FROM ");
        push_identifier(&mut sql, &self.table);
        let mut bindings = Vec::with_capacity(self.filter.len());
        self.push_where(&mut sql, &mut bindings);

        Ok(RenderedSql {
            kind: QueryKind::Delete,
            sql,
            bindings,
        })
    }
}
