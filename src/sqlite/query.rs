use std::sync::Arc;

use rusqlite::Statement;
use rusqlite::types::Value;

use crate::results::ResultRow;
use crate::types::RowValues;

use super::params::Params;

/// Bind `params`, step `stmt` to completion and collect one `ResultRow` per row.
///
/// Nothing is returned unless every step succeeds; a failure part-way drops the rows
/// collected so far.
///
/// # Errors
/// Returns the driver error from binding or stepping unchanged, so callers can retry on busy.
pub fn collect_rows(stmt: &mut Statement<'_>, params: &Params) -> rusqlite::Result<Vec<ResultRow>> {
    let column_names: Arc<Vec<String>> = Arc::new(
        stmt.column_names()
            .iter()
            .map(std::string::ToString::to_string)
            .collect(),
    );
    let index_cache = ResultRow::index_cache(&column_names);
    let col_count = column_names.len();

    let mut rows = stmt.query(params.as_params())?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            let value: Value = row.get(i)?;
            values.push(from_sqlite_value(value));
        }
        out.push(ResultRow::with_shared_columns(
            Arc::clone(&column_names),
            Arc::clone(&index_cache),
            values,
        ));
    }
    Ok(out)
}

/// Map a `SQLite` storage value onto `RowValues`.
#[must_use]
pub fn from_sqlite_value(value: Value) -> RowValues {
    match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    }
}
