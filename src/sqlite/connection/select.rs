use tracing::debug;

use crate::error::RowmapError;
use crate::query_builder::{Query, RenderedSql};
use crate::results::ResultRow;
use crate::sqlite::params::Params;
use crate::sqlite::query::collect_rows;

use super::{Connection, Session};

impl Connection {
    /// Render a select, bind its filter values and collect every row in driver order.
    ///
    /// No matching rows is `Ok(vec![])`. If stepping fails part-way, the rows read so far
    /// are dropped and only the error is returned.
    ///
    /// # Errors
    /// Returns `RowmapError::InvalidArgument` for a non-select query,
    /// `RowmapError::NotConnected` when closed, and `RowmapError::Driver` /
    /// `RowmapError::BusyTimeout` from the driver.
    pub fn execute_query(&mut self, query: &Query) -> Result<Vec<ResultRow>, RowmapError> {
        if !query.kind().is_select() {
            return Err(RowmapError::invalid_argument(format!(
                "{:?} on {} passed to execute_query",
                query.kind(),
                query.table()
            )));
        }
        self.execute_rendered_query(&query.render_select_sql()?)
    }

    /// Run already-rendered select SQL.
    ///
    /// # Errors
    /// Same as [`Connection::execute_query`].
    pub fn execute_rendered_query(
        &mut self,
        rendered: &RenderedSql,
    ) -> Result<Vec<ResultRow>, RowmapError> {
        if !rendered.kind.is_select() {
            return Err(RowmapError::invalid_argument(
                "non-select SQL passed to execute_rendered_query",
            ));
        }
        let params = Params::convert(&rendered.bindings);
        self.select_rows("execute query", &rendered.sql, &params)
    }

    /// Run a raw, non-parameterized query and collect its rows.
    ///
    /// # Errors
    /// Returns `RowmapError::NotConnected` when closed, and `RowmapError::Driver` /
    /// `RowmapError::BusyTimeout` from the driver.
    pub fn execute_raw_query(&mut self, sql: &str) -> Result<Vec<ResultRow>, RowmapError> {
        self.select_rows("execute raw query", sql, &Params(Vec::new()))
    }

    fn select_rows(
        &mut self,
        ctx: &str,
        sql: &str,
        params: &Params,
    ) -> Result<Vec<ResultRow>, RowmapError> {
        let Session {
            conn,
            policy,
            started,
        } = self.session(ctx)?;
        debug!(sql, bindings = params.len(), "{ctx}");

        let mut stmt = policy.run(started, "prepare", || conn.prepare(sql))?;
        let rows = policy.run(started, "step", || collect_rows(&mut stmt, params))?;
        debug!(rows = rows.len(), "query returned");
        Ok(rows)
    }
}
