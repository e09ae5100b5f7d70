use tracing::debug;

use crate::error::RowmapError;
use crate::query_builder::{Query, QueryKind, RenderedSql};
use crate::sqlite::params::Params;

use super::{Connection, Session};

/// What a successful [`Connection::execute_update`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// An insert, with the row id `SQLite` assigned.
    Inserted { row_id: i64 },
    /// An update or delete, with the number of rows it touched.
    Affected { rows: usize },
}

impl UpdateOutcome {
    #[must_use]
    pub fn row_id(&self) -> Option<i64> {
        match self {
            UpdateOutcome::Inserted { row_id } => Some(*row_id),
            UpdateOutcome::Affected { .. } => None,
        }
    }

    #[must_use]
    pub fn rows_affected(&self) -> Option<usize> {
        match self {
            UpdateOutcome::Affected { rows } => Some(*rows),
            UpdateOutcome::Inserted { .. } => None,
        }
    }
}

impl Connection {
    /// Render an insert, update or delete, bind its values in order and run it once.
    ///
    /// Inserts also record the new row id, see [`Connection::last_insert_row_id`].
    ///
    /// # Errors
    /// Returns `RowmapError::InvalidArgument` for a select query or one that cannot be
    /// rendered, `RowmapError::NotConnected` when closed, and `RowmapError::Driver` /
    /// `RowmapError::BusyTimeout` from the driver.
    pub fn execute_update(&mut self, query: &Query) -> Result<UpdateOutcome, RowmapError> {
        if query.kind().is_select() {
            return Err(RowmapError::invalid_argument(format!(
                "select on {} passed to execute_update",
                query.table()
            )));
        }
        let rendered = query.render()?;
        self.execute_rendered_update(&rendered)
    }

    /// Run already-rendered insert/update/delete SQL.
    ///
    /// # Errors
    /// Same as [`Connection::execute_update`].
    pub fn execute_rendered_update(
        &mut self,
        rendered: &RenderedSql,
    ) -> Result<UpdateOutcome, RowmapError> {
        if rendered.kind.is_select() {
            return Err(RowmapError::invalid_argument(
                "select SQL passed to execute_rendered_update",
            ));
        }
        let params = Params::convert(&rendered.bindings);
        let Session {
            conn,
            policy,
            started,
        } = self.session("execute update")?;
        debug!(sql = %rendered.sql, bindings = params.len(), "execute update");

        let mut stmt = policy.run(started, "prepare", || conn.prepare(&rendered.sql))?;
        let rows = policy.run(started, "step", || stmt.execute(params.as_params()))?;
        let outcome = match rendered.kind {
            QueryKind::Insert => UpdateOutcome::Inserted {
                row_id: conn.last_insert_rowid(),
            },
            _ => UpdateOutcome::Affected { rows },
        };
        drop(stmt);

        if let UpdateOutcome::Inserted { row_id } = outcome {
            self.last_insert_row_id = Some(row_id);
        }
        debug!(?outcome, "update applied");
        Ok(outcome)
    }
}
