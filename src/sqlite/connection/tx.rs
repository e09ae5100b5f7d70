use rusqlite::TransactionBehavior;
use tracing::debug;

use crate::error::RowmapError;

use super::{Connection, Session};

impl Connection {
    /// True while the driver is outside autocommit mode, however the transaction was begun.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|conn| !conn.is_autocommit())
    }

    /// Begin a deferred transaction.
    ///
    /// # Errors
    /// Returns `RowmapError::InvalidState` if a transaction is already open (nesting is not
    /// supported), `RowmapError::NotConnected` when closed, and driver errors otherwise.
    pub fn begin_transaction(&mut self) -> Result<(), RowmapError> {
        self.begin_transaction_with(TransactionBehavior::Deferred)
    }

    /// Begin a transaction with an explicit locking behavior.
    ///
    /// # Errors
    /// Same as [`Connection::begin_transaction`].
    pub fn begin_transaction_with(
        &mut self,
        behavior: TransactionBehavior,
    ) -> Result<(), RowmapError> {
        let sql = match behavior {
            TransactionBehavior::Immediate => "BEGIN IMMEDIATE",
            TransactionBehavior::Exclusive => "BEGIN EXCLUSIVE",
            _ => "BEGIN DEFERRED",
        };
        self.run_tx_statement("begin transaction", sql, false)
    }

    /// Commit the open transaction.
    ///
    /// # Errors
    /// Returns `RowmapError::InvalidState` if no transaction is open, and driver errors
    /// otherwise. A busy commit is retried; the transaction stays open if it still fails.
    pub fn commit(&mut self) -> Result<(), RowmapError> {
        self.run_tx_statement("commit", "COMMIT", true)
    }

    /// Roll back the open transaction.
    ///
    /// # Errors
    /// Returns `RowmapError::InvalidState` if no transaction is open, and driver errors
    /// otherwise.
    pub fn rollback(&mut self) -> Result<(), RowmapError> {
        self.run_tx_statement("rollback", "ROLLBACK", true)
    }

    fn run_tx_statement(
        &mut self,
        ctx: &str,
        sql: &str,
        needs_transaction: bool,
    ) -> Result<(), RowmapError> {
        let Session {
            conn,
            policy,
            started,
        } = self.session(ctx)?;
        let active = !conn.is_autocommit();
        if needs_transaction && !active {
            return Err(RowmapError::invalid_state(format!(
                "{ctx}: no transaction in progress"
            )));
        }
        if !needs_transaction && active {
            return Err(RowmapError::invalid_state(format!(
                "{ctx}: transaction already in progress"
            )));
        }
        debug!(sql, "{ctx}");
        policy.run(started, ctx, || conn.execute_batch(sql))
    }
}
