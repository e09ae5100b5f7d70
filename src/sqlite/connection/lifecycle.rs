use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rusqlite::ErrorCode;
use rusqlite::fallible_iterator::FallibleIterator;
use tracing::{debug, info, warn};

use crate::error::{RowmapError, driver_code_and_message};
use crate::sqlite::busy::BusyRetryPolicy;
use crate::sqlite::config::ConnectionOptions;

/// A single `SQLite` database handle with busy-retry and transaction tracking.
///
/// `Closed -> Open -> Closed`, re-openable. Every operation except [`Connection::open`]
/// fails with `RowmapError::NotConnected` while closed. The handle is closed on drop.
pub struct Connection {
    pub(crate) options: ConnectionOptions,
    pub(crate) handle: Option<rusqlite::Connection>,
    pub(crate) busy_retry: BusyRetryPolicy,
    // start of the current statement's retry window, cleared per statement
    pub(crate) busy_retry_started: Option<Instant>,
    pub(crate) last_insert_row_id: Option<i64>,
}

/// Borrowed pieces of an open connection needed to run one statement under busy-retry.
pub(crate) struct Session<'a> {
    pub(crate) conn: &'a rusqlite::Connection,
    pub(crate) policy: BusyRetryPolicy,
    pub(crate) started: &'a mut Option<Instant>,
}

impl Connection {
    /// Create a closed connection; call [`Connection::open`] before use.
    #[must_use]
    pub fn new(options: ConnectionOptions) -> Self {
        let busy_retry = options.busy_retry_policy();
        Self {
            options,
            handle: None,
            busy_retry,
            busy_retry_started: None,
            last_insert_row_id: None,
        }
    }

    #[must_use]
    pub fn with_path(db_path: impl Into<PathBuf>) -> Self {
        Self::new(ConnectionOptions::new(db_path))
    }

    /// Create and open a connection to `db_path` with default options.
    ///
    /// # Errors
    /// See [`Connection::open`].
    pub fn open_path(db_path: impl Into<PathBuf>) -> Result<Self, RowmapError> {
        let mut conn = Self::with_path(db_path);
        conn.open()?;
        Ok(conn)
    }

    /// Create and open a private in-memory database.
    ///
    /// # Errors
    /// See [`Connection::open`].
    pub fn open_in_memory() -> Result<Self, RowmapError> {
        let mut conn = Self::new(ConnectionOptions::in_memory());
        conn.open()?;
        Ok(conn)
    }

    /// Acquire the driver handle for the configured path.
    ///
    /// The driver's own busy handler is switched off so busy responses come back to this
    /// connection's retry loop.
    ///
    /// # Errors
    /// Returns `RowmapError::InvalidState` if already open, `RowmapError::Io` if the file
    /// cannot be opened, and `RowmapError::Driver` for other driver failures.
    pub fn open(&mut self) -> Result<(), RowmapError> {
        if self.handle.is_some() {
            return Err(RowmapError::invalid_state("connection is already open"));
        }
        let path = self.options.db_path.clone();
        let conn = rusqlite::Connection::open_with_flags(&path, self.options.open_flags())
            .map_err(|err| open_error(&path, err))?;
        conn.busy_timeout(Duration::ZERO)?;

        self.busy_retry_started = None;
        if self.options.wal && !self.options.is_in_memory() {
            let mode: String = self.busy_retry.run(
                &mut self.busy_retry_started,
                "journal_mode",
                || conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0)),
            )?;
            debug!(path = %path.display(), journal_mode = %mode, "journal mode set");
        }

        info!(path = %path.display(), "opened sqlite database");
        self.handle = Some(conn);
        self.last_insert_row_id = None;
        Ok(())
    }

    /// Release the driver handle. Calling this on a closed connection does nothing.
    pub fn close(&mut self) {
        let Some(conn) = self.handle.take() else {
            return;
        };
        self.busy_retry_started = None;
        match conn.close() {
            Ok(()) => info!(path = %self.options.db_path.display(), "closed sqlite database"),
            Err((conn, err)) => {
                warn!(
                    path = %self.options.db_path.display(),
                    error = %err,
                    "sqlite refused to close cleanly; dropping handle"
                );
                drop(conn);
            }
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.options.db_path
    }

    #[must_use]
    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    /// Row id assigned by the most recent insert through [`Connection::execute_update`].
    #[must_use]
    pub fn last_insert_row_id(&self) -> Option<i64> {
        self.last_insert_row_id
    }

    #[must_use]
    pub fn busy_retry_timeout(&self) -> Duration {
        self.busy_retry.timeout
    }

    pub fn set_busy_retry_timeout(&mut self, timeout: Duration) {
        self.busy_retry.timeout = timeout;
        self.options.busy_retry_timeout = timeout;
    }

    /// Start of the retry window opened by the last statement that hit a busy database.
    #[must_use]
    pub fn busy_retry_started(&self) -> Option<Instant> {
        self.busy_retry_started
    }

    /// Execute raw, non-parameterized SQL, typically schema setup.
    ///
    /// Several `;`-separated statements are run in order, each stepped to completion with
    /// its own busy-retry window.
    ///
    /// # Errors
    /// Returns `RowmapError::NotConnected` when closed, `RowmapError::Driver` on failure and
    /// `RowmapError::BusyTimeout` if the database stays locked.
    pub fn exec(&mut self, sql: &str) -> Result<(), RowmapError> {
        let Session {
            conn,
            policy,
            started,
        } = self.session("exec")?;
        debug!(sql, "exec");

        let mut batch = rusqlite::Batch::new(conn, sql);
        loop {
            // fresh window per statement in the batch
            *started = None;
            let next = policy.run(started, "exec prepare", || batch.next())?;
            let Some(mut stmt) = next else {
                break;
            };
            policy.run(started, "exec step", || {
                let mut rows = stmt.raw_query();
                while rows.next()?.is_some() {}
                Ok(())
            })?;
        }
        Ok(())
    }

    /// Borrow the open handle for one statement, opening a fresh busy-retry window.
    pub(crate) fn session(&mut self, ctx: &str) -> Result<Session<'_>, RowmapError> {
        let conn = self
            .handle
            .as_ref()
            .ok_or_else(|| RowmapError::not_connected(ctx))?;
        self.busy_retry_started = None;
        Ok(Session {
            conn,
            policy: self.busy_retry,
            started: &mut self.busy_retry_started,
        })
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("path", &self.options.db_path)
            .field("open", &self.is_open())
            .field("in_transaction", &self.in_transaction())
            .field("last_insert_row_id", &self.last_insert_row_id)
            .field("busy_retry", &self.busy_retry)
            .finish()
    }
}

/// Failures to reach the file become `Io`; anything else stays a driver error.
fn open_error(path: &Path, err: rusqlite::Error) -> RowmapError {
    let is_io = match &err {
        rusqlite::Error::SqliteFailure(e, _) => matches!(
            e.code,
            ErrorCode::CannotOpen | ErrorCode::PermissionDenied | ErrorCode::SystemIoFailure
        ),
        rusqlite::Error::InvalidPath(_) => true,
        _ => false,
    };
    if is_io {
        let (_, message) = driver_code_and_message(&err);
        RowmapError::Io {
            path: path.display().to_string(),
            message,
        }
    } else {
        err.into()
    }
}
