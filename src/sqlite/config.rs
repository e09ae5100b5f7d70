use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::OpenFlags;

use crate::error::RowmapError;

use super::busy::{BusyRetryPolicy, DEFAULT_BUSY_RETRY_INTERVAL, DEFAULT_BUSY_RETRY_TIMEOUT};
use super::connection::Connection;

/// Path used for a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// Options for opening a [`Connection`].
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    pub db_path: PathBuf,
    pub busy_retry_timeout: Duration,
    pub busy_retry_interval: Duration,
    /// Create the database file when it does not exist yet.
    pub create_if_missing: bool,
    /// Switch the journal to WAL right after opening.
    pub wal: bool,
}

impl ConnectionOptions {
    #[must_use]
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            busy_retry_timeout: DEFAULT_BUSY_RETRY_TIMEOUT,
            busy_retry_interval: DEFAULT_BUSY_RETRY_INTERVAL,
            create_if_missing: true,
            wal: false,
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(IN_MEMORY)
    }

    #[must_use]
    pub fn builder(db_path: impl Into<PathBuf>) -> ConnectionOptionsBuilder {
        ConnectionOptionsBuilder::new(db_path)
    }

    #[must_use]
    pub fn busy_retry_policy(&self) -> BusyRetryPolicy {
        BusyRetryPolicy {
            timeout: self.busy_retry_timeout,
            interval: self.busy_retry_interval,
        }
    }

    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.db_path == Path::new(IN_MEMORY)
    }

    pub(crate) fn open_flags(&self) -> OpenFlags {
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if self.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
        flags
    }
}

/// Fluent builder for [`ConnectionOptions`].
#[derive(Debug, Clone)]
pub struct ConnectionOptionsBuilder {
    opts: ConnectionOptions,
}

impl ConnectionOptionsBuilder {
    #[must_use]
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            opts: ConnectionOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn busy_retry_timeout(mut self, timeout: Duration) -> Self {
        self.opts.busy_retry_timeout = timeout;
        self
    }

    #[must_use]
    pub fn busy_retry_interval(mut self, interval: Duration) -> Self {
        self.opts.busy_retry_interval = interval;
        self
    }

    #[must_use]
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.opts.create_if_missing = create;
        self
    }

    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    #[must_use]
    pub fn finish(self) -> ConnectionOptions {
        self.opts
    }

    /// Build the options and open a connection with them.
    ///
    /// # Errors
    ///
    /// Returns `RowmapError::Io` if the file cannot be opened, or `RowmapError::Driver` for
    /// other driver failures while opening.
    pub fn open(self) -> Result<Connection, RowmapError> {
        let mut conn = Connection::new(self.finish());
        conn.open()?;
        Ok(conn)
    }
}
