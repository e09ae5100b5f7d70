use std::time::Duration;

use thiserror::Error;

/// Error type for every fallible operation in this crate.
#[derive(Debug, Error)]
pub enum RowmapError {
    /// Malformed identifier, empty table name, or a query handed to the wrong execute path.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// API misuse: bindings requested before a render, nested transactions, and the like.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The connection has no open handle.
    #[error("Not connected: {0}")]
    NotConnected(String),

    /// Non-busy failure reported by the `SQLite` driver.
    #[error("SQLite error {code}: {message}")]
    Driver {
        /// Extended result code reported by `SQLite`.
        code: i32,
        message: String,
        #[source]
        source: rusqlite::Error,
    },

    /// The driver kept reporting busy/locked past the retry window.
    #[error("SQLite busy after {attempts} attempts over {elapsed:?} (code {code}): {message}")]
    BusyTimeout {
        code: i32,
        message: String,
        attempts: u32,
        elapsed: Duration,
    },

    /// The database file could not be opened.
    #[error("I/O error opening {path}: {message}")]
    Io { path: String, message: String },
}

impl RowmapError {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub(crate) fn not_connected(ctx: &str) -> Self {
        Self::NotConnected(format!("no open database handle ({ctx})"))
    }

    /// True for API-misuse errors, including operations attempted while closed.
    #[must_use]
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_) | Self::NotConnected(_))
    }

    #[must_use]
    pub fn is_busy_timeout(&self) -> bool {
        matches!(self, Self::BusyTimeout { .. })
    }

    /// Extended `SQLite` result code, when the error came from the driver.
    #[must_use]
    pub fn driver_code(&self) -> Option<i32> {
        match self {
            Self::Driver { code, .. } | Self::BusyTimeout { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Split a driver error into its extended result code and message.
pub(crate) fn driver_code_and_message(err: &rusqlite::Error) -> (i32, String) {
    match err {
        rusqlite::Error::SqliteFailure(ffi_err, msg) => (
            ffi_err.extended_code,
            msg.clone().unwrap_or_else(|| ffi_err.to_string()),
        ),
        other => (rusqlite::ffi::SQLITE_ERROR, other.to_string()),
    }
}

impl From<rusqlite::Error> for RowmapError {
    fn from(err: rusqlite::Error) -> Self {
        let (code, message) = driver_code_and_message(&err);
        RowmapError::Driver {
            code,
            message,
            source: err,
        }
    }
}
