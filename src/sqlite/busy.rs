//! Busy/locked retry loop wrapped around every driver call that can contend for the file lock.

use std::thread;
use std::time::{Duration, Instant};

use rusqlite::ErrorCode;
use tracing::{trace, warn};

use crate::error::{RowmapError, driver_code_and_message};

/// Default upper bound on how long a single statement keeps retrying.
pub const DEFAULT_BUSY_RETRY_TIMEOUT: Duration = Duration::from_secs(5);
/// Default sleep between attempts.
pub const DEFAULT_BUSY_RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// True when the driver reported `SQLITE_BUSY` or `SQLITE_LOCKED`.
#[must_use]
pub fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

/// How long, and how often, to retry a driver call that reports busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusyRetryPolicy {
    /// Maximum time since the first busy response before giving up. Zero means one attempt.
    pub timeout: Duration,
    /// Sleep between attempts.
    pub interval: Duration,
}

impl Default for BusyRetryPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_BUSY_RETRY_TIMEOUT,
            interval: DEFAULT_BUSY_RETRY_INTERVAL,
        }
    }
}

impl BusyRetryPolicy {
    /// Run `op` until it succeeds, fails with a non-busy error, or the retry window closes.
    ///
    /// `started` marks the first busy response of the current statement. It is set here and
    /// left alone otherwise, so the prepare and step calls of one statement share a single
    /// window; callers clear it before each new statement.
    ///
    /// # Errors
    /// Returns `RowmapError::Driver` for non-busy failures and `RowmapError::BusyTimeout`
    /// (carrying the last driver code and message) once the window is exhausted.
    pub fn run<T, F>(
        &self,
        started: &mut Option<Instant>,
        ctx: &str,
        mut op: F,
    ) -> Result<T, RowmapError>
    where
        F: FnMut() -> rusqlite::Result<T>,
    {
        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if is_busy(&err) => {
                    let window_start = *started.get_or_insert_with(Instant::now);
                    let elapsed = window_start.elapsed();
                    if elapsed >= self.timeout {
                        let (code, message) = driver_code_and_message(&err);
                        warn!(ctx, attempts, ?elapsed, code, "giving up on busy database");
                        return Err(RowmapError::BusyTimeout {
                            code,
                            message,
                            attempts,
                            elapsed,
                        });
                    }
                    trace!(ctx, attempts, ?elapsed, "database busy; retrying");
                    thread::sleep(self.interval.min(self.timeout - elapsed));
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
