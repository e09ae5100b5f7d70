//! Convenient imports for common functionality.

pub use crate::error::RowmapError;
pub use crate::query_builder::{Filter, Query, QueryBuilder, QueryKind, RenderedSql, SqlRenderer};
pub use crate::results::ResultRow;
pub use crate::sqlite::{
    BusyRetryPolicy, Connection, ConnectionOptions, ConnectionOptionsBuilder, UpdateOutcome,
};
pub use crate::types::RowValues;

pub use rusqlite::TransactionBehavior;
