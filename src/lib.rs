//! Small row-mapping access layer over an embedded `SQLite` database.
//!
//! Build a [`Query`] with [`QueryBuilder`], hand it to a [`Connection`], get back
//! [`ResultRow`]s or an [`UpdateOutcome`]. Identifiers are validated when the query is built;
//! values only ever travel as positional bindings.
//!
//! ```rust
//! use sqlite_rowmap::prelude::*;
//!
//! # fn demo() -> Result<(), RowmapError> {
//! let mut conn = Connection::open_in_memory()?;
//! conn.exec("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)")?;
//!
//! let insert = QueryBuilder::insert("t")?.value("name", "alice")?.build();
//! let outcome = conn.execute_update(&insert)?;
//! assert_eq!(outcome.row_id(), Some(1));
//!
//! let select = QueryBuilder::select("t")?.filter("id", 1)?.build();
//! let rows = conn.execute_query(&select)?;
//! assert_eq!(rows[0].get("name"), Some(&RowValues::Text("alice".into())));
//! # Ok(())
//! # }
//! # demo().unwrap();
//! ```

pub mod error;
pub mod prelude;
pub mod query_builder;
pub mod results;
pub mod sqlite;
pub mod types;

pub use error::RowmapError;
pub use query_builder::{Filter, Query, QueryBuilder, QueryKind, RenderedSql, SqlRenderer};
pub use results::ResultRow;
pub use sqlite::{
    BusyRetryPolicy, Connection, ConnectionOptions, ConnectionOptionsBuilder, UpdateOutcome,
};
pub use types::RowValues;

pub use rusqlite::TransactionBehavior;
