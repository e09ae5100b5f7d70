// SQLite module - the connection and everything it needs to talk to rusqlite
//
// - busy: busy/locked retry policy
// - config: connection options and builder
// - connection: the Connection type (lifecycle, dml, select, transactions)
// - params: RowValues -> SQLite value conversion
// - query: row collection into ResultRow

pub mod busy;
pub mod config;
pub mod connection;
pub mod params;
pub mod query;

// Re-export the public API
pub use busy::{BusyRetryPolicy, is_busy};
pub use config::{ConnectionOptions, ConnectionOptionsBuilder, IN_MEMORY};
pub use connection::{Connection, UpdateOutcome};
pub use params::Params;
pub use query::collect_rows;
