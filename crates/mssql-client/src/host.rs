//! Free functions and traits for embedding this crate behind a host engine.
//!
//! A host (a query engine, an ORM, a connection manager with its own pooling)
//! typically wants three things from a driver: a way to open/close/ping a
//! connection without learning the type-state API, a sink it can implement
//! once for its own row/column representation, and enough metadata on `Row`
//! to decide when a projected column needs a collation-safe cast. The first
//! two live here; the third is documented on [`crate::row::Row`] and
//! [`crate::row::Column`].

use mssql_types::SqlValue;

use crate::client::Client;
use crate::config::Config;
use crate::error::Result;
use crate::state::Ready;

/// A destination for decoded row data, implemented by the embedding host.
///
/// This crate never constructs a `Vec<SqlValue>` row on the host's behalf;
/// instead, a result stream fills a `RowSink` column-by-column as it decodes
/// `ROW`/`NBCROW` tokens, so a host can bind its own vector or column-chunk
/// representation without this crate depending on it.
pub trait RowSink {
    /// Set the value of `col` in `row` to `value`.
    fn set_value(&mut self, col: usize, row: usize, value: &SqlValue);

    /// Mark `col` in `row` as NULL.
    fn set_null(&mut self, col: usize, row: usize);

    /// Reserve storage for `n` rows, called once cardinality is known.
    ///
    /// For streaming result sets where cardinality is not known up front,
    /// implementations may treat this as a hint rather than an exact count.
    fn set_cardinality(&mut self, n: usize);
}

/// Open a connection.
///
/// An alias of [`Client::connect`] for hosts that want a free function
/// rather than an associated one.
pub fn open(config: Config) -> Result<Client<Ready>> {
    Client::connect(config)
}

/// Close a connection, logging off cleanly.
///
/// Returns `true` if the logoff completed without error. A host that does
/// not care why a close failed (the socket is going away either way) can
/// use this instead of matching on [`Client::close`]'s `Result`.
pub fn close(client: Client<Ready>) -> bool {
    client.close().is_ok()
}

/// Check that a connection is still responsive.
///
/// Runs a lightweight round trip (`SELECT 1`) against the server.
pub fn ping(client: &mut Client<Ready>) -> Result<bool> {
    Ok(client.ping())
}
