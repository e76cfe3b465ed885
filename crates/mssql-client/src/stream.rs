//! Result set and row-stream types returned by query execution.
//!
//! Query execution reads the full TDS token stream for a batch before
//! returning, so these types wrap already-decoded rows rather than poll
//! the wire incrementally. They still expose the data the way a caller
//! would expect from a streaming API: one row at a time via `Iterator`,
//! or filled into a host's own row sink via [`crate::host::RowSink`].

use crate::error::Error;
use crate::host::RowSink;
use crate::row::{Column, Row};

/// A single result set: its column metadata and the rows decoded for it.
#[derive(Debug, Clone)]
pub struct ResultSet {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl ResultSet {
    /// Create a result set from decoded columns and rows.
    pub fn new(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Column metadata for this result set.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Rows decoded for this result set.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows in this result set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether this result set has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Consume the result set, returning its rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Fill a host-provided [`RowSink`] with this result set's data,
    /// column-by-column, the way the wire decoder fills it while reading
    /// `ROW`/`NBCROW` tokens.
    pub fn fill(&self, sink: &mut dyn RowSink) {
        fill_sink(&self.columns, &self.rows, sink);
    }

    /// Remove and return the first row, leaving the rest in place.
    fn pop_front_row(&mut self) -> Option<Row> {
        if self.rows.is_empty() {
            None
        } else {
            Some(self.rows.remove(0))
        }
    }
}

fn fill_sink(columns: &[Column], rows: &[Row], sink: &mut dyn RowSink) {
    sink.set_cardinality(rows.len());
    for (row_idx, row) in rows.iter().enumerate() {
        for col_idx in 0..columns.len() {
            if row.is_null(col_idx) {
                sink.set_null(col_idx, row_idx);
            } else if let Some(value) = row.get_raw(col_idx) {
                sink.set_value(col_idx, row_idx, &value);
            } else {
                sink.set_null(col_idx, row_idx);
            }
        }
    }
}

/// An iterator over the rows of a single query's result set.
///
/// Returned by [`crate::Client::query`]. Rows have already been read off
/// the wire by the time this is constructed, so iteration never blocks.
pub struct QueryStream {
    columns: Vec<Column>,
    rows: std::vec::IntoIter<Row>,
}

impl QueryStream {
    /// Create a query stream from decoded columns and rows.
    pub(crate) fn new(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows: rows.into_iter(),
        }
    }

    /// Column metadata for the result set.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Whether the stream has been fully consumed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.rows.len() == 0
    }

    /// Collect all remaining rows into a `Vec`.
    ///
    /// # Errors
    ///
    /// This implementation never fails once constructed, but returns a
    /// `Result` to match the shape of a true streaming reader.
    pub fn collect_all(self) -> Result<Vec<Row>, Error> {
        Ok(self.rows.collect())
    }

    /// Fill a host-provided [`RowSink`] with the remaining rows.
    pub fn fill(self, sink: &mut dyn RowSink) {
        let columns = self.columns;
        let rows: Vec<Row> = self.rows.collect();
        fill_sink(&columns, &rows, sink);
    }
}

impl Iterator for QueryStream {
    type Item = Result<Row, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next().map(Ok)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

/// An iterator over the multiple result sets produced by a batch that
/// contains more than one SQL statement (e.g. two `SELECT`s).
pub struct MultiResultStream {
    result_sets: std::vec::IntoIter<ResultSet>,
    current: Option<ResultSet>,
}

impl MultiResultStream {
    /// Create a multi-result stream from already-decoded result sets.
    pub(crate) fn new(result_sets: Vec<ResultSet>) -> Self {
        Self {
            result_sets: result_sets.into_iter(),
            current: None,
        }
    }

    /// Advance to the next result set.
    ///
    /// Returns `true` if another result set was available, `false` once
    /// every result set in the batch has been consumed.
    pub fn next_result(&mut self) -> Result<bool, Error> {
        self.current = self.result_sets.next();
        Ok(self.current.is_some())
    }

    /// Read the next row from the current result set.
    ///
    /// Returns `None` once the current result set is exhausted; call
    /// [`Self::next_result`] to move to the next one.
    pub fn next_row(&mut self) -> Result<Option<Row>, Error> {
        match self.current.as_mut() {
            Some(result_set) => Ok(result_set.pop_front_row()),
            None => Ok(None),
        }
    }

    /// Column metadata for the current result set, if one is active.
    #[must_use]
    pub fn columns(&self) -> Option<&[Column]> {
        self.current.as_ref().map(ResultSet::columns)
    }
}

/// Result of a non-query execution.
///
/// Contains the number of affected rows and any output parameters.
#[derive(Debug, Clone)]
pub struct ExecuteResult {
    /// Number of rows affected by the statement.
    pub rows_affected: u64,
    /// Output parameters from stored procedures.
    pub output_params: Vec<OutputParam>,
}

/// An output parameter from a stored procedure call.
#[derive(Debug, Clone)]
pub struct OutputParam {
    /// Parameter name.
    pub name: String,
    /// Parameter value.
    pub value: mssql_types::SqlValue,
}

impl ExecuteResult {
    /// Create a new execute result.
    pub fn new(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            output_params: Vec::new(),
        }
    }

    /// Create a result with output parameters.
    pub fn with_outputs(rows_affected: u64, output_params: Vec<OutputParam>) -> Self {
        Self {
            rows_affected,
            output_params,
        }
    }

    /// Get an output parameter by name.
    #[must_use]
    pub fn get_output(&self, name: &str) -> Option<&OutputParam> {
        self.output_params
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}
