//! Synchronous SQLite connection that logs through a [`SqlLogger`].
//!
//! # Example
//!
//! ```
//! use querylog::prelude::*;
//!
//! fn main() -> ::rusqlite::Result<()> {
//!     let mut db = LoggedConnection::open_in_memory(BasicStackLogger::new(SourceCapture::Always))?;
//!     db.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")?;
//!     db.execute("INSERT INTO users (name) VALUES (?1)", &[ParamValue::from("Alice")])?;
//!
//!     let name: String = db.query_row("SELECT name FROM users WHERE id = ?1", &[1.into()], |row| row.get(0))?;
//!     assert_eq!(name, "Alice");
//!     assert_eq!(db.logger().len(), 3);
//!     Ok(())
//! }
//! ```
//!
//! Every method is `#[track_caller]`, so call-sites recorded through
//! [`CallerLocation`](crate::source::CallerLocation) point at the code that
//! called the connection.

use ::rusqlite::{Connection, Row, params_from_iter};

use crate::entry::{ParamType, ParamValue};
use crate::{BasicStackLogger, SqlLogger};

/// SQLite storage class of a parameter, recorded as its type descriptor.
pub fn storage_class(value: &ParamValue) -> ParamType {
    ParamType::new(match value {
        ParamValue::Null => "null",
        ParamValue::Bool(_) | ParamValue::Integer(_) => "integer",
        ParamValue::Real(_) => "real",
        ParamValue::Text(_) => "text",
        ParamValue::Blob(_) => "blob",
    })
}

/// A [`rusqlite::Connection`](::rusqlite::Connection) paired with a logger.
#[derive(Debug)]
pub struct LoggedConnection<L = BasicStackLogger> {
    conn: Connection,
    logger: L,
}

impl<L: SqlLogger> LoggedConnection<L> {
    pub fn new(conn: Connection, logger: L) -> Self {
        Self { conn, logger }
    }

    pub fn open_in_memory(logger: L) -> ::rusqlite::Result<Self> {
        Ok(Self::new(Connection::open_in_memory()?, logger))
    }

    #[inline]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    #[inline]
    pub fn logger(&self) -> &L {
        &self.logger
    }

    #[inline]
    pub fn logger_mut(&mut self) -> &mut L {
        &mut self.logger
    }

    pub fn into_parts(self) -> (Connection, L) {
        (self.conn, self.logger)
    }

    /// Executes a single statement and returns the number of changed rows.
    #[track_caller]
    pub fn execute(&mut self, sql: &str, params: &[ParamValue]) -> ::rusqlite::Result<usize> {
        let types = param_types(params);
        let conn = &self.conn;
        self.logger.log(sql, bound(params), bound(&types), || {
            conn.execute(sql, params_from_iter(params.iter()))
        })
    }

    /// Runs several `;`-separated statements without parameters, logged as one entry.
    #[track_caller]
    pub fn execute_batch(&mut self, sql: &str) -> ::rusqlite::Result<()> {
        let conn = &self.conn;
        self.logger.log(sql, None, None, || conn.execute_batch(sql))
    }

    /// Runs a query expected to return at least one row and maps the first.
    #[track_caller]
    pub fn query_row<T, F>(&mut self, sql: &str, params: &[ParamValue], f: F) -> ::rusqlite::Result<T>
    where
        F: FnOnce(&Row<'_>) -> ::rusqlite::Result<T>,
    {
        let types = param_types(params);
        let conn = &self.conn;
        self.logger.log(sql, bound(params), bound(&types), || {
            conn.query_row(sql, params_from_iter(params.iter()), f)
        })
    }

    /// Runs a query and maps every returned row.
    ///
    /// The logged time covers preparing, stepping and mapping all rows.
    #[track_caller]
    pub fn query_all<T, F>(&mut self, sql: &str, params: &[ParamValue], f: F) -> ::rusqlite::Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> ::rusqlite::Result<T>,
    {
        let types = param_types(params);
        let conn = &self.conn;
        self.logger.log(sql, bound(params), bound(&types), || {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt.query_map(params_from_iter(params.iter()), f)?;
            rows.collect()
        })
    }
}

fn param_types(params: &[ParamValue]) -> Vec<ParamType> {
    params.iter().map(storage_class).collect()
}

/// Statements without parameters log `None` rather than an empty list.
fn bound<T>(values: &[T]) -> Option<&[T]> {
    (!values.is_empty()).then_some(values)
}
