//! Connection pool traits.
//!
//! This module defines the narrow contract the handle layer consumes from a
//! driver:
//!
//! - [`ConnPool`] - Object-safe query/exec contract shared by raw pools and
//!   pool decorators such as the prepared-statement cache
//! - [`Ping`] - Optional connectivity-check capability
//! - [`PreparedStatement`] - Pre-compiled statement for efficient repeated execution
//!
//! All operations integrate with asupersync's structured concurrency via `Cx` context
//! for proper cancellation and timeout handling.

use crate::error::Error;
use crate::row::Row;
use crate::value::Value;
use asupersync::{Cx, Outcome};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by the object-safe pool traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A prepared statement for repeated execution.
///
/// Prepared statements are pre-compiled by the database, allowing efficient
/// repeated execution with different parameter values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedStatement {
    /// Unique identifier for this prepared statement (driver-specific)
    id: u64,
    /// The original SQL text
    sql: String,
    /// Number of expected parameters
    param_count: usize,
}

impl PreparedStatement {
    /// Create a new prepared statement.
    ///
    /// This is typically called by the driver, not by users directly.
    #[must_use]
    pub fn new(id: u64, sql: impl Into<String>, param_count: usize) -> Self {
        Self {
            id,
            sql: sql.into(),
            param_count,
        }
    }

    /// Get the statement ID.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Get the original SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Get the expected number of parameters.
    #[must_use]
    pub const fn param_count(&self) -> usize {
        self.param_count
    }

    /// Check if the provided parameters match the expected count.
    #[must_use]
    pub fn validate_params(&self, params: &[Value]) -> bool {
        params.len() == self.param_count
    }
}

/// Optional connectivity check.
///
/// Pools that can check their connection expose it through
/// [`ConnPool::as_ping`]; `open` checks once unless automatic pinging is
/// disabled.
pub trait Ping: Send + Sync {
    /// Check that the underlying database is reachable.
    fn ping<'a>(&'a self, cx: &'a Cx) -> BoxFuture<'a, Outcome<(), Error>>;
}

/// A pool of database connections capable of executing statements.
///
/// Object safe so that decorators (the prepared-statement cache) can wrap
/// any driver pool behind `Arc<dyn ConnPool>`.
///
/// # Example
///
/// ```rust,ignore
/// let stmt = pool.prepare(&cx, "SELECT * FROM users WHERE id = $1").await;
/// let rows = pool.query(&cx, "SELECT 1", &[]).await;
/// ```
pub trait ConnPool: Send + Sync {
    /// Prepare a statement for repeated execution.
    fn prepare<'a>(
        &'a self,
        cx: &'a Cx,
        sql: &'a str,
    ) -> BoxFuture<'a, Outcome<PreparedStatement, Error>>;

    /// Execute a query and return all rows.
    fn query<'a>(
        &'a self,
        cx: &'a Cx,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Outcome<Vec<Row>, Error>>;

    /// Execute a statement (INSERT, UPDATE, DELETE) and return rows affected.
    fn execute<'a>(
        &'a self,
        cx: &'a Cx,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Outcome<u64, Error>>;

    /// Execute a prepared statement and return all rows.
    fn query_prepared<'a>(
        &'a self,
        cx: &'a Cx,
        stmt: &'a PreparedStatement,
        params: &'a [Value],
    ) -> BoxFuture<'a, Outcome<Vec<Row>, Error>>;

    /// Execute a prepared statement and return rows affected.
    fn execute_prepared<'a>(
        &'a self,
        cx: &'a Cx,
        stmt: &'a PreparedStatement,
        params: &'a [Value],
    ) -> BoxFuture<'a, Outcome<u64, Error>>;

    /// The connectivity check, if this pool supports one.
    fn as_ping(&self) -> Option<&dyn Ping> {
        None
    }

    /// The pool this one decorates, if it is a decorator.
    fn unwrap_pool(&self) -> Option<Arc<dyn ConnPool>> {
        None
    }
}
