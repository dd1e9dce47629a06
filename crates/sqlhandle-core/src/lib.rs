//! Core types and traits for sqlhandle.
//!
//! This crate provides the foundational abstractions the handle layer is
//! built on:
//!
//! - `ConnPool` / `Ping` traits for connection pools and their optional ping check
//! - `Clause` storage and the `Expression` rendering hook
//! - `Logger` trait with a `tracing`-backed default
//! - `Error`, `ErrorChain`, `Value` and `Row`
//! - `Outcome` / `Cx` re-exports from asupersync for cancel-correct operations

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod clause;
pub mod connection;
pub mod error;
pub mod logger;
pub mod row;
pub mod types;
pub mod value;

pub use clause::{Builder, Clause, ClauseBuilder, ClauseBuilders, Expr, Expression, SqlBuffer, expr};
pub use connection::{BoxFuture, ConnPool, Ping, PreparedStatement};
pub use error::{
    ConfigError, ConnectionError, ConnectionErrorKind, Error, ErrorChain, PoolError,
    PoolErrorKind, QueryError, QueryErrorKind, Result, SchemaError, SchemaErrorKind, TypeError,
};
pub use logger::{LogLevel, Logger, TracingLogger, default_logger};
pub use row::Row;
pub use types::SqlType;
pub use value::Value;
