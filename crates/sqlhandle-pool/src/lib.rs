//! Connection pool decorators for sqlhandle.
//!
//! The only decorator today is [`PreparedStmtDb`], which caches compiled
//! statements per SQL text in front of any [`sqlhandle_core::ConnPool`].

pub mod prepared;

pub use prepared::PreparedStmtDb;
