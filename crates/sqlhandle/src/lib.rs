//! sqlhandle - forkable database handles with sessions and callbacks.
//!
//! A root [`Db`] is produced once by [`open`]. Every chaining call goes
//! through [`Db::get_instance`], which decides whether the call writes into
//! the current [`Statement`] or into a fork, so independent call chains never
//! observe each other's accumulated clauses or settings.
//!
//! - [`Config`] is shared by every handle derived from one `open`
//! - [`Db::session`] derives handles with local overrides (dry run, logger,
//!   context, prepared statements)
//! - [`Callbacks`] holds the ordered per-operation callbacks
//! - [`PreparedStmtDb`] caches compiled statements per SQL text
//! - [`Db::setup_join_table`] wires many-to-many join models
//!
//! # Quick Start
//!
//! ```ignore
//! use sqlhandle::prelude::*;
//!
//! async fn example(cx: &Cx, dialector: Arc<dyn Dialector>) {
//!     let db = match open(cx, dialector, Some(Config::new().prepare_stmt(true))).await {
//!         Outcome::Ok(db) => db,
//!         _ => return,
//!     };
//!
//!     let tx = db
//!         .with_context(Arc::new(Cx::for_testing()))
//!         .clauses([Clause::new("WHERE", expr("age > ?", [Value::Int(18)]))]);
//!
//!     let done = db.exec(cx, "DELETE FROM heroes WHERE id = ?", vec![Value::BigInt(1)]).await;
//!     if let Some(err) = &done.error {
//!         eprintln!("delete failed: {err}");
//!     }
//! }
//! ```

pub mod callbacks;
pub mod config;
pub mod db;
pub mod dialector;
pub mod join_table;
pub mod open;
pub mod session;
pub mod settings;
pub mod statement;

pub use callbacks::{CallbackBuilder, CallbackFn, Callbacks, Operation, Processor};
pub use config::{Config, NowFn, local_now};
pub use db::{CloneMode, Db};
pub use dialector::Dialector;
pub use open::{OpenError, open};
pub use session::SessionConfig;
pub use settings::{SettingKey, Settings};
pub use statement::{Statement, StatementId};

pub use sqlhandle_core::{
    Builder, BoxFuture, Clause, ClauseBuilder, ClauseBuilders, ConnPool, Cx, Error, ErrorChain,
    Expr, Expression, LogLevel, Logger, Outcome, Ping, PreparedStatement, QueryErrorKind, Result,
    Row, SqlBuffer, SqlType, TracingLogger, Value, expr,
};
pub use sqlhandle_pool::PreparedStmtDb;
pub use sqlhandle_schema::{
    CacheStore, Field, Model, Namer, NamingStrategy, Reference, Relationship, RelationshipKind,
    Schema,
};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        Clause, Config, ConnPool, Cx, Db, Dialector, Error, Model, Outcome, Result, Row,
        SessionConfig, Value, expr, open,
    };
    pub use std::sync::Arc;
}
