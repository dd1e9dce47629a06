//! Dialector collaborator.

use crate::db::Db;
use sqlhandle_core::Result;
use std::fmt;

/// Database-specific setup run once when a handle is opened.
///
/// `initialize` typically installs the connection pool, clause builders and
/// default callbacks:
///
/// ```ignore
/// fn initialize(&self, db: &mut Db) -> Result<()> {
///     Arc::make_mut(&mut db.config).conn_pool = Some(self.pool.clone());
///     Ok(())
/// }
/// ```
pub trait Dialector: Send + Sync + fmt::Debug {
    /// Dialect name, e.g. `"sqlite"`.
    fn name(&self) -> &str;

    fn initialize(&self, db: &mut Db) -> Result<()>;
}
