//! Opening a root handle.

use crate::config::Config;
use crate::db::{CloneMode, Db};
use crate::dialector::Dialector;
use crate::statement::Statement;
use asupersync::{Cx, Outcome};
use sqlhandle_core::Error;
use sqlhandle_pool::PreparedStmtDb;
use std::fmt;
use std::sync::Arc;

/// Initialization failure of [`open`].
///
/// The handle is still returned for inspection alongside the error.
pub struct OpenError {
    pub db: Db,
    pub error: Error,
}

impl fmt::Debug for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenError")
            .field("error", &self.error)
            .field("db", &self.db)
            .finish()
    }
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to initialize database: {}", self.error)
    }
}

impl std::error::Error for OpenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Open a root handle through `dialector`.
///
/// Missing config values take their defaults. The dialector initializes the
/// handle once; with `prepare_stmt` the resulting pool is wrapped in a
/// prepared-statement cache; unless `disable_automatic_ping` is set, a pool
/// that can ping is checked once. Any failure, a cancelled check included, is
/// logged through the config logger and returned together with the handle.
#[tracing::instrument(level = "debug", skip_all, fields(dialector = dialector.name()))]
pub async fn open(
    cx: &Cx,
    dialector: Arc<dyn Dialector>,
    config: Option<Config>,
) -> Outcome<Db, OpenError> {
    let mut config = config.unwrap_or_default();
    config.dialector = Some(Arc::clone(&dialector));

    let mut db = Db::from_parts(
        Arc::new(config),
        Arc::new(Statement::new(None, None)),
        CloneMode::Fresh,
    );

    let mut failure = dialector.initialize(&mut db).err();

    if db.config.prepare_stmt {
        if let Some(pool) = db.config.conn_pool.clone() {
            Arc::make_mut(&mut db.config).conn_pool = Some(Arc::new(PreparedStmtDb::new(pool)));
        }
    }

    db.statement = Arc::new(Statement::new(db.config.conn_pool.clone(), None));

    if failure.is_none() && !db.config.disable_automatic_ping {
        if let Some(pool) = db.config.conn_pool.clone() {
            if let Some(pinger) = pool.as_ping() {
                match pinger.ping(cx).await {
                    Outcome::Ok(()) => tracing::debug!("connectivity check passed"),
                    Outcome::Err(e) => failure = Some(e),
                    Outcome::Cancelled(reason) => {
                        tracing::debug!(?reason, "connectivity check cancelled");
                        failure = Some(Error::Cancelled);
                    }
                    Outcome::Panicked(p) => return Outcome::Panicked(p),
                }
            }
        }
    }

    match failure {
        Some(error) => {
            db.config
                .logger
                .error(&format!("failed to initialize database, got error {error}"));
            Outcome::Err(OpenError { db, error })
        }
        None => Outcome::Ok(db),
    }
}
