//! Derived handles with overridden behavior.

use crate::config::NowFn;
use crate::db::{CloneMode, Db};
use asupersync::Cx;
use sqlhandle_core::{LogLevel, Logger};
use sqlhandle_pool::PreparedStmtDb;
use std::fmt;
use std::sync::Arc;

/// Overrides applied by [`Db::session`].
#[derive(Clone, Default)]
pub struct SessionConfig {
    /// Record SQL without executing it, for this session only.
    pub dry_run: bool,
    /// Run statements through a new prepared-statement cache.
    pub prepare_stmt: bool,
    /// Carry accumulated clauses and settings into forks.
    pub with_conditions: bool,
    /// Context attached to the session's statement.
    pub context: Option<Arc<Cx>>,
    pub logger: Option<Arc<dyn Logger>>,
    pub now_func: Option<NowFn>,
}

impl SessionConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn dry_run(mut self, value: bool) -> Self {
        self.dry_run = value;
        self
    }

    #[must_use]
    pub fn prepare_stmt(mut self, value: bool) -> Self {
        self.prepare_stmt = value;
        self
    }

    #[must_use]
    pub fn with_conditions(mut self, value: bool) -> Self {
        self.with_conditions = value;
        self
    }

    #[must_use]
    pub fn context(mut self, cx: Arc<Cx>) -> Self {
        self.context = Some(cx);
        self
    }

    #[must_use]
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    #[must_use]
    pub fn now_func(mut self, now: NowFn) -> Self {
        self.now_func = Some(now);
        self
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("dry_run", &self.dry_run)
            .field("prepare_stmt", &self.prepare_stmt)
            .field("with_conditions", &self.with_conditions)
            .field("has_context", &self.context.is_some())
            .field("logger", &self.logger)
            .field("has_now_func", &self.now_func.is_some())
            .finish()
    }
}

impl Db {
    /// Derive a handle with `session` overrides.
    ///
    /// Always forks. The config struct is copied, so overrides never reach
    /// `self` or its siblings; the pool, callbacks and caches stay shared.
    pub fn session(&self, session: SessionConfig) -> Db {
        let mut config = (*self.config).clone();

        let statement = if session.context.is_some() || session.prepare_stmt {
            let mut stmt = self.statement.deep_copy();
            if let Some(cx) = session.context {
                stmt.set_context(cx);
            }
            if session.prepare_stmt {
                match self.config.conn_pool.clone() {
                    Some(pool) => stmt.set_conn_pool(Arc::new(PreparedStmtDb::new(pool))),
                    None => tracing::warn!("prepare_stmt session requested without a connection pool"),
                }
            }
            Arc::new(stmt)
        } else {
            Arc::clone(&self.statement)
        };

        if session.dry_run {
            config.dry_run = true;
        }
        if let Some(logger) = session.logger {
            config.logger = logger;
        }
        if let Some(now) = session.now_func {
            config.now_func = now;
        }

        let clone = if session.with_conditions {
            CloneMode::WithConditions
        } else {
            CloneMode::Fresh
        };
        Db::from_parts(Arc::new(config), statement, clone)
    }

    /// A session carrying `cx` and accumulated conditions.
    pub fn with_context(&self, cx: Arc<Cx>) -> Db {
        self.session(SessionConfig::new().with_conditions(true).context(cx))
    }

    /// A session logging at [`LogLevel::Info`].
    pub fn debug(&self) -> Db {
        let logger = self.config.logger.log_mode(LogLevel::Info);
        self.session(SessionConfig::new().with_conditions(true).logger(logger))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::statement::Statement;
    use sqlhandle_core::{Clause, expr};

    fn root() -> Db {
        Db::from_parts(
            Arc::new(Config::default()),
            Arc::new(Statement::new(None, None)),
            CloneMode::Fresh,
        )
    }

    #[test]
    fn dry_run_does_not_leak_upstream() {
        let db = root();
        let dry = db.session(SessionConfig::new().dry_run(true));
        assert!(dry.config.dry_run);
        assert!(!db.config.dry_run);
        assert!(!Arc::ptr_eq(&dry.config, &db.config));
        assert!(Arc::ptr_eq(&dry.config.cache_store, &db.config.cache_store));
        assert_eq!(dry.clone_mode(), CloneMode::Fresh);
    }

    #[test]
    fn now_func_overrides_only_the_session() {
        let fixed = chrono::Local::now() - chrono::Duration::days(365);
        let db = root();
        let frozen = db.session(SessionConfig::new().now_func(Arc::new(move || fixed)));

        assert_eq!(frozen.now(), fixed);
        assert_eq!(frozen.get_instance().now(), fixed);
        assert!(db.now() > fixed);
        assert!(!Arc::ptr_eq(&frozen.config.now_func, &db.config.now_func));

        let sibling = db.session(SessionConfig::new());
        assert!(sibling.now() > fixed);
    }

    #[test]
    fn debug_raises_log_level_only_on_session() {
        let db = root();
        let verbose = db.debug();
        assert_eq!(verbose.config.logger.level(), LogLevel::Info);
        assert_eq!(db.config.logger.level(), LogLevel::Warn);
        assert_eq!(verbose.clone_mode(), CloneMode::WithConditions);
    }

    #[test]
    fn with_context_copies_statement() {
        let tx = root().clauses([Clause::new("WHERE", expr("id = 1", []))]);
        let ctx = tx.with_context(Arc::new(Cx::for_testing()));
        assert!(!Arc::ptr_eq(&ctx.statement, &tx.statement));
        assert!(ctx.statement.context().is_some());
        assert!(tx.statement.context().is_none());
        assert_eq!(ctx.statement.clause_names(), vec!["WHERE".to_string()]);
    }

    #[test]
    fn plain_session_shares_statement() {
        let db = root();
        let s = db.session(SessionConfig::new());
        assert!(Arc::ptr_eq(&s.statement, &db.statement));
    }
}
