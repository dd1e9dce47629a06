//! Handle configuration.

use crate::callbacks::Callbacks;
use crate::dialector::Dialector;
use chrono::{DateTime, Local};
use sqlhandle_core::{ClauseBuilders, ConnPool, Logger, default_logger};
use sqlhandle_schema::{CacheStore, Namer, NamingStrategy};
use std::fmt;
use std::sync::Arc;

/// Source of "now" timestamps.
pub type NowFn = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// The default timestamp source: local wall-clock time.
pub fn local_now() -> NowFn {
    Arc::new(Local::now)
}

/// Configuration shared by a root handle and every handle derived from it.
///
/// Handles hold it behind an `Arc`; [`crate::Db::session`] copies the struct
/// so overrides stay local, while the pool, dialector, callbacks, clause
/// builders and cache store remain shared.
#[derive(Clone)]
pub struct Config {
    /// Skip the implicit transaction around single writes.
    pub skip_default_transaction: bool,
    /// Table and column naming.
    pub naming_strategy: Arc<dyn Namer>,
    pub logger: Arc<dyn Logger>,
    pub now_func: NowFn,
    /// Record SQL without executing it.
    pub dry_run: bool,
    /// Run statements through a prepared-statement cache.
    pub prepare_stmt: bool,
    /// Skip the connectivity check at open.
    pub disable_automatic_ping: bool,
    pub clause_builders: ClauseBuilders,
    pub conn_pool: Option<Arc<dyn ConnPool>>,
    pub dialector: Option<Arc<dyn Dialector>>,
    pub callbacks: Arc<Callbacks>,
    pub cache_store: Arc<CacheStore>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            skip_default_transaction: false,
            naming_strategy: Arc::new(NamingStrategy::default()),
            logger: default_logger(),
            now_func: local_now(),
            dry_run: false,
            prepare_stmt: false,
            disable_automatic_ping: false,
            clause_builders: ClauseBuilders::new(),
            conn_pool: None,
            dialector: None,
            callbacks: Arc::new(Callbacks::new()),
            cache_store: Arc::new(CacheStore::new()),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_default_transaction(mut self, value: bool) -> Self {
        self.skip_default_transaction = value;
        self
    }

    pub fn naming_strategy(mut self, namer: Arc<dyn Namer>) -> Self {
        self.naming_strategy = namer;
        self
    }

    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn now_func(mut self, now: NowFn) -> Self {
        self.now_func = now;
        self
    }

    pub fn dry_run(mut self, value: bool) -> Self {
        self.dry_run = value;
        self
    }

    pub fn prepare_stmt(mut self, value: bool) -> Self {
        self.prepare_stmt = value;
        self
    }

    pub fn disable_automatic_ping(mut self, value: bool) -> Self {
        self.disable_automatic_ping = value;
        self
    }

    /// Use `pool` directly; dialectors may also install one during open.
    pub fn conn_pool(mut self, pool: Arc<dyn ConnPool>) -> Self {
        self.conn_pool = Some(pool);
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("skip_default_transaction", &self.skip_default_transaction)
            .field("naming_strategy", &self.naming_strategy)
            .field("logger", &self.logger)
            .field("dry_run", &self.dry_run)
            .field("prepare_stmt", &self.prepare_stmt)
            .field("disable_automatic_ping", &self.disable_automatic_ping)
            .field("clause_builders", &self.clause_builders)
            .field("has_conn_pool", &self.conn_pool.is_some())
            .field("dialector", &self.dialector.as_ref().map(|d| d.name().to_string()))
            .field("callbacks", &self.callbacks)
            .field("cache_store", &self.cache_store)
            .finish_non_exhaustive()
    }
}
