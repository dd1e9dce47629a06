//! Prepared-statement cache.
//!
//! [`PreparedStmtDb`] decorates any [`ConnPool`], compiling each distinct SQL
//! text once and reusing the compiled statement for later queries.
//!
//! Locking is per SQL text: a short `std::sync::Mutex` guards the slot map,
//! and every slot carries its own async mutex held while that text compiles.
//! Concurrent callers for the same text wait for the first compilation and
//! reuse its result; different texts compile in parallel.
//!
//! Entries are never evicted one by one. The cache grows with the number of
//! distinct SQL shapes and is dropped as a whole by [`PreparedStmtDb::close`].
//!
//! Executing through the cache checks the bound parameter count against the
//! compiled statement before the inner pool sees it.

use asupersync::sync::Mutex;
use asupersync::{Cx, Outcome};
use sqlhandle_core::{
    BoxFuture, ConnPool, Error, Ping, PoolError, PoolErrorKind, PreparedStatement, QueryErrorKind,
    Row, Value,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError};

type Slot = Arc<Mutex<Option<PreparedStatement>>>;

/// A connection pool decorator that caches prepared statements by SQL text.
pub struct PreparedStmtDb {
    pool: Arc<dyn ConnPool>,
    stmts: std::sync::Mutex<HashMap<String, Slot>>,
}

impl PreparedStmtDb {
    /// Wrap `pool` with an empty cache.
    pub fn new(pool: Arc<dyn ConnPool>) -> Self {
        Self {
            pool,
            stmts: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// The decorated pool.
    pub fn inner(&self) -> &Arc<dyn ConnPool> {
        &self.pool
    }

    /// Number of cached SQL texts (including ones still compiling).
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `sql` has a cache entry.
    pub fn contains(&self, sql: &str) -> bool {
        self.slots().contains_key(sql)
    }

    /// Drop every cached statement.
    ///
    /// A compilation still in flight finishes for its waiting callers but is
    /// not added back; the next use of that text compiles again.
    pub fn close(&self) {
        let mut slots = self.slots();
        tracing::debug!(count = slots.len(), "closing prepared statement cache");
        slots.clear();
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<String, Slot>> {
        self.stmts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot_for(&self, sql: &str) -> Slot {
        let mut slots = self.slots();
        Arc::clone(
            slots
                .entry(sql.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(None))),
        )
    }

    /// Remove the entry for `sql` if it is still `slot`.
    fn discard(&self, sql: &str, slot: &Slot) {
        let mut slots = self.slots();
        if slots.get(sql).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            slots.remove(sql);
        }
    }

    /// Return the cached statement for `sql`, compiling it on first use.
    #[tracing::instrument(level = "trace", skip(self, cx))]
    pub async fn prepare_cached(&self, cx: &Cx, sql: &str) -> Outcome<PreparedStatement, Error> {
        let slot = self.slot_for(sql);
        let Ok(mut guard) = slot.lock(cx).await else {
            return Outcome::Err(Error::Pool(PoolError {
                kind: PoolErrorKind::Lock,
                message: format!("failed to acquire prepare lock for `{sql}`"),
                source: None,
            }));
        };

        if let Some(stmt) = guard.as_ref() {
            return Outcome::Ok(stmt.clone());
        }

        match self.pool.prepare(cx, sql).await {
            Outcome::Ok(stmt) => {
                tracing::debug!(sql, id = stmt.id(), "prepared statement cached");
                *guard = Some(stmt.clone());
                Outcome::Ok(stmt)
            }
            Outcome::Err(e) => {
                drop(guard);
                self.discard(sql, &slot);
                tracing::warn!(sql, error = %e, "statement preparation failed");
                Outcome::Err(e)
            }
            Outcome::Cancelled(r) => {
                drop(guard);
                self.discard(sql, &slot);
                Outcome::Cancelled(r)
            }
            Outcome::Panicked(p) => {
                drop(guard);
                self.discard(sql, &slot);
                Outcome::Panicked(p)
            }
        }
    }
}

fn check_params(stmt: &PreparedStatement, params: &[Value]) -> Result<(), Error> {
    if stmt.validate_params(params) {
        return Ok(());
    }
    Err(Error::query(
        QueryErrorKind::Bind,
        Some(stmt.sql()),
        format!(
            "statement expects {} parameters, got {}",
            stmt.param_count(),
            params.len()
        ),
    ))
}

impl fmt::Debug for PreparedStmtDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedStmtDb")
            .field("statements", &self.len())
            .finish_non_exhaustive()
    }
}

impl ConnPool for PreparedStmtDb {
    fn prepare<'a>(
        &'a self,
        cx: &'a Cx,
        sql: &'a str,
    ) -> BoxFuture<'a, Outcome<PreparedStatement, Error>> {
        Box::pin(self.prepare_cached(cx, sql))
    }

    fn query<'a>(
        &'a self,
        cx: &'a Cx,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Outcome<Vec<Row>, Error>> {
        Box::pin(async move {
            let stmt = match self.prepare_cached(cx, sql).await {
                Outcome::Ok(stmt) => stmt,
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            };
            if let Err(e) = check_params(&stmt, params) {
                return Outcome::Err(e);
            }
            self.pool.query_prepared(cx, &stmt, params).await
        })
    }

    fn execute<'a>(
        &'a self,
        cx: &'a Cx,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, Outcome<u64, Error>> {
        Box::pin(async move {
            let stmt = match self.prepare_cached(cx, sql).await {
                Outcome::Ok(stmt) => stmt,
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            };
            if let Err(e) = check_params(&stmt, params) {
                return Outcome::Err(e);
            }
            self.pool.execute_prepared(cx, &stmt, params).await
        })
    }

    fn query_prepared<'a>(
        &'a self,
        cx: &'a Cx,
        stmt: &'a PreparedStatement,
        params: &'a [Value],
    ) -> BoxFuture<'a, Outcome<Vec<Row>, Error>> {
        self.pool.query_prepared(cx, stmt, params)
    }

    fn execute_prepared<'a>(
        &'a self,
        cx: &'a Cx,
        stmt: &'a PreparedStatement,
        params: &'a [Value],
    ) -> BoxFuture<'a, Outcome<u64, Error>> {
        self.pool.execute_prepared(cx, stmt, params)
    }

    fn as_ping(&self) -> Option<&dyn Ping> {
        self.pool.as_ping()
    }

    fn unwrap_pool(&self) -> Option<Arc<dyn ConnPool>> {
        Some(Arc::clone(&self.pool))
    }
}
