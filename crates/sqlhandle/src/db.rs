//! The chainable database handle and its clone engine.

use crate::callbacks::{Callbacks, Processor};
use crate::config::Config;
use crate::settings::SettingKey;
use crate::statement::Statement;
use asupersync::{Cx, Outcome};
use chrono::{DateTime, Local};
use sqlhandle_core::{Clause, ConnPool, Error, ErrorChain, Result, Row, Value};
use std::fmt;
use std::sync::Arc;

/// How the next mutating call on a handle obtains the handle it writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum CloneMode {
    /// Write into this handle's statement.
    InPlace = 0,
    /// Fork a new handle with an empty statement sharing pool and context.
    #[default]
    Fresh = 1,
    /// Fork a new handle with a deep copy of the statement.
    WithConditions = 2,
}

/// A chainable database handle.
///
/// Handles are cheap to clone. A clone aliases the same [`Statement`];
/// chaining methods decide through [`Db::get_instance`] whether to write into
/// it or into a fork.
#[derive(Clone)]
pub struct Db {
    pub config: Arc<Config>,
    /// Sticky operation error; later errors are appended, never replace it.
    pub error: Option<ErrorChain>,
    pub rows_affected: u64,
    pub statement: Arc<Statement>,
    mode: CloneMode,
}

impl Db {
    pub(crate) fn from_parts(config: Arc<Config>, statement: Arc<Statement>, mode: CloneMode) -> Self {
        Self {
            config,
            error: None,
            rows_affected: 0,
            statement,
            mode,
        }
    }

    pub fn clone_mode(&self) -> CloneMode {
        self.mode
    }

    /// The handle a mutating call must write into.
    ///
    /// Forks share the config and come back [`CloneMode::InPlace`], so the
    /// rest of one chain accumulates into the fork.
    pub fn get_instance(&self) -> Db {
        match self.mode {
            CloneMode::InPlace => self.clone(),
            CloneMode::Fresh => Self::from_parts(
                Arc::clone(&self.config),
                Arc::new(self.statement.fork_fresh()),
                CloneMode::InPlace,
            ),
            CloneMode::WithConditions => Self::from_parts(
                Arc::clone(&self.config),
                Arc::new(self.statement.deep_copy()),
                CloneMode::InPlace,
            ),
        }
    }

    /// Add clauses to the statement; a clause replaces an earlier one of the same name.
    pub fn clauses(&self, clauses: impl IntoIterator<Item = Clause>) -> Db {
        let tx = self.get_instance();
        for clause in clauses {
            tx.statement.add_clause(clause);
        }
        tx
    }

    /// Store a session-scoped setting.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Db {
        let tx = self.get_instance();
        tx.statement
            .settings
            .store(SettingKey::Session(key.into()), value.into());
        tx
    }

    /// Read a session-scoped setting from the current statement.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.statement
            .settings
            .load(&SettingKey::Session(key.to_string()))
    }

    /// Store a setting visible only through this exact statement instance.
    pub fn instance_set(&self, key: impl Into<String>, value: impl Into<Value>) -> Db {
        let tx = self.get_instance();
        let id = tx.statement.id();
        tx.statement
            .settings
            .store(SettingKey::Instance(id, key.into()), value.into());
        tx
    }

    pub fn instance_get(&self, key: &str) -> Option<Value> {
        self.statement
            .settings
            .load(&SettingKey::Instance(self.statement.id(), key.to_string()))
    }

    /// Record `err` on the handle. `None` is a no-op.
    ///
    /// The first error is kept; later ones are appended to the chain.
    pub fn add_error(&mut self, err: impl Into<Option<Error>>) -> Option<&ErrorChain> {
        if let Some(err) = err.into() {
            tracing::debug!(error = %err, statement = %self.statement.id(), "error added to handle");
            match &mut self.error {
                Some(chain) => chain.push(err),
                None => self.error = Some(ErrorChain::new(err)),
            }
        }
        self.error.as_ref()
    }

    /// The callback registry.
    pub fn callback(&self) -> &Callbacks {
        &self.config.callbacks
    }

    /// Current time from the configured source.
    pub fn now(&self) -> DateTime<Local> {
        (self.config.now_func)()
    }

    /// The raw pool, unwrapping the prepared-statement cache if installed.
    pub fn db(&self) -> Result<Arc<dyn ConnPool>> {
        let pool = self.config.conn_pool.clone().ok_or(Error::InvalidDb)?;
        Ok(pool.unwrap_pool().unwrap_or(pool))
    }

    /// Execute `sql` through the raw callbacks and the statement's pool.
    #[tracing::instrument(level = "debug", skip(self, cx, vars))]
    pub async fn exec(&self, cx: &Cx, sql: &str, vars: Vec<Value>) -> Db {
        let mut tx = self.get_instance();
        let Some(pool) = tx.prepare_terminal(self.callback().raw(), sql, vars) else {
            return tx;
        };
        let stmt = Arc::clone(&tx.statement);
        let recorded = stmt.sql();
        let run_cx = stmt.context().map_or(cx, |c| &**c);

        match pool.execute(run_cx, &recorded.sql, &recorded.vars).await {
            Outcome::Ok(n) => tx.rows_affected = n,
            Outcome::Err(e) => {
                tx.add_error(e);
            }
            Outcome::Cancelled(_) => {
                tx.add_error(Error::Cancelled);
            }
            Outcome::Panicked(_) => {
                tx.add_error(Error::Custom(format!("execution of `{}` panicked", recorded.sql)));
            }
        }
        tx
    }

    /// Run `sql` through the row callbacks and return the fetched rows.
    #[tracing::instrument(level = "debug", skip(self, cx, vars))]
    pub async fn query_rows(&self, cx: &Cx, sql: &str, vars: Vec<Value>) -> (Db, Vec<Row>) {
        let mut tx = self.get_instance();
        let Some(pool) = tx.prepare_terminal(self.callback().row(), sql, vars) else {
            return (tx, Vec::new());
        };
        let stmt = Arc::clone(&tx.statement);
        let recorded = stmt.sql();
        let run_cx = stmt.context().map_or(cx, |c| &**c);

        let rows = match pool.query(run_cx, &recorded.sql, &recorded.vars).await {
            Outcome::Ok(rows) => rows,
            Outcome::Err(e) => {
                tx.add_error(e);
                Vec::new()
            }
            Outcome::Cancelled(_) => {
                tx.add_error(Error::Cancelled);
                Vec::new()
            }
            Outcome::Panicked(_) => {
                tx.add_error(Error::Custom(format!("query `{}` panicked", recorded.sql)));
                Vec::new()
            }
        };
        tx.rows_affected = rows.len() as u64;
        (tx, rows)
    }

    /// Record the SQL, run `processor`, and return the pool to execute on,
    /// or `None` when the statement must not reach the database.
    fn prepare_terminal(
        &mut self,
        processor: &Processor,
        sql: &str,
        vars: Vec<Value>,
    ) -> Option<Arc<dyn ConnPool>> {
        self.statement.set_sql(sql, vars);
        processor.execute(self);

        if self.error.is_some() {
            return None;
        }
        if self.config.dry_run {
            tracing::debug!(sql = %self.statement.sql().sql, "dry run, statement not executed");
            return None;
        }
        let pool = self.statement.conn_pool().cloned();
        if pool.is_none() {
            self.add_error(Error::InvalidDb);
        }
        pool
    }
}

impl fmt::Debug for Db {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Db")
            .field("mode", &self.mode)
            .field("error", &self.error.as_ref().map(ToString::to_string))
            .field("rows_affected", &self.rows_affected)
            .field("statement", &self.statement)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlhandle_core::expr;

    fn root() -> Db {
        Db::from_parts(
            Arc::new(Config::default()),
            Arc::new(Statement::new(None, None)),
            CloneMode::Fresh,
        )
    }

    #[test]
    fn fresh_root_forks_on_every_call() {
        let db = root();
        let a = db.clauses([Clause::new("WHERE", expr("a = 1", []))]);
        let b = db.clauses([Clause::new("LIMIT", expr("1", []))]);

        assert!(db.statement.clauses().is_empty());
        assert_eq!(a.statement.clause_names(), vec!["WHERE".to_string()]);
        assert_eq!(b.statement.clause_names(), vec!["LIMIT".to_string()]);
        assert!(Arc::ptr_eq(&a.config, &db.config));
        assert_eq!(a.clone_mode(), CloneMode::InPlace);
    }

    #[test]
    fn chain_accumulates_in_fork() {
        let db = root();
        let tx = db
            .clauses([Clause::new("WHERE", expr("a = 1", []))])
            .clauses([Clause::named("LIMIT")]);
        assert_eq!(tx.statement.clause_names(), vec!["LIMIT".to_string(), "WHERE".to_string()]);
    }

    #[test]
    fn in_place_aliases_statement() {
        let tx = root().get_instance();
        let same = tx.get_instance();
        assert!(Arc::ptr_eq(&tx.statement, &same.statement));
    }

    #[test]
    fn add_error_is_sticky_and_additive() {
        let mut db = root();
        assert!(db.error.is_none());
        assert!(db.add_error(None).is_none());

        db.add_error(Error::Timeout);
        db.add_error(None);
        db.add_error(Error::Custom("second".into()));

        let chain = db.error.as_ref().expect("error recorded");
        assert_eq!(chain.len(), 2);
        assert!(matches!(chain.first(), Error::Timeout));
        assert!(chain.any(|e| matches!(e, Error::Custom(m) if m == "second")));
        assert_eq!(chain.to_string(), "Operation timed out; second");
    }

    #[test]
    fn db_without_pool_is_invalid() {
        assert!(matches!(root().db(), Err(Error::InvalidDb)));
    }

    #[test]
    fn settings_round_trip_and_instance_scope() {
        let db = root();
        let tx = db.set("locale", "en").instance_set("hooks_ran", true);
        assert_eq!(tx.get("locale"), Some(Value::Text("en".into())));
        assert_eq!(tx.instance_get("hooks_ran"), Some(Value::Bool(true)));
        assert_eq!(db.get("locale"), None);
    }
}
