//! Per-call statement accumulator.

use crate::settings::Settings;
use asupersync::Cx;
use sqlhandle_core::{Clause, ClauseBuilders, ConnPool, Result, SqlBuffer, Value};
use sqlhandle_schema::{CacheStore, Model, Namer, Schema};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

static NEXT_STATEMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one statement instance, unique for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatementId(u64);

impl StatementId {
    /// Allocate the next id.
    pub fn next() -> Self {
        Self(NEXT_STATEMENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StatementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stmt#{}", self.0)
    }
}

/// Accumulates clauses, settings and the resolved schema of one call chain.
///
/// Pool and context are fixed once the statement is shared; clauses,
/// settings, schema and recorded SQL are lock-guarded so aliasing handles
/// stay memory safe.
pub struct Statement {
    id: StatementId,
    conn_pool: Option<Arc<dyn ConnPool>>,
    context: Option<Arc<Cx>>,
    clauses: RwLock<HashMap<String, Clause>>,
    pub settings: Settings,
    schema: RwLock<Option<Arc<Schema>>>,
    sql: RwLock<SqlBuffer>,
}

impl Statement {
    pub fn new(conn_pool: Option<Arc<dyn ConnPool>>, context: Option<Arc<Cx>>) -> Self {
        Self {
            id: StatementId::next(),
            conn_pool,
            context,
            clauses: RwLock::new(HashMap::new()),
            settings: Settings::new(),
            schema: RwLock::new(None),
            sql: RwLock::new(SqlBuffer::default()),
        }
    }

    /// A new statement sharing this one's pool and context, with nothing accumulated.
    pub fn fork_fresh(&self) -> Self {
        Self::new(self.conn_pool.clone(), self.context.clone())
    }

    /// A new statement carrying copies of this one's clauses, settings and schema.
    pub fn deep_copy(&self) -> Self {
        let clauses = self
            .clauses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Self {
            id: StatementId::next(),
            conn_pool: self.conn_pool.clone(),
            context: self.context.clone(),
            clauses: RwLock::new(clauses),
            settings: self.settings.clone(),
            schema: RwLock::new(self.schema()),
            sql: RwLock::new(SqlBuffer::default()),
        }
    }

    pub fn id(&self) -> StatementId {
        self.id
    }

    pub fn conn_pool(&self) -> Option<&Arc<dyn ConnPool>> {
        self.conn_pool.as_ref()
    }

    pub fn set_conn_pool(&mut self, pool: Arc<dyn ConnPool>) {
        self.conn_pool = Some(pool);
    }

    pub fn context(&self) -> Option<&Arc<Cx>> {
        self.context.as_ref()
    }

    pub fn set_context(&mut self, cx: Arc<Cx>) {
        self.context = Some(cx);
    }

    /// Store `clause` under its name; a later clause of the same name replaces it.
    pub fn add_clause(&self, clause: Clause) {
        self.clauses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(clause.name.clone(), clause);
    }

    pub fn clause(&self, name: &str) -> Option<Clause> {
        self.clauses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Snapshot of all clauses.
    pub fn clauses(&self) -> HashMap<String, Clause> {
        self.clauses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sorted clause names.
    pub fn clause_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .clauses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Render the clauses named in `names`, in that order, skipping absent ones.
    pub fn build(&self, builders: &ClauseBuilders, names: &[&str]) -> SqlBuffer {
        let clauses = self.clauses.read().unwrap_or_else(PoisonError::into_inner);
        let mut out = SqlBuffer::default();
        for clause in names.iter().filter_map(|name| clauses.get(*name)) {
            if !out.sql.is_empty() {
                out.sql.push(' ');
            }
            clause.build(builders, &mut out);
        }
        out
    }

    pub fn schema(&self) -> Option<Arc<Schema>> {
        self.schema
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Resolve the schema of `M` through `cache` and bind it to this statement.
    pub fn parse<M: Model>(&self, cache: &CacheStore, namer: &dyn Namer) -> Result<Arc<Schema>> {
        let schema = sqlhandle_schema::parse::<M>(cache, namer)?;
        *self.schema.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&schema));
        Ok(schema)
    }

    /// Record the SQL a terminal operation is about to run.
    pub fn set_sql(&self, sql: impl Into<String>, vars: Vec<Value>) {
        *self.sql.write().unwrap_or_else(PoisonError::into_inner) = SqlBuffer {
            sql: sql.into(),
            vars,
        };
    }

    /// The recorded SQL and its bind variables.
    pub fn sql(&self) -> SqlBuffer {
        self.sql.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("id", &self.id)
            .field("has_pool", &self.conn_pool.is_some())
            .field("has_context", &self.context.is_some())
            .field("clauses", &self.clause_names())
            .field("settings", &self.settings)
            .field("schema", &self.schema().map(|s| s.table.clone()))
            .finish()
    }
}
