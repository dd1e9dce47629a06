//! Clause storage.
//!
//! Clauses are opaque named query fragments. A statement keeps at most one
//! clause per name; rendering them into SQL is the job of a dialect and is
//! not interpreted here beyond the [`Expression::build`] hook.

use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Sink that expressions render into.
pub trait Builder {
    /// Append raw SQL text.
    fn write_sql(&mut self, sql: &str);
    /// Append a bind variable.
    fn add_var(&mut self, value: Value);
}

/// A renderable query fragment.
pub trait Expression: fmt::Debug + Send + Sync {
    /// Render this expression into `builder`.
    fn build(&self, builder: &mut dyn Builder);
}

/// Raw SQL with bind variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub sql: String,
    pub vars: Vec<Value>,
}

impl Expression for Expr {
    fn build(&self, builder: &mut dyn Builder) {
        builder.write_sql(&self.sql);
        for var in &self.vars {
            builder.add_var(var.clone());
        }
    }
}

/// Build a raw SQL expression.
pub fn expr(sql: impl Into<String>, vars: impl IntoIterator<Item = Value>) -> Expr {
    Expr {
        sql: sql.into(),
        vars: vars.into_iter().collect(),
    }
}

/// A named query fragment stored on a statement.
#[derive(Debug, Clone)]
pub struct Clause {
    /// Clause name, e.g. `"WHERE"`; unique per statement.
    pub name: String,
    pub expression: Option<Arc<dyn Expression>>,
}

impl Clause {
    pub fn new(name: impl Into<String>, expression: impl Expression + 'static) -> Self {
        Self {
            name: name.into(),
            expression: Some(Arc::new(expression)),
        }
    }

    /// A clause that carries only its name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: None,
        }
    }

    /// Render the clause, preferring a registered builder for its name.
    pub fn build(&self, builders: &ClauseBuilders, out: &mut dyn Builder) {
        if let Some(custom) = builders.get(&self.name) {
            custom(self, out);
            return;
        }
        out.write_sql(&self.name);
        if let Some(expression) = &self.expression {
            out.write_sql(" ");
            expression.build(out);
        }
    }
}

impl PartialEq for Clause {
    /// Two clauses are equal when they share the name and the same expression instance.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && match (&self.expression, &other.expression) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}

/// A custom renderer for clauses of one name.
pub type ClauseBuilder = Arc<dyn Fn(&Clause, &mut dyn Builder) + Send + Sync>;

/// Synchronized clause-name -> builder registry, shared by every handle of one config.
#[derive(Clone, Default)]
pub struct ClauseBuilders {
    inner: Arc<RwLock<HashMap<String, ClauseBuilder>>>,
}

impl ClauseBuilders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the builder for `name`.
    pub fn register(&self, name: impl Into<String>, builder: ClauseBuilder) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), builder);
    }

    pub fn get(&self, name: &str) -> Option<ClauseBuilder> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ClauseBuilders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClauseBuilders")
            .field("len", &self.len())
            .finish()
    }
}

/// A plain SQL + vars accumulator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlBuffer {
    pub sql: String,
    pub vars: Vec<Value>,
}

impl Builder for SqlBuffer {
    fn write_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    fn add_var(&mut self, value: Value) {
        self.vars.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expr_renders_sql_and_vars() {
        let e = expr("id = ?", [Value::BigInt(5)]);
        let mut buf = SqlBuffer::default();
        e.build(&mut buf);
        assert_eq!(buf.sql, "id = ?");
        assert_eq!(buf.vars, vec![Value::BigInt(5)]);
    }

    #[test]
    fn clause_default_rendering() {
        let clause = Clause::new("WHERE", expr("age > ?", [Value::Int(18)]));
        let mut buf = SqlBuffer::default();
        clause.build(&ClauseBuilders::new(), &mut buf);
        assert_eq!(buf.sql, "WHERE age > ?");
        assert_eq!(buf.vars, vec![Value::Int(18)]);
    }

    #[test]
    fn registered_builder_overrides_rendering() {
        let builders = ClauseBuilders::new();
        builders.register(
            "LIMIT",
            Arc::new(|_clause: &Clause, out: &mut dyn Builder| out.write_sql("FETCH FIRST 1 ROWS ONLY")),
        );
        assert_eq!(builders.len(), 1);

        let mut buf = SqlBuffer::default();
        Clause::named("LIMIT").build(&builders, &mut buf);
        assert_eq!(buf.sql, "FETCH FIRST 1 ROWS ONLY");
    }

    #[test]
    fn registry_is_shared_between_clones() {
        let a = ClauseBuilders::new();
        let b = a.clone();
        b.register("ORDER BY", Arc::new(|_: &Clause, _: &mut dyn Builder| {}));
        assert!(a.get("ORDER BY").is_some());
        assert!(a.get("GROUP BY").is_none());
    }

    #[test]
    fn clause_equality_is_by_expression_instance() {
        let a = Clause::new("WHERE", expr("x = 1", []));
        let b = a.clone();
        let c = Clause::new("WHERE", expr("x = 1", []));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(Clause::named("LIMIT"), Clause::named("LIMIT"));
    }
}
