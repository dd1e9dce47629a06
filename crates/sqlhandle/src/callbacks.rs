//! Callback registry.
//!
//! Each terminal operation has a [`Processor`] holding named callbacks that
//! run, in a resolved order, against the handle before the statement is sent
//! to the pool. Ordering constraints are expressed with [`Processor::before`]
//! and [`Processor::after`]; `"*"` means "first" or "last" respectively.

use crate::db::Db;
use sqlhandle_core::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// A callback run against the handle of one operation.
pub type CallbackFn = Arc<dyn Fn(&mut Db) + Send + Sync>;

/// Operations that have a callback processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create = 0,
    Query = 1,
    Update = 2,
    Delete = 3,
    Row = 4,
    Raw = 5,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Create,
        Operation::Query,
        Operation::Update,
        Operation::Delete,
        Operation::Row,
        Operation::Raw,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Query => "query",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Row => "row",
            Operation::Raw => "raw",
        }
    }
}

/// Callback processors for every [`Operation`], shared by all handles of one config.
pub struct Callbacks {
    processors: [Processor; 6],
}

impl Callbacks {
    pub fn new() -> Self {
        Self {
            processors: Operation::ALL.map(Processor::new),
        }
    }

    pub fn processor(&self, op: Operation) -> &Processor {
        &self.processors[op as usize]
    }

    pub fn create(&self) -> &Processor {
        self.processor(Operation::Create)
    }

    pub fn query(&self) -> &Processor {
        self.processor(Operation::Query)
    }

    pub fn update(&self) -> &Processor {
        self.processor(Operation::Update)
    }

    pub fn delete(&self) -> &Processor {
        self.processor(Operation::Delete)
    }

    pub fn row(&self) -> &Processor {
        self.processor(Operation::Row)
    }

    pub fn raw(&self) -> &Processor {
        self.processor(Operation::Raw)
    }
}

impl Default for Callbacks {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for op in Operation::ALL {
            map.entry(&op.as_str(), &self.processor(op).len());
        }
        map.finish()
    }
}

#[derive(Clone)]
struct Entry {
    name: String,
    before: Option<String>,
    after: Option<String>,
    handler: CallbackFn,
}

#[derive(Default)]
struct ProcessorState {
    entries: Vec<Entry>,
    /// `entries` indices in execution order.
    order: Vec<usize>,
}

/// Ordered callbacks of one operation.
pub struct Processor {
    op: Operation,
    state: RwLock<ProcessorState>,
}

impl Processor {
    fn new(op: Operation) -> Self {
        Self {
            op,
            state: RwLock::new(ProcessorState::default()),
        }
    }

    pub fn operation(&self) -> Operation {
        self.op
    }

    /// Start a registration that must run before `name` (`"*"`: before all).
    pub fn before(&self, name: impl Into<String>) -> CallbackBuilder<'_> {
        CallbackBuilder {
            processor: self,
            before: Some(name.into()),
            after: None,
        }
    }

    /// Start a registration that must run after `name` (`"*"`: after all).
    pub fn after(&self, name: impl Into<String>) -> CallbackBuilder<'_> {
        CallbackBuilder {
            processor: self,
            before: None,
            after: Some(name.into()),
        }
    }

    /// Register `handler` under `name` with no ordering constraint.
    pub fn register(&self, name: impl Into<String>, handler: CallbackFn) -> Result<()> {
        self.insert(Entry {
            name: name.into(),
            before: None,
            after: None,
            handler,
        })
    }

    /// Replace the handler of `name`, keeping its constraints. Registers it if absent.
    pub fn replace(&self, name: impl Into<String>, handler: CallbackFn) -> Result<()> {
        let name = name.into();
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = state.entries.iter_mut().find(|e| e.name == name) {
            entry.handler = handler;
            tracing::debug!(operation = self.op.as_str(), callback = %name, "callback replaced");
            return Ok(());
        }
        state.entries.push(Entry {
            name,
            before: None,
            after: None,
            handler,
        });
        Self::compile(self.op, &mut state)
    }

    /// Remove `name`. Returns `false` if it was not registered.
    pub fn remove(&self, name: &str) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let Some(idx) = state.entries.iter().position(|e| e.name == name) else {
            return false;
        };
        state.entries.remove(idx);
        // Dropping an entry only removes edges, so the order still resolves.
        let _ = Self::compile(self.op, &mut state);
        tracing::debug!(operation = self.op.as_str(), callback = name, "callback removed");
        true
    }

    pub fn get(&self, name: &str) -> Option<CallbackFn> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| Arc::clone(&e.handler))
    }

    /// Callback names in execution order.
    pub fn names(&self) -> Vec<String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .order
            .iter()
            .map(|&i| state.entries[i].name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every callback, in order, against `db`.
    pub fn execute(&self, db: &mut Db) {
        let handlers: Vec<CallbackFn> = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            state
                .order
                .iter()
                .map(|&i| Arc::clone(&state.entries[i].handler))
                .collect()
        };
        tracing::trace!(operation = self.op.as_str(), count = handlers.len(), "running callbacks");
        for handler in handlers {
            handler(db);
        }
    }

    fn insert(&self, entry: Entry) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.entries.iter().any(|e| e.name == entry.name) {
            return Err(Error::config(format!(
                "{} callback `{}` is already registered",
                self.op.as_str(),
                entry.name
            )));
        }
        let name = entry.name.clone();
        state.entries.push(entry);
        if let Err(e) = Self::compile(self.op, &mut state) {
            state.entries.pop();
            return Err(e);
        }
        tracing::debug!(operation = self.op.as_str(), callback = %name, "callback registered");
        Ok(())
    }

    /// Resolve execution order: `before("*")` entries first, `after("*")`
    /// entries last, named constraints respected, registration order otherwise.
    fn compile(op: Operation, state: &mut ProcessorState) -> Result<()> {
        let entries = &state.entries;
        let n = entries.len();
        let index: HashMap<&str, usize> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.as_str(), i))
            .collect();

        let group = |e: &Entry| match (e.before.as_deref(), e.after.as_deref()) {
            (Some("*"), _) => 0,
            (_, Some("*")) => 2,
            _ => 1,
        };

        // edges[a] contains b when a must run before b.
        let mut edges = vec![Vec::new(); n];
        let mut in_degree = vec![0_usize; n];
        for (i, e) in entries.iter().enumerate() {
            if let Some(&target) = e.before.as_deref().and_then(|b| index.get(b)) {
                edges[i].push(target);
                in_degree[target] += 1;
            }
            if let Some(&source) = e.after.as_deref().and_then(|a| index.get(a)) {
                edges[source].push(i);
                in_degree[i] += 1;
            }
        }

        let mut order = Vec::with_capacity(n);
        let mut done = vec![false; n];
        while order.len() < n {
            let next = (0..n)
                .filter(|&i| !done[i] && in_degree[i] == 0)
                .min_by_key(|&i| (group(&entries[i]), i));
            let Some(i) = next else {
                let stuck: Vec<&str> = (0..n)
                    .filter(|&i| !done[i])
                    .map(|i| entries[i].name.as_str())
                    .collect();
                return Err(Error::config(format!(
                    "conflicting {} callback order among: {}",
                    op.as_str(),
                    stuck.join(", ")
                )));
            };
            done[i] = true;
            order.push(i);
            for &j in &edges[i] {
                in_degree[j] -= 1;
            }
        }

        state.order = order;
        Ok(())
    }
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processor")
            .field("operation", &self.op)
            .field("callbacks", &self.names())
            .finish()
    }
}

/// A pending registration with ordering constraints.
#[must_use = "call `register` to add the callback"]
pub struct CallbackBuilder<'a> {
    processor: &'a Processor,
    before: Option<String>,
    after: Option<String>,
}

impl CallbackBuilder<'_> {
    pub fn before(mut self, name: impl Into<String>) -> Self {
        self.before = Some(name.into());
        self
    }

    pub fn after(mut self, name: impl Into<String>) -> Self {
        self.after = Some(name.into());
        self
    }

    pub fn register(self, name: impl Into<String>, handler: CallbackFn) -> Result<()> {
        self.processor.insert(Entry {
            name: name.into(),
            before: self.before,
            after: self.after,
            handler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> CallbackFn {
        Arc::new(|_: &mut Db| {})
    }

    #[test]
    fn registration_order_without_constraints() {
        let callbacks = Callbacks::new();
        let p = callbacks.create();
        p.register("a", noop()).expect("register a");
        p.register("b", noop()).expect("register b");
        p.register("c", noop()).expect("register c");
        assert_eq!(p.names(), vec!["a", "b", "c"]);
        assert!(callbacks.query().is_empty());
    }

    #[test]
    fn before_and_after_constraints() {
        let callbacks = Callbacks::new();
        let p = callbacks.update();
        p.register("save", noop()).expect("save");
        p.after("*").register("audit", noop()).expect("audit");
        p.before("save").register("validate", noop()).expect("validate");
        p.before("*").register("begin", noop()).expect("begin");
        p.after("save").before("audit").register("touch", noop()).expect("touch");

        assert_eq!(p.names(), vec!["begin", "validate", "save", "touch", "audit"]);
    }

    #[test]
    fn duplicate_and_cyclic_registrations_fail() {
        let callbacks = Callbacks::new();
        let p = callbacks.delete();
        p.register("a", noop()).expect("a");
        assert!(p.register("a", noop()).is_err());

        p.after("a").register("b", noop()).expect("b");
        let err = p.before("a").after("b").register("c", noop()).expect_err("cycle");
        assert!(err.to_string().contains("conflicting delete callback order"));
        assert_eq!(p.names(), vec!["a", "b"]);
    }

    #[test]
    fn replace_remove_get() {
        let callbacks = Callbacks::new();
        let p = callbacks.raw();
        let first = noop();
        p.register("x", Arc::clone(&first)).expect("x");
        assert!(Arc::ptr_eq(&p.get("x").expect("x"), &first));

        let second = noop();
        p.replace("x", Arc::clone(&second)).expect("replace");
        assert!(Arc::ptr_eq(&p.get("x").expect("x"), &second));

        p.replace("y", noop()).expect("replace registers");
        assert_eq!(p.names(), vec!["x", "y"]);

        assert!(p.remove("x"));
        assert!(!p.remove("x"));
        assert!(p.get("x").is_none());
        assert_eq!(p.names(), vec!["y"]);
    }
}
