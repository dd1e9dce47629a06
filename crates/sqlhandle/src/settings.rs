//! Settings store.
//!
//! One synchronized map carries two keyspaces: session keys, visible to every
//! handle sharing the statement, and instance keys, namespaced by the
//! [`StatementId`] of one statement so structurally equal forks never see
//! each other's values.

use crate::statement::StatementId;
use sqlhandle_core::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

/// Key of a settings entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SettingKey {
    /// Set through `Db::set`.
    Session(String),
    /// Set through `Db::instance_set`, scoped to one statement instance.
    Instance(StatementId, String),
}

/// Thread-safe key/value scratch space of a statement.
#[derive(Default)]
pub struct Settings {
    entries: RwLock<HashMap<SettingKey, Value>>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, key: SettingKey, value: Value) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value);
    }

    pub fn load(&self, key: &SettingKey) -> Option<Value> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn delete(&self, key: &SettingKey) -> Option<Value> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Clone for Settings {
    /// Deep copy: the new store shares nothing with `self`.
    fn clone(&self) -> Self {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Self {
            entries: RwLock::new(entries),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_and_instance_keys_do_not_collide() {
        let settings = Settings::new();
        let id = StatementId::next();
        settings.store(SettingKey::Session("k".into()), Value::Int(1));
        settings.store(SettingKey::Instance(id, "k".into()), Value::Int(2));

        assert_eq!(settings.load(&SettingKey::Session("k".into())), Some(Value::Int(1)));
        assert_eq!(settings.load(&SettingKey::Instance(id, "k".into())), Some(Value::Int(2)));
        assert_eq!(settings.load(&SettingKey::Instance(StatementId::next(), "k".into())), None);
        assert_eq!(settings.len(), 2);
    }

    #[test]
    fn clone_is_independent() {
        let a = Settings::new();
        a.store(SettingKey::Session("shared".into()), Value::Bool(true));
        let b = a.clone();
        b.store(SettingKey::Session("only_b".into()), Value::Bool(true));
        a.delete(&SettingKey::Session("shared".into()));

        assert!(a.load(&SettingKey::Session("only_b".into())).is_none());
        assert_eq!(b.load(&SettingKey::Session("shared".into())), Some(Value::Bool(true)));
    }
}
