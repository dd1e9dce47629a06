//! Relationship metadata.
//!
//! Relationships live behind `Arc` inside a [`Schema`] so that one parsed
//! definition can be shared (and rewired) by every handle using the cached
//! schema. The wiring-time mutable parts are lock-guarded.

use crate::field::Field;
use crate::schema::Schema;
use std::sync::{Arc, PoisonError, RwLock};

/// The type of relationship between two models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RelationshipKind {
    /// One-to-one: `User` has one `Profile`.
    HasOne,
    /// One-to-many: one `Team` has many `User`s.
    HasMany,
    /// Many-to-one: many `User`s belong to one `Team`.
    #[default]
    BelongsTo,
    /// Many-to-many: `User`s have many `Language`s via a join table.
    Many2Many,
}

/// One foreign-key reference of a relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// The referenced primary key, if the reference is key-to-key.
    pub primary_key: Option<Field>,
    /// A fixed value for polymorphic references.
    pub primary_value: Option<String>,
    /// The foreign key field holding the reference.
    pub foreign_key: Field,
    /// Whether `primary_key` belongs to the schema that owns the relationship.
    pub own_primary_key: bool,
}

impl Reference {
    pub fn new(primary_key: Option<Field>, foreign_key: Field, own_primary_key: bool) -> Self {
        Self {
            primary_key,
            primary_value: None,
            foreign_key,
            own_primary_key,
        }
    }
}

/// A relationship definition on a schema.
#[derive(Debug)]
pub struct Relationship {
    /// Relationship (field) name on the owning model.
    pub name: String,
    pub kind: RelationshipKind,
    /// Name of the related model.
    pub field_schema: String,
    /// Table name of the schema currently owning this relationship.
    owner: RwLock<String>,
    join_table: RwLock<Option<Arc<Schema>>>,
    references: RwLock<Vec<Reference>>,
}

impl Relationship {
    pub fn new(
        name: impl Into<String>,
        kind: RelationshipKind,
        field_schema: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            field_schema: field_schema.into(),
            owner: RwLock::new(String::new()),
            join_table: RwLock::new(None),
            references: RwLock::new(Vec::new()),
        }
    }

    /// Attach a join-table schema.
    #[must_use]
    pub fn with_join_table(self, join_table: Arc<Schema>) -> Self {
        self.set_join_table(join_table);
        self
    }

    /// Add a foreign-key reference.
    #[must_use]
    pub fn with_reference(self, reference: Reference) -> Self {
        self.references
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(reference);
        self
    }

    pub fn owner(&self) -> String {
        self.owner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_owner(&self, table: impl Into<String>) {
        *self.owner.write().unwrap_or_else(PoisonError::into_inner) = table.into();
    }

    pub fn join_table(&self) -> Option<Arc<Schema>> {
        self.join_table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_join_table(&self, join_table: Arc<Schema>) {
        *self.join_table.write().unwrap_or_else(PoisonError::into_inner) = Some(join_table);
    }

    /// Snapshot of the references.
    pub fn references(&self) -> Vec<Reference> {
        self.references
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the foreign key of the reference at `index`.
    ///
    /// Returns `false` if there is no such reference.
    pub fn set_foreign_key(&self, index: usize, field: Field) -> bool {
        let mut refs = self.references.write().unwrap_or_else(PoisonError::into_inner);
        match refs.get_mut(index) {
            Some(reference) => {
                reference.foreign_key = field;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlhandle_core::SqlType;

    #[test]
    fn default_kind_is_belongs_to() {
        assert_eq!(RelationshipKind::default(), RelationshipKind::BelongsTo);
    }

    #[test]
    fn references_and_foreign_key_rewrite() {
        let rel = Relationship::new("Languages", RelationshipKind::Many2Many, "Language")
            .with_reference(Reference::new(
                Some(Field::new("ID", "id", SqlType::BigInt).primary_key(true)),
                Field::new("UserID", "user_id", SqlType::BigInt),
                true,
            ));
        assert_eq!(rel.references().len(), 1);

        let replacement = Field::new("UserID", "user_id", SqlType::Integer);
        assert!(rel.set_foreign_key(0, replacement.clone()));
        assert!(!rel.set_foreign_key(3, replacement.clone()));
        assert_eq!(rel.references()[0].foreign_key, replacement);
    }

    #[test]
    fn join_table_and_owner_are_settable() {
        let rel = Relationship::new("Languages", RelationshipKind::Many2Many, "Language");
        assert!(rel.join_table().is_none());
        rel.set_join_table(Arc::new(Schema::new("UserLanguage", "user_languages")));
        rel.set_owner("users");
        assert_eq!(rel.join_table().map(|s| s.table.clone()).as_deref(), Some("user_languages"));
        assert_eq!(rel.owner(), "users");
    }
}
