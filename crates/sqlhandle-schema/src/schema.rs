//! Parsed model schema.

use crate::field::Field;
use crate::relationship::Relationship;
use sqlhandle_core::SqlType;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// The parsed shape of one model: table, fields and relationships.
///
/// Fields and relationships are lock-guarded so a cached schema can be
/// rewired in place (see join-table setup) while other handles read it.
#[derive(Debug)]
pub struct Schema {
    /// Model name, e.g. `UserLanguage`.
    pub name: String,
    /// Table name, e.g. `user_languages`.
    pub table: String,
    fields: RwLock<Vec<Field>>,
    relationships: RwLock<HashMap<String, Arc<Relationship>>>,
}

impl Schema {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            fields: RwLock::new(Vec::new()),
            relationships: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_field(self, field: Field) -> Self {
        self.fields
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(field);
        self
    }

    /// Add a relationship owned by this schema. Replaces one of the same name.
    #[must_use]
    pub fn with_relationship(self, relationship: Relationship) -> Self {
        relationship.set_owner(self.table.clone());
        self.relationships
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(relationship.name.clone(), Arc::new(relationship));
        self
    }

    /// Snapshot of the fields.
    pub fn fields(&self) -> Vec<Field> {
        self.fields
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Find a field by database column name, falling back to the field name.
    pub fn look_up_field(&self, name: &str) -> Option<Field> {
        let fields = self.fields.read().unwrap_or_else(PoisonError::into_inner);
        fields
            .iter()
            .find(|f| f.db_name == name)
            .or_else(|| fields.iter().find(|f| f.name == name))
            .cloned()
    }

    /// Overwrite the data type of the field `name` resolves to (as in
    /// [`Schema::look_up_field`]).
    ///
    /// Returns the updated field, or `None` if no such field exists.
    pub fn set_field_data_type(&self, name: &str, data_type: SqlType) -> Option<Field> {
        let mut fields = self.fields.write().unwrap_or_else(PoisonError::into_inner);
        let idx = fields
            .iter()
            .position(|f| f.db_name == name)
            .or_else(|| fields.iter().position(|f| f.name == name))?;
        fields[idx].data_type = data_type;
        Some(fields[idx].clone())
    }

    pub fn relationship(&self, name: &str) -> Option<Arc<Relationship>> {
        self.relationships
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Sorted relationship names.
    pub fn relationship_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .relationships
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Snapshot of all relationships.
    pub fn relationships(&self) -> Vec<Arc<Relationship>> {
        self.relationships
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Insert `relationship` under its name unless that name is taken.
    ///
    /// Returns `true` if inserted; the existing entry is never overwritten.
    pub fn insert_relationship_if_absent(&self, relationship: Arc<Relationship>) -> bool {
        let mut rels = self
            .relationships
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if rels.contains_key(&relationship.name) {
            return false;
        }
        rels.insert(relationship.name.clone(), relationship);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relationship::RelationshipKind;

    fn user_language() -> Schema {
        Schema::new("UserLanguage", "user_languages")
            .with_field(Field::new("UserID", "user_id", SqlType::Integer))
            .with_field(Field::new("LanguageCode", "language_code", SqlType::Text))
    }

    #[test]
    fn look_up_by_db_name_then_name() {
        let schema = user_language();
        assert_eq!(schema.look_up_field("user_id").map(|f| f.name), Some("UserID".to_string()));
        assert_eq!(
            schema.look_up_field("LanguageCode").map(|f| f.db_name),
            Some("language_code".to_string())
        );
        assert!(schema.look_up_field("missing").is_none());
    }

    #[test]
    fn set_field_data_type_updates_in_place() {
        let schema = user_language();
        let updated = schema.set_field_data_type("user_id", SqlType::BigInt);
        assert_eq!(updated.map(|f| f.data_type), Some(SqlType::BigInt));
        assert_eq!(schema.look_up_field("user_id").map(|f| f.data_type), Some(SqlType::BigInt));
        assert!(schema.set_field_data_type("nope", SqlType::BigInt).is_none());
    }

    #[test]
    fn relationships_are_owned_and_first_insert_wins() {
        let schema = user_language()
            .with_relationship(Relationship::new("User", RelationshipKind::BelongsTo, "User"));
        assert_eq!(schema.relationship_names(), vec!["User".to_string()]);
        assert_eq!(schema.relationship("User").map(|r| r.owner()), Some("user_languages".to_string()));

        let existing = schema.relationship("User");
        let dup = Arc::new(Relationship::new("User", RelationshipKind::HasOne, "Other"));
        assert!(!schema.insert_relationship_if_absent(dup));
        assert!(Arc::ptr_eq(
            &schema.relationship("User").expect("present"),
            &existing.expect("present")
        ));

        let fresh = Arc::new(Relationship::new("Language", RelationshipKind::BelongsTo, "Language"));
        assert!(schema.insert_relationship_if_absent(fresh));
        assert_eq!(schema.relationships().len(), 2);
    }
}
