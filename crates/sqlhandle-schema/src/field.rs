//! Field metadata on a parsed schema.

use sqlhandle_core::SqlType;

/// Metadata about one model field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Rust field name
    pub name: String,
    /// Database column name
    pub db_name: String,
    /// SQL type for this field
    pub data_type: SqlType,
    /// Whether this is a primary key
    pub primary_key: bool,
    /// Whether this field is nullable
    pub nullable: bool,
}

impl Field {
    /// Create a field with explicit names and type.
    pub fn new(name: impl Into<String>, db_name: impl Into<String>, data_type: SqlType) -> Self {
        Self {
            name: name.into(),
            db_name: db_name.into(),
            data_type,
            primary_key: false,
            nullable: false,
        }
    }

    /// Set as primary key.
    #[must_use]
    pub fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    /// Set nullable flag.
    #[must_use]
    pub fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }
}
