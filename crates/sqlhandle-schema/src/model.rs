//! Model reflection and cached schema parsing.

use crate::cache::CacheStore;
use crate::naming::Namer;
use crate::schema::Schema;
use sqlhandle_core::{Error, Result, SchemaError, SchemaErrorKind};
use std::any::TypeId;
use std::sync::Arc;

/// A type that can describe its own schema.
///
/// # Example
///
/// ```ignore
/// struct User;
///
/// impl Model for User {
///     fn build_schema(namer: &dyn Namer) -> Result<Schema> {
///         let table = namer.table_name("User");
///         Ok(Schema::new("User", table)
///             .with_field(Field::new("ID", "id", SqlType::BigInt).primary_key(true)))
///     }
/// }
/// ```
pub trait Model: 'static {
    /// Build the schema for this model.
    fn build_schema(namer: &dyn Namer) -> Result<Schema>;
}

/// Parse `M`, returning the schema cached in `cache` when present.
///
/// Concurrent first parses of one model may each build a schema; the first
/// one stored wins and every caller gets that instance.
pub fn parse<M: Model>(cache: &CacheStore, namer: &dyn Namer) -> Result<Arc<Schema>> {
    let key = TypeId::of::<M>();
    if let Some(schema) = cache.get::<Schema>(key) {
        return Ok(schema);
    }

    let schema = M::build_schema(namer).map_err(|e| {
        Error::Schema(SchemaError {
            kind: SchemaErrorKind::Parse,
            message: format!("failed to parse model {}: {e}", std::any::type_name::<M>()),
            source: Some(Box::new(e)),
        })
    })?;
    tracing::debug!(model = %schema.name, table = %schema.table, "parsed schema");

    let (value, _) = cache.load_or_store(key, Arc::new(schema));
    value.downcast::<Schema>().map_err(|_| {
        Error::schema(
            SchemaErrorKind::Parse,
            format!("cache entry for {} is not a schema", std::any::type_name::<M>()),
        )
    })
}
