//! Many-to-many join table setup.

use crate::db::Db;
use sqlhandle_core::{Error, Result, SchemaErrorKind};
use sqlhandle_schema::Model;
use std::sync::Arc;

impl Db {
    /// Wire the `field` many-to-many relation of `M` to the join model `J`.
    ///
    /// Every foreign key of the relation is pointed at the matching field of
    /// `J`'s schema (taking over its data type), relations known only to the
    /// previous join schema are copied over without replacing existing names,
    /// and the relation's join table becomes `J`'s schema.
    ///
    /// Nothing is modified unless every foreign key resolves.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn setup_join_table<M: Model, J: Model>(&self, field: &str) -> Result<()> {
        let tx = self.get_instance();
        let stmt = &tx.statement;
        let namer = tx.config.naming_strategy.as_ref();
        let model_schema = stmt.parse::<M>(&tx.config.cache_store, namer)?;
        let join_schema = stmt.parse::<J>(&tx.config.cache_store, namer)?;

        let (relation, old_join) = model_schema
            .relationship(field)
            .and_then(|rel| rel.join_table().map(|jt| (rel, jt)))
            .ok_or_else(|| {
                Error::schema(
                    SchemaErrorKind::RelationNotFound,
                    format!("failed to find relation: {field}"),
                )
            })?;

        let references = relation.references();
        if let Some(missing) = references
            .iter()
            .find(|r| join_schema.look_up_field(&r.foreign_key.db_name).is_none())
        {
            return Err(Error::schema(
                SchemaErrorKind::MissingJoinField,
                format!("missing field {} for join table", missing.foreign_key.db_name),
            ));
        }

        for (idx, reference) in references.iter().enumerate() {
            let fk = &reference.foreign_key;
            if let Some(joined) = join_schema.set_field_data_type(&fk.db_name, fk.data_type.clone()) {
                relation.set_foreign_key(idx, joined);
            }
        }

        if !Arc::ptr_eq(&old_join, &join_schema) {
            for rel in old_join.relationships() {
                if join_schema.insert_relationship_if_absent(Arc::clone(&rel)) {
                    rel.set_owner(join_schema.table.clone());
                    continue;
                }
                let same = join_schema
                    .relationship(&rel.name)
                    .is_some_and(|existing| Arc::ptr_eq(&existing, &rel));
                if !same {
                    tracing::warn!(
                        relation = %rel.name,
                        join_table = %join_schema.table,
                        "join table already defines this relation; keeping the existing one"
                    );
                    tx.config.logger.warn(&format!(
                        "join table {} already defines relation {}; keeping the existing one",
                        join_schema.table, rel.name
                    ));
                }
            }
        }

        tracing::debug!(
            model = %model_schema.name,
            relation = field,
            join_table = %join_schema.table,
            "join table wired"
        );
        relation.set_join_table(join_schema);
        Ok(())
    }
}
