//! Parsed model schemas for sqlhandle.
//!
//! This crate provides:
//! - `Schema`, `Field` and `Relationship` metadata for reflected models
//! - `Namer` / `NamingStrategy` for table and column names
//! - `CacheStore`, the synchronized cache shared by one config
//! - `Model` and the cache-backed `parse` entry point

pub mod cache;
pub mod field;
pub mod model;
pub mod naming;
pub mod relationship;
pub mod schema;

pub use cache::{CacheStore, CacheValue};
pub use field::Field;
pub use model::{Model, parse};
pub use naming::{Namer, NamingStrategy, pluralize, to_snake_case};
pub use relationship::{Reference, Relationship, RelationshipKind};
pub use schema::Schema;
