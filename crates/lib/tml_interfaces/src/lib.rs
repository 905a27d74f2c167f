//! # tml_interfaces
//!
//! Typed access layer over the TML document store: one generic repository
//! per entity, validated by a schema pair and handed out through a
//! lazily-initialized registry owned by the composition root.

pub mod auth;
pub mod document;
pub mod entities;
pub mod ids;
pub mod registry;
pub mod repository;
pub mod schema;
pub mod storage;
pub mod store;

pub use registry::{Interfaces, Lazy};
pub use repository::{ConnectOptions, Entity, Profile, RepoError, Repository};
pub use schema::{FieldType, Schema, SchemaError, SchemaPair};
pub use store::{IndexDirection, IndexSpec, StoreCollection, StoreError};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
