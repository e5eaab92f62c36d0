//! distributor-catalog — the node→zone topology catalog.
//!
//! Backed by [redb](https://docs.rs/redb). Zones and nodes are
//! JSON-serialized into `u64 → &[u8]` tables keyed by their catalog id.
//! Ids are handed out from a per-kind sequence table and are never reused.
//!
//! # Architecture
//!
//! ```text
//! Catalog
//!   ├── Repository<Zone>   get / get_multiple / create / delete
//!   ├── Repository<Node>   get / get_multiple / create / delete
//!   └── ZoneCatalog        lookup_zone_for_node / list_all_zones
//! ```
//!
//! Referential rules live on the entity types and run inside the write
//! transaction: a node needs an existing zone, and a zone with nodes
//! cannot be deleted.

/// Convert any `Display` error into a `CatalogError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| $crate::error::CatalogError::$variant(e.to_string())
    };
}

pub mod error;
pub mod repository;
pub mod store;
pub mod tables;
pub mod types;
pub mod zone_catalog;

pub use error::{CatalogError, CatalogResult};
pub use repository::{Entity, Repository};
pub use store::Catalog;
pub use types::*;
pub use zone_catalog::ZoneCatalog;
