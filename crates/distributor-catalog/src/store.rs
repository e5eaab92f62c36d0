//! Catalog — redb-backed persistence for zones and nodes.
//!
//! Supports both on-disk and in-memory backends (the latter for testing).
//! Write operations are only issued by operator commands; the audit path
//! reads through [`crate::ZoneCatalog`].

use std::path::Path;
use std::sync::Arc;

use redb::Database;
use tracing::debug;

use crate::error::CatalogResult;
use crate::repository::Repository;
use crate::tables::{NODES, SEQUENCES, ZONES};
use crate::types::*;

/// Thread-safe zone catalog backed by redb.
#[derive(Clone)]
pub struct Catalog {
    pub(crate) db: Arc<Database>,
    zones: Repository<Zone>,
    nodes: Repository<Node>,
}

impl Catalog {
    /// Open (or create) a persistent catalog at the given path.
    pub fn open(path: &Path) -> CatalogResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(map_err!(Open))?;
        }
        let db = Database::create(path).map_err(map_err!(Open))?;
        let catalog = Self::from_database(db)?;
        debug!(?path, "catalog opened");
        Ok(catalog)
    }

    /// Create an ephemeral in-memory catalog (for testing).
    pub fn open_in_memory() -> CatalogResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let catalog = Self::from_database(db)?;
        debug!("in-memory catalog opened");
        Ok(catalog)
    }

    fn from_database(db: Database) -> CatalogResult<Self> {
        let db = Arc::new(db);
        let catalog = Self {
            zones: Repository::new(Arc::clone(&db)),
            nodes: Repository::new(Arc::clone(&db)),
            db,
        };
        catalog.ensure_tables()?;
        Ok(catalog)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> CatalogResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(ZONES).map_err(map_err!(Table))?;
        txn.open_table(NODES).map_err(map_err!(Table))?;
        txn.open_table(SEQUENCES).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    pub fn zones(&self) -> &Repository<Zone> {
        &self.zones
    }

    pub fn nodes(&self) -> &Repository<Node> {
        &self.nodes
    }

    // ── Zones ──────────────────────────────────────────────────────

    pub fn create_zone(&self, name: &str) -> CatalogResult<Zone> {
        self.zones.create(ZoneCreate {
            name: name.to_string(),
        })
    }

    /// Delete a zone by name. Fails while nodes still reference it.
    pub fn delete_zone_by_name(&self, name: &str) -> CatalogResult<Zone> {
        let zone = self.zones.get_by_name(name)?;
        self.zones.delete(zone.id)
    }

    // ── Nodes ──────────────────────────────────────────────────────

    /// Create a node in the zone called `zone_name`.
    pub fn create_node(&self, name: &str, zone_name: &str) -> CatalogResult<Node> {
        let zone = self.zones.get_by_name(zone_name)?;
        self.nodes.create(NodeCreate {
            name: name.to_string(),
            zone_id: zone.id,
        })
    }

    pub fn delete_node_by_name(&self, name: &str) -> CatalogResult<Node> {
        let node = self.nodes.get_by_name(name)?;
        self.nodes.delete(node.id)
    }

    /// Nodes assigned to a zone, ordered by id.
    pub fn nodes_in_zone(&self, zone_id: u64) -> CatalogResult<Vec<Node>> {
        self.nodes.get_multiple(&NodeFilter::in_zone(zone_id))
    }
}
