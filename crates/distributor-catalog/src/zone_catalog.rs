//! Read-only view of the catalog used by the placement audit.

use redb::{ReadableDatabase, ReadableTable};

use crate::error::{CatalogError, CatalogResult};
use crate::repository::{Entity, decode, scan_table};
use crate::store::Catalog;
use crate::tables::{NODES, ZONES};
use crate::types::{Node, Zone};

/// Node→zone resolution and zone enumeration.
pub trait ZoneCatalog {
    /// Zone of the node called `node_name`.
    ///
    /// Fails with [`CatalogError::NotFound`] if the node is unknown and with
    /// [`CatalogError::Inconsistent`] if the node points at a missing zone.
    fn lookup_zone_for_node(&self, node_name: &str) -> CatalogResult<Zone>;

    /// Every known zone, ordered by id.
    fn list_all_zones(&self) -> CatalogResult<Vec<Zone>>;
}

impl ZoneCatalog for Catalog {
    fn lookup_zone_for_node(&self, node_name: &str) -> CatalogResult<Zone> {
        // Both lookups share one read transaction.
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;

        let nodes = txn.open_table(NODES).map_err(map_err!(Table))?;
        let node = scan_table::<Node, _>(&nodes, |node| node.name == node_name)?
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::not_found(Node::KIND, node_name))?;

        let zones = txn.open_table(ZONES).map_err(map_err!(Table))?;
        match zones.get(node.zone_id).map_err(map_err!(Read))? {
            Some(guard) => decode(guard.value()),
            None => Err(CatalogError::Inconsistent(format!(
                "node '{}' references missing zone {}",
                node.name, node.zone_id
            ))),
        }
    }

    fn list_all_zones(&self) -> CatalogResult<Vec<Zone>> {
        self.zones().get_multiple(&Default::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_node_to_its_zone() {
        let catalog = Catalog::open_in_memory().unwrap();
        let zone = catalog.create_zone("BIT-2A").unwrap();
        catalog.create_node("proxmox02", "BIT-2A").unwrap();

        assert_eq!(catalog.lookup_zone_for_node("proxmox02").unwrap(), zone);
    }

    #[test]
    fn unknown_node_is_not_found() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.create_zone("BIT-1").unwrap();

        let err = catalog.lookup_zone_for_node("proxmox09").unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { kind: "node", ref key } if key == "proxmox09"));
    }

    #[test]
    fn dangling_zone_reference_is_inconsistent() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.create_zone("BIT-1").unwrap();
        catalog.create_node("proxmox01", "BIT-1").unwrap();

        // Remove the zone behind the repository's back.
        let txn = catalog.db.begin_write().unwrap();
        {
            let mut zones = txn.open_table(ZONES).unwrap();
            zones.remove(1u64).unwrap();
        }
        txn.commit().unwrap();

        let err = catalog.lookup_zone_for_node("proxmox01").unwrap_err();
        assert!(matches!(err, CatalogError::Inconsistent(_)));
    }

    #[test]
    fn lists_all_zones_in_id_order() {
        let catalog = Catalog::open_in_memory().unwrap();
        for name in ["BIT-1", "BIT-2A", "BIT-2C"] {
            catalog.create_zone(name).unwrap();
        }

        let zones = catalog.list_all_zones().unwrap();
        let ids: Vec<u64> = zones.iter().map(|z| z.id).collect();
        assert_eq!(ids, [1, 2, 3]);
    }
}
