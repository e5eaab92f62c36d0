//! Catalog entities: zones and the nodes that belong to them.

use redb::{ReadableTable, TableDefinition, WriteTransaction};
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};
use crate::repository::{Entity, scan_table};
use crate::tables::{NODES, ZONES};

// ── Zone ──────────────────────────────────────────────────────────

/// A fault-isolation domain (rack, room, site).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: u64,
    pub name: String,
    /// Unix timestamp (seconds) when this zone was created.
    pub created_at: u64,
    /// Unix timestamp (seconds) when this zone was last updated.
    pub updated_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneCreate {
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct ZoneFilter {
    pub id: Option<u64>,
    pub name: Option<String>,
}

impl ZoneFilter {
    pub fn by_id(id: u64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }
}

impl Entity for Zone {
    const KIND: &'static str = "zone";
    const TABLE: TableDefinition<'static, u64, &'static [u8]> = ZONES;

    type Create = ZoneCreate;
    type Filter = ZoneFilter;

    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn build(id: u64, input: ZoneCreate, now: u64) -> Self {
        Zone {
            id,
            name: input.name,
            created_at: now,
            updated_at: now,
        }
    }

    fn matches(&self, filter: &ZoneFilter) -> bool {
        filter.id.is_none_or(|id| id == self.id)
            && filter.name.as_deref().is_none_or(|name| name == self.name)
    }

    fn check_delete(&self, txn: &WriteTransaction) -> CatalogResult<()> {
        let nodes = txn.open_table(NODES).map_err(map_err!(Table))?;
        let owned = scan_table::<Node, _>(&nodes, |node| node.zone_id == self.id)?;
        if owned.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::ConstraintViolation(format!(
                "zone '{}' still has {} node(s)",
                self.name,
                owned.len()
            )))
        }
    }
}

// ── Node ──────────────────────────────────────────────────────────

/// A hypervisor host, assigned to exactly one zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: u64,
    /// Node name as the cluster manager reports it.
    pub name: String,
    pub zone_id: u64,
    pub created_at: u64,
    pub updated_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCreate {
    pub name: String,
    pub zone_id: u64,
}

#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub zone_id: Option<u64>,
}

impl NodeFilter {
    pub fn by_id(id: u64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn in_zone(zone_id: u64) -> Self {
        Self {
            zone_id: Some(zone_id),
            ..Self::default()
        }
    }
}

impl Entity for Node {
    const KIND: &'static str = "node";
    const TABLE: TableDefinition<'static, u64, &'static [u8]> = NODES;

    type Create = NodeCreate;
    type Filter = NodeFilter;

    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn build(id: u64, input: NodeCreate, now: u64) -> Self {
        Node {
            id,
            name: input.name,
            zone_id: input.zone_id,
            created_at: now,
            updated_at: now,
        }
    }

    fn matches(&self, filter: &NodeFilter) -> bool {
        filter.id.is_none_or(|id| id == self.id)
            && filter.name.as_deref().is_none_or(|name| name == self.name)
            && filter.zone_id.is_none_or(|zone_id| zone_id == self.zone_id)
    }

    fn check_insert(&self, txn: &WriteTransaction) -> CatalogResult<()> {
        let zones = txn.open_table(ZONES).map_err(map_err!(Table))?;
        if zones.get(self.zone_id).map_err(map_err!(Read))?.is_some() {
            Ok(())
        } else {
            Err(CatalogError::not_found(Zone::KIND, self.zone_id))
        }
    }
}
