//! Joins live pool membership with the zone catalog.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use distributor_catalog::{CatalogError, Zone, ZoneCatalog};
use distributor_core::{ClusterClient, Member};

use crate::error::{AuditError, AuditResult};

/// A pool's running members and the zones they occupy, from one member fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipSnapshot {
    pub pool: String,
    /// Members whose status counts toward placement, in cluster order.
    pub running_members: Vec<Member>,
    /// Distinct zones hosting `running_members`, in first-seen order.
    pub active_zones: Vec<Zone>,
}

/// Resolves which zones a pool's running members occupy.
#[derive(Clone)]
pub struct MembershipAggregator {
    cluster: Arc<dyn ClusterClient>,
    catalog: Arc<dyn ZoneCatalog + Send + Sync>,
}

impl MembershipAggregator {
    pub fn new(
        cluster: Arc<dyn ClusterClient>,
        catalog: Arc<dyn ZoneCatalog + Send + Sync>,
    ) -> Self {
        Self { cluster, catalog }
    }

    /// Members of `pool_name` that count toward placement.
    pub async fn running_members(&self, pool_name: &str) -> AuditResult<Vec<Member>> {
        let members = self.cluster.get_pool_members(pool_name).await?;
        let total = members.len();
        let running: Vec<Member> = members
            .into_iter()
            .filter(|m| m.status.counts_toward_placement())
            .collect();
        debug!(pool = pool_name, total, running = running.len(), "fetched pool members");
        Ok(running)
    }

    /// Number of running members, before any zone deduplication.
    pub async fn running_member_count(&self, pool_name: &str) -> AuditResult<usize> {
        Ok(self.running_members(pool_name).await?.len())
    }

    /// Distinct zones hosting the pool's running members, first-seen order.
    pub async fn resolve_active_zones(&self, pool_name: &str) -> AuditResult<Vec<Zone>> {
        Ok(self.snapshot(pool_name).await?.active_zones)
    }

    /// Running members and active zones from a single member fetch.
    pub async fn snapshot(&self, pool_name: &str) -> AuditResult<MembershipSnapshot> {
        let running_members = self.running_members(pool_name).await?;
        let active_zones = self.zones_of(pool_name, &running_members)?;
        Ok(MembershipSnapshot {
            pool: pool_name.to_string(),
            running_members,
            active_zones,
        })
    }

    fn zones_of(&self, pool_name: &str, members: &[Member]) -> AuditResult<Vec<Zone>> {
        let mut seen = HashSet::new();
        let mut zones = Vec::new();
        for member in members {
            let zone = match self.catalog.lookup_zone_for_node(&member.node_name) {
                Ok(zone) => zone,
                Err(CatalogError::NotFound { kind: "node", .. }) => {
                    return Err(AuditError::CatalogDrift {
                        pool: pool_name.to_string(),
                        node: member.node_name.clone(),
                    });
                }
                Err(e) => return Err(e.into()),
            };
            debug!(pool = pool_name, member = %member.name, node = %member.node_name, zone = %zone.name, "resolved member zone");
            if seen.insert(zone.id) {
                zones.push(zone);
            }
        }
        Ok(zones)
    }
}
