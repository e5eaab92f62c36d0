//! Zone-redundancy placement policy.
//!
//! A pool is out of policy when it has more running members than zones in
//! use while some zone is still unused: at least one member could move to
//! an empty zone and the pool would survive the loss of more zones.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use distributor_catalog::{Zone, ZoneCatalog};

use crate::aggregator::MembershipAggregator;
use crate::error::AuditResult;

/// Placement decision for one pool together with its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolAudit {
    pub pool: String,
    pub running_members: usize,
    /// Zones hosting running members, first-seen order.
    pub used_zones: Vec<Zone>,
    pub total_zones: usize,
    pub has_members_to_migrate: bool,
}

impl PoolAudit {
    pub fn unused_zones(&self) -> usize {
        self.total_zones.saturating_sub(self.used_zones.len())
    }
}

/// The placement rule.
///
/// Never true when every running member already has its own zone, or when
/// every zone is already in use.
pub fn needs_migration(running_members: usize, used_zones: usize, total_zones: usize) -> bool {
    let unused_zones = total_zones.saturating_sub(used_zones);
    running_members > used_zones && unused_zones > 0
}

/// Audits pools against the placement rule.
#[derive(Clone)]
pub struct PlacementAuditor {
    aggregator: MembershipAggregator,
    catalog: Arc<dyn ZoneCatalog + Send + Sync>,
}

impl PlacementAuditor {
    pub fn new(
        aggregator: MembershipAggregator,
        catalog: Arc<dyn ZoneCatalog + Send + Sync>,
    ) -> Self {
        Self { aggregator, catalog }
    }

    /// Whether `pool_name` has running members that should move to an unused zone.
    pub async fn has_members_to_migrate(&self, pool_name: &str) -> AuditResult<bool> {
        Ok(self.audit(pool_name).await?.has_members_to_migrate)
    }

    pub async fn audit(&self, pool_name: &str) -> AuditResult<PoolAudit> {
        let snapshot = self.aggregator.snapshot(pool_name).await?;
        let total_zones = self.catalog.list_all_zones()?.len();

        let running_members = snapshot.running_members.len();
        let has_members_to_migrate =
            needs_migration(running_members, snapshot.active_zones.len(), total_zones);

        let audit = PoolAudit {
            pool: snapshot.pool,
            running_members,
            used_zones: snapshot.active_zones,
            total_zones,
            has_members_to_migrate,
        };
        debug!(
            pool = %audit.pool,
            running = audit.running_members,
            used = audit.used_zones.len(),
            total = audit.total_zones,
            "pool audited"
        );
        if audit.has_members_to_migrate {
            info!(pool = %audit.pool, unused = audit.unused_zones(), "pool has members to migrate");
        }
        Ok(audit)
    }
}
