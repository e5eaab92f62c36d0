//! In-memory cluster and catalog fixtures shared by the audit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use distributor_catalog::Catalog;
use distributor_core::{
    ClusterClient, ClusterError, ClusterFuture, Member, MemberKind, MemberStatus, Pool,
};

/// Cluster manager stand-in serving a fixed set of pools.
#[derive(Default)]
pub(crate) struct FakeCluster {
    pools: Vec<(Pool, Vec<Member>)>,
    /// Pool whose member fetch fails with a transport error.
    unreachable: Option<String>,
    member_calls: AtomicUsize,
}

impl FakeCluster {
    pub fn with_pool(mut self, name: &str, members: &[(u32, &str, MemberStatus)]) -> Self {
        let members = members
            .iter()
            .map(|&(vm_id, node, status)| Member {
                name: format!("vm{vm_id}.example.com"),
                vm_id,
                kind: MemberKind::Qemu,
                pool_name: name.to_string(),
                node_name: node.to_string(),
                status,
            })
            .collect();
        self.pools.push((Pool::new(name), members));
        self
    }

    pub fn unreachable(mut self, name: &str) -> Self {
        self.unreachable = Some(name.to_string());
        self
    }

    pub fn member_calls(&self) -> usize {
        self.member_calls.load(Ordering::SeqCst)
    }
}

impl ClusterClient for FakeCluster {
    fn list_pools(&self) -> ClusterFuture<'_, Vec<Pool>> {
        Box::pin(async move { Ok(self.pools.iter().map(|(pool, _)| pool.clone()).collect()) })
    }

    fn get_pool_members<'a>(&'a self, pool_name: &'a str) -> ClusterFuture<'a, Vec<Member>> {
        Box::pin(async move {
            self.member_calls.fetch_add(1, Ordering::SeqCst);
            if self.unreachable.as_deref() == Some(pool_name) {
                return Err(ClusterError::Transport("connection reset by peer".to_string()));
            }
            self.pools
                .iter()
                .find(|(pool, _)| pool.name == pool_name)
                .map(|(_, members)| members.clone())
                .ok_or_else(|| ClusterError::PoolNotFound(pool_name.to_string()))
        })
    }
}

/// Zones BIT-1, BIT-2A and BIT-2C with nodes proxmox01..03, one per zone.
pub(crate) fn three_zone_catalog() -> Arc<Catalog> {
    let catalog = Catalog::open_in_memory().unwrap();
    for zone in ["BIT-1", "BIT-2A", "BIT-2C"] {
        catalog.create_zone(zone).unwrap();
    }
    catalog.create_node("proxmox01", "BIT-1").unwrap();
    catalog.create_node("proxmox02", "BIT-2A").unwrap();
    catalog.create_node("proxmox03", "BIT-2C").unwrap();
    Arc::new(catalog)
}

/// The reference cluster: `important` has two running members on
/// proxmox01, `critical` one running and one stopped member on proxmox02.
pub(crate) fn reference_cluster() -> FakeCluster {
    FakeCluster::default()
        .with_pool(
            "important",
            &[
                (100, "proxmox01", MemberStatus::Running),
                (101, "proxmox01", MemberStatus::Running),
            ],
        )
        .with_pool(
            "critical",
            &[
                (102, "proxmox02", MemberStatus::Running),
                (103, "proxmox02", MemberStatus::Stopped),
            ],
        )
}
