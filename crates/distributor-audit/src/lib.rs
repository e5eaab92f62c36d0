//! distributor-audit — zone-redundancy placement audit.
//!
//! Joins live pool membership from the cluster manager with the local
//! node→zone catalog and decides, per pool, whether running members are
//! crowded into fewer zones than they could use.
//!
//! # Architecture
//!
//! ```text
//! Orchestrator
//!   └── PlacementAuditor        needs_migration(running, used, total)
//!         ├── MembershipAggregator
//!         │     ├── ClusterClient   pool members
//!         │     └── ZoneCatalog     node → zone
//!         └── ZoneCatalog           total zones
//! ```

pub mod aggregator;
pub mod auditor;
pub mod error;
pub mod orchestrator;

#[cfg(test)]
mod testing;

pub use aggregator::{MembershipAggregator, MembershipSnapshot};
pub use auditor::{PlacementAuditor, PoolAudit, needs_migration};
pub use error::{AuditError, AuditResult};
pub use orchestrator::{Orchestrator, Outcome, PoolReport, RunOptions, RunReport};
