//! Runs the placement audit over a cluster's pools and builds the report.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use distributor_catalog::ZoneCatalog;
use distributor_core::{ClusterClient, validate_pool_name};

use crate::aggregator::MembershipAggregator;
use crate::auditor::{PlacementAuditor, PoolAudit};
use crate::error::{AuditError, AuditResult};

/// Which pools a run covers and which of them are excluded from the outcome.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Pools that are audited and reported but never fail the run.
    pub exclude_pools: BTreeSet<String>,
    /// Audit only these pools. Empty means every pool in the cluster.
    pub pools: Vec<String>,
}

/// Overall result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Compliant,
    MembersToMigrate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolReport {
    #[serde(flatten)]
    pub audit: PoolAudit,
    pub excluded: bool,
}

impl PoolReport {
    /// Operator-facing line, if this pool has anything to report.
    pub fn line(&self) -> Option<String> {
        if !self.audit.has_members_to_migrate {
            return None;
        }
        Some(if self.excluded {
            format!(
                "Pool '{}' has members to migrate, but is excluded",
                self.audit.pool
            )
        } else {
            format!("Pool '{}' has members to migrate", self.audit.pool)
        })
    }
}

/// Every audited pool, in cluster order, plus the overall outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub pools: Vec<PoolReport>,
    pub outcome: Outcome,
}

impl RunReport {
    pub fn new(pools: Vec<PoolReport>) -> Self {
        let outcome = if pools
            .iter()
            .any(|p| p.audit.has_members_to_migrate && !p.excluded)
        {
            Outcome::MembersToMigrate
        } else {
            Outcome::Compliant
        };
        Self { pools, outcome }
    }

    pub fn lines(&self) -> Vec<String> {
        self.pools.iter().filter_map(PoolReport::line).collect()
    }
}

/// Audits pools one after another; the first error aborts the run.
pub struct Orchestrator {
    cluster: Arc<dyn ClusterClient>,
    auditor: PlacementAuditor,
    options: RunOptions,
}

impl Orchestrator {
    pub fn new(
        cluster: Arc<dyn ClusterClient>,
        catalog: Arc<dyn ZoneCatalog + Send + Sync>,
        options: RunOptions,
    ) -> Self {
        let aggregator = MembershipAggregator::new(Arc::clone(&cluster), Arc::clone(&catalog));
        Self {
            cluster,
            auditor: PlacementAuditor::new(aggregator, catalog),
            options,
        }
    }

    pub async fn run(&self) -> AuditResult<RunReport> {
        let pools = self.select_pools().await?;
        debug!(count = pools.len(), "auditing pools");

        let mut reports = Vec::with_capacity(pools.len());
        for pool in pools {
            let audit = self.auditor.audit(&pool).await?;
            let excluded = self.options.exclude_pools.contains(&pool);
            reports.push(PoolReport { audit, excluded });
        }

        let report = RunReport::new(reports);
        info!(pools = report.pools.len(), outcome = ?report.outcome, "audit run finished");
        Ok(report)
    }

    /// Names of the pools to audit, in cluster order unless restricted.
    async fn select_pools(&self) -> AuditResult<Vec<String>> {
        let listed: Vec<String> = self
            .cluster
            .list_pools()
            .await?
            .into_iter()
            .map(|pool| pool.name)
            .collect();

        if self.options.pools.is_empty() {
            return Ok(listed);
        }

        let mut selected = Vec::with_capacity(self.options.pools.len());
        for name in &self.options.pools {
            validate_pool_name(name)?;
            if !listed.contains(name) {
                return Err(AuditError::Validation(format!(
                    "pool '{name}' does not exist in the cluster"
                )));
            }
            if !selected.contains(name) {
                selected.push(name.clone());
            }
        }
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCluster, reference_cluster, three_zone_catalog};
    use distributor_core::MemberStatus::{Running, Stopped};

    fn orchestrator(cluster: FakeCluster, options: RunOptions) -> Orchestrator {
        Orchestrator::new(Arc::new(cluster), three_zone_catalog(), options)
    }

    fn excluding(pools: &[&str]) -> RunOptions {
        RunOptions {
            exclude_pools: pools.iter().map(|p| p.to_string()).collect(),
            ..RunOptions::default()
        }
    }

    #[tokio::test]
    async fn crowded_pool_fails_the_run() {
        let report = orchestrator(reference_cluster(), RunOptions::default())
            .run()
            .await
            .unwrap();

        assert_eq!(report.lines(), ["Pool 'important' has members to migrate"]);
        assert_eq!(report.outcome, Outcome::MembersToMigrate);

        let pools: Vec<_> = report.pools.iter().map(|p| p.audit.pool.as_str()).collect();
        assert_eq!(pools, ["important", "critical"]);
    }

    #[tokio::test]
    async fn compliant_pool_prints_nothing() {
        let cluster = FakeCluster::default().with_pool(
            "critical",
            &[
                (102, "proxmox02", Running),
                (103, "proxmox02", Stopped),
            ],
        );
        let report = orchestrator(cluster, RunOptions::default()).run().await.unwrap();

        assert!(report.lines().is_empty());
        assert_eq!(report.outcome, Outcome::Compliant);
    }

    #[tokio::test]
    async fn excluded_pool_is_still_evaluated() {
        let report = orchestrator(reference_cluster(), excluding(&["important"]))
            .run()
            .await
            .unwrap();

        assert_eq!(
            report.lines(),
            ["Pool 'important' has members to migrate, but is excluded"]
        );
        assert_eq!(report.outcome, Outcome::Compliant);

        let important = &report.pools[0];
        assert!(important.excluded);
        assert!(important.audit.has_members_to_migrate);
    }

    #[tokio::test]
    async fn excluding_unknown_pool_is_harmless() {
        let report = orchestrator(reference_cluster(), excluding(&["templates"]))
            .run()
            .await
            .unwrap();
        assert_eq!(report.outcome, Outcome::MembersToMigrate);
    }

    #[tokio::test]
    async fn explicit_pools_restrict_the_run() {
        let options = RunOptions {
            pools: vec!["critical".to_string(), "critical".to_string()],
            ..RunOptions::default()
        };
        let report = orchestrator(reference_cluster(), options).run().await.unwrap();

        assert_eq!(report.pools.len(), 1);
        assert_eq!(report.pools[0].audit.pool, "critical");
        assert_eq!(report.outcome, Outcome::Compliant);
    }

    #[tokio::test]
    async fn explicit_unknown_pool_is_validation_error() {
        let options = RunOptions {
            pools: vec!["nonexistent".to_string()],
            ..RunOptions::default()
        };
        let err = orchestrator(reference_cluster(), options).run().await.unwrap_err();
        assert!(matches!(err, AuditError::Validation(_)));
    }

    #[tokio::test]
    async fn nested_pool_is_audited() {
        let cluster = reference_cluster()
            .with_pool("prod/web", &[(700, "proxmox03", Running), (701, "proxmox03", Running)]);
        let options = RunOptions {
            pools: vec!["prod/web".to_string()],
            ..RunOptions::default()
        };
        let report = orchestrator(cluster, options).run().await.unwrap();

        assert_eq!(report.lines(), ["Pool 'prod/web' has members to migrate"]);
        assert_eq!(report.outcome, Outcome::MembersToMigrate);
    }

    #[tokio::test]
    async fn explicit_malformed_pool_is_validation_error() {
        let options = RunOptions {
            pools: vec!["../etc".to_string()],
            ..RunOptions::default()
        };
        let err = orchestrator(reference_cluster(), options).run().await.unwrap_err();
        assert!(matches!(err, AuditError::Validation(_)));
    }

    #[tokio::test]
    async fn drift_aborts_the_run() {
        let cluster = reference_cluster()
            .with_pool("edge", &[(600, "proxmox09", Running)]);
        let err = orchestrator(cluster, RunOptions::default()).run().await.unwrap_err();
        assert!(matches!(err, AuditError::CatalogDrift { .. }));
    }

    #[tokio::test]
    async fn cluster_failure_aborts_the_run() {
        let cluster = reference_cluster().unreachable("critical");
        let err = orchestrator(cluster, RunOptions::default()).run().await.unwrap_err();
        assert!(matches!(err, AuditError::ExternalService(_)));
    }

    #[tokio::test]
    async fn run_is_idempotent() {
        let orchestrator = orchestrator(reference_cluster(), excluding(&["critical"]));
        let first = orchestrator.run().await.unwrap();
        let second = orchestrator.run().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn report_serializes_flat_pool_entries() {
        let report = orchestrator(reference_cluster(), RunOptions::default())
            .run()
            .await
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["outcome"], "members_to_migrate");
        assert_eq!(json["pools"][0]["pool"], "important");
        assert_eq!(json["pools"][0]["running_members"], 2);
        assert_eq!(json["pools"][0]["used_zones"][0]["name"], "BIT-1");
        assert_eq!(json["pools"][0]["excluded"], false);
    }
}
