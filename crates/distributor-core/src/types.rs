//! Cluster-side types shared across the distributor crates.
//!
//! Pools and members are owned by the cluster manager. The distributor only
//! ever reads them, so these are plain snapshots with no identity beyond
//! their names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cluster::ClusterError;

/// A resource pool as reported by the cluster manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    /// Pool identifier (Proxmox `poolid`).
    pub name: String,
    pub comment: Option<String>,
}

impl Pool {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comment: None,
        }
    }
}

/// One guest belonging to a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub vm_id: u32,
    pub kind: MemberKind,
    pub pool_name: String,
    /// Name of the hypervisor node currently hosting the guest.
    pub node_name: String,
    pub status: MemberStatus,
}

/// Guest flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Qemu,
    Lxc,
}

impl FromStr for MemberKind {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qemu" => Ok(MemberKind::Qemu),
            "lxc" => Ok(MemberKind::Lxc),
            other => Err(ClusterError::UnrecognizedMemberType(other.to_string())),
        }
    }
}

/// Run status of a guest.
///
/// This is a closed set: a status string the cluster manager reports that
/// is not listed here is rejected with [`ClusterError::UnrecognizedStatus`]
/// instead of being guessed into either bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Running,
    Stopped,
    /// Reported for guests on nodes the cluster cannot currently reach.
    Unknown,
}

impl MemberStatus {
    /// Whether a member in this state occupies a zone for placement purposes.
    pub fn counts_toward_placement(self) -> bool {
        matches!(self, MemberStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MemberStatus::Running => "running",
            MemberStatus::Stopped => "stopped",
            MemberStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberStatus {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(MemberStatus::Running),
            "stopped" => Ok(MemberStatus::Stopped),
            "unknown" => Ok(MemberStatus::Unknown),
            other => Err(ClusterError::UnrecognizedStatus(other.to_string())),
        }
    }
}
