//! Proxmox VE API response shapes and their conversion into core types.
//!
//! Every API response is wrapped in a `{"data": ...}` envelope. Only the
//! fields the distributor reads are modelled; the rest are ignored.

use serde::Deserialize;
use tracing::debug;

use distributor_core::{ClusterError, ClusterResult, Member, MemberKind, MemberStatus, Pool};

/// Pool entries of this type are storages, not guests.
const STORAGE_MEMBER_TYPE: &str = "storage";

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

/// `POST /access/ticket`
#[derive(Debug, Deserialize)]
pub(crate) struct TicketData {
    pub ticket: String,
    pub username: String,
    #[serde(rename = "CSRFPreventionToken")]
    pub csrf_token: Option<String>,
}

/// One entry of `GET /pools`.
#[derive(Debug, Deserialize)]
pub(crate) struct PoolEntry {
    pub poolid: String,
    pub comment: Option<String>,
}

impl From<PoolEntry> for Pool {
    fn from(entry: PoolEntry) -> Self {
        Pool {
            name: entry.poolid,
            comment: entry.comment,
        }
    }
}

/// One entry of `GET /pools?poolid=...`, which carries the pool's members.
#[derive(Debug, Deserialize)]
pub(crate) struct PoolDetail {
    pub poolid: Option<String>,
    #[serde(default)]
    pub members: Vec<MemberEntry>,
}

/// One entry of a pool's `members` array.
#[derive(Debug, Deserialize)]
pub(crate) struct MemberEntry {
    /// `qemu/100`, `lxc/101`, `storage/pve01/local`.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub node: String,
    pub status: Option<String>,
    pub vmid: Option<u32>,
    pub name: Option<String>,
}

/// Convert a pool's member entries into guests, in API order.
///
/// Storage entries are dropped. Guests with a missing or unrecognized
/// type, id or status fail the whole conversion.
pub(crate) fn decode_members(pool_name: &str, entries: Vec<MemberEntry>) -> ClusterResult<Vec<Member>> {
    let mut members = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.kind == STORAGE_MEMBER_TYPE {
            debug!(pool = pool_name, id = %entry.id, "skipping storage pool member");
            continue;
        }
        let kind: MemberKind = entry.kind.parse()?;
        let vm_id = entry
            .vmid
            .ok_or_else(|| ClusterError::Malformed(format!("member {} has no vmid", entry.id)))?;
        let status: MemberStatus = entry
            .status
            .as_deref()
            .ok_or_else(|| ClusterError::Malformed(format!("member {} has no status", entry.id)))?
            .parse()?;

        members.push(Member {
            name: entry.name.unwrap_or(entry.id),
            vm_id,
            kind,
            pool_name: pool_name.to_string(),
            node_name: entry.node,
            status,
        });
    }
    Ok(members)
}
