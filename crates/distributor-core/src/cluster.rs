//! Read interface to the cluster manager.
//!
//! The audit pipeline only needs two calls: enumerate pools, and list the
//! members of one pool. Implementations own transport, authentication and
//! wire decoding; callers see [`Pool`]s and [`Member`]s.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::types::{Member, Pool};

/// Result type alias for cluster client operations.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Boxed future alias for cluster client calls.
pub type ClusterFuture<'a, T> = Pin<Box<dyn Future<Output = ClusterResult<T>> + Send + 'a>>;

/// Errors raised while reading from the cluster manager.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("pool not found: {0}")]
    PoolNotFound(String),

    #[error("invalid pool name: {0:?}")]
    InvalidPoolName(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("unrecognized member status: {0:?}")]
    UnrecognizedStatus(String),

    #[error("unrecognized member type: {0:?}")]
    UnrecognizedMemberType(String),

    #[error("client configuration error: {0}")]
    Config(String),
}

/// Read access to pools and their members.
pub trait ClusterClient: Send + Sync {
    /// All pools, in the order the cluster manager reports them.
    fn list_pools(&self) -> ClusterFuture<'_, Vec<Pool>>;

    /// Members of one pool, in the order the cluster manager reports them.
    ///
    /// Fails with [`ClusterError::PoolNotFound`] if the pool does not exist.
    fn get_pool_members<'a>(&'a self, pool_name: &'a str) -> ClusterFuture<'a, Vec<Member>>;
}

/// Maximum depth of nested pools (`parent/child/grandchild`).
pub const MAX_POOL_DEPTH: usize = 3;

/// Check that a pool name is a well-formed Proxmox pool id.
///
/// Ids are up to [`MAX_POOL_DEPTH`] `/`-separated segments of ASCII letters,
/// digits, `-`, `_` and `.`. Empty and dot-only segments are rejected.
pub fn validate_pool_name(name: &str) -> ClusterResult<()> {
    let segments: Vec<&str> = name.split('/').collect();
    let valid = segments.len() <= MAX_POOL_DEPTH
        && segments.iter().all(|segment| {
            !segment.is_empty()
                && !segment.chars().all(|c| c == '.')
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        });
    if valid {
        Ok(())
    } else {
        Err(ClusterError::InvalidPoolName(name.to_string()))
    }
}
