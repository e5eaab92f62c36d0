//! Audit error types.

use distributor_catalog::CatalogError;
use distributor_core::ClusterError;
use thiserror::Error;

/// Errors that can occur while auditing pool placement.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("pool not found: {0}")]
    NotFound(String),

    /// A running member sits on a node the zone catalog does not know.
    #[error("pool '{pool}' has a running member on node '{node}', which is not in the zone catalog")]
    CatalogDrift { pool: String, node: String },

    #[error("cluster manager error: {0}")]
    ExternalService(ClusterError),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

impl From<ClusterError> for AuditError {
    fn from(err: ClusterError) -> Self {
        match err {
            ClusterError::PoolNotFound(pool) => AuditError::NotFound(pool),
            ClusterError::InvalidPoolName(name) => {
                AuditError::Validation(format!("invalid pool name {name:?}"))
            }
            other => AuditError::ExternalService(other),
        }
    }
}

pub type AuditResult<T> = Result<T, AuditError>;
