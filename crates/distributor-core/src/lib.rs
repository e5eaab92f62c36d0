pub mod cluster;
pub mod config;
pub mod types;

pub use cluster::{ClusterClient, ClusterError, ClusterFuture, ClusterResult, validate_pool_name};
pub use config::{Credentials, ProxmoxSettings, Scheme, Settings};
pub use types::*;
