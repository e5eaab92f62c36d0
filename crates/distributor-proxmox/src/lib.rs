//! Proxmox VE implementation of [`distributor_core::ClusterClient`].

mod client;
mod tls;
mod wire;

pub use client::ProxmoxClient;
