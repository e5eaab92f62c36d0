//! Distributor configuration file parser.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Location probed when no `--config` is given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/virtualisation-resource-distributor/config.toml";

/// Location of the zone catalog when the config does not name one.
pub const DEFAULT_DATABASE_PATH: &str = "/var/lib/virtualisation-resource-distributor/catalog.redb";

/// Default Proxmox API port.
pub const DEFAULT_PROXMOX_PORT: u16 = 8006;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Pools that are evaluated but never fail the run.
    #[serde(default)]
    pub exclude_pools: Vec<String>,
    pub proxmox: Option<ProxmoxSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxmoxSettings {
    /// `host` or `host:port`.
    pub host: String,
    #[serde(default)]
    pub scheme: Scheme,
    #[serde(default = "default_true")]
    pub verify_tls: bool,
    /// PEM bundle trusted when `verify_tls` is set.
    pub ca_certificate: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    pub credentials: Credentials,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Https,
    Http,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Credentials {
    /// Username/password, exchanged for a ticket on first use.
    Password { username: String, password: String },
    /// API token (`user@realm!tokenid`) and its secret.
    Token { token_id: String, secret: String },
}

fn default_database_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE_PATH)
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_path: default_database_path(),
            exclude_pools: Vec::new(),
            proxmox: None,
        }
    }
}

impl Settings {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let settings: Settings =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(settings)
    }

    /// Load `path` if given, otherwise the default location if it exists,
    /// otherwise built-in defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.is_file() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// The `[proxmox]` section, required for anything that talks to the cluster.
    pub fn proxmox(&self) -> anyhow::Result<&ProxmoxSettings> {
        self.proxmox
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("configuration has no [proxmox] section"))
    }
}
