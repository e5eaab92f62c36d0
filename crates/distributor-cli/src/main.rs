//! vrd — audits Proxmox pools against the zone-redundancy placement policy.
//!
//! # Usage
//!
//! ```text
//! vrd run [--exclude-pool NAME]... [--pool NAME]... [--format text|json]
//! vrd zones list | create --name NAME | delete --name NAME
//! vrd nodes list | create --name NAME --zone-name ZONE | delete --name NAME
//! ```
//!
//! `run` exits 78 when a pool that is not excluded has members to migrate.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use distributor_audit::Outcome;
use distributor_core::Settings;

mod commands;

use commands::run::Format;

/// `EX_CONFIG` from sysexits.h.
const EXIT_MEMBERS_TO_MIGRATE: u8 = 78;

#[derive(Parser)]
#[command(
    name = "vrd",
    about = "Virtualisation resource distributor — zone placement audit for Proxmox pools",
    version,
    propagate_version = true
)]
struct Cli {
    /// Configuration file (default: /etc/virtualisation-resource-distributor/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Zone catalog database, overriding the configuration file.
    #[arg(long, global = true)]
    database_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit pools and report those with members to migrate
    Run {
        /// Report this pool without letting it fail the run (repeatable).
        #[arg(long = "exclude-pool", value_name = "NAME")]
        exclude_pools: Vec<String>,
        /// Audit only this pool (repeatable).
        #[arg(long = "pool", value_name = "NAME")]
        pools: Vec<String>,
        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Manage cluster nodes in the zone catalog
    Nodes {
        #[command(subcommand)]
        action: NodesAction,
    },
    /// Manage zones in the zone catalog
    Zones {
        #[command(subcommand)]
        action: ZonesAction,
    },
}

#[derive(Subcommand)]
enum NodesAction {
    /// List nodes and their zones
    List,
    /// Add a node to a zone
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        zone_name: String,
    },
    /// Remove a node
    Delete {
        #[arg(long)]
        name: String,
    },
}

#[derive(Subcommand)]
enum ZonesAction {
    /// List zones and their nodes
    List,
    /// Add a zone
    Create {
        #[arg(long)]
        name: String,
    },
    /// Remove a zone without nodes
    Delete {
        #[arg(long)]
        name: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries only command output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(path) = cli.database_path {
        settings.database_path = path;
    }
    debug!(database = %settings.database_path.display(), "settings loaded");

    match cli.command {
        Commands::Run {
            exclude_pools,
            pools,
            format,
        } => {
            let outcome = commands::run::run(&settings, exclude_pools, pools, format).await?;
            Ok(exit_code(outcome))
        }
        Commands::Nodes { action } => {
            let catalog = commands::open_catalog(&settings)?;
            match action {
                NodesAction::List => commands::nodes::list(&catalog)?,
                NodesAction::Create { name, zone_name } => {
                    commands::nodes::create(&catalog, &name, &zone_name)?
                }
                NodesAction::Delete { name } => commands::nodes::delete(&catalog, &name)?,
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Zones { action } => {
            let catalog = commands::open_catalog(&settings)?;
            match action {
                ZonesAction::List => commands::zones::list(&catalog)?,
                ZonesAction::Create { name } => commands::zones::create(&catalog, &name)?,
                ZonesAction::Delete { name } => commands::zones::delete(&catalog, &name)?,
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_code(outcome: Outcome) -> ExitCode {
    match outcome {
        Outcome::Compliant => ExitCode::SUCCESS,
        Outcome::MembersToMigrate => ExitCode::from(EXIT_MEMBERS_TO_MIGRATE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn outcome_maps_to_monitoring_exit_status() {
        assert_eq!(exit_code(Outcome::Compliant), ExitCode::SUCCESS);
        assert_eq!(exit_code(Outcome::MembersToMigrate), ExitCode::from(78));
        assert_ne!(exit_code(Outcome::MembersToMigrate), ExitCode::FAILURE);
    }

    #[test]
    fn run_collects_repeated_options() {
        let cli = Cli::try_parse_from([
            "vrd",
            "run",
            "--exclude-pool",
            "templates",
            "--exclude-pool",
            "important",
            "--pool",
            "critical",
            "--format",
            "json",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                exclude_pools,
                pools,
                format,
            } => {
                assert_eq!(exclude_pools, ["templates", "important"]);
                assert_eq!(pools, ["critical"]);
                assert_eq!(format, Format::Json);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn global_options_follow_subcommands() {
        let cli = Cli::try_parse_from([
            "vrd",
            "zones",
            "list",
            "--database-path",
            "/tmp/catalog.redb",
        ])
        .unwrap();
        assert_eq!(cli.database_path, Some(PathBuf::from("/tmp/catalog.redb")));
    }

    #[test]
    fn node_create_requires_zone_name() {
        let err = Cli::try_parse_from(["vrd", "nodes", "create", "--name", "proxmox01"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn unknown_format_is_a_usage_error() {
        assert!(Cli::try_parse_from(["vrd", "run", "--format", "yaml"]).is_err());
    }
}
