use std::sync::Arc;

use anyhow::Context;
use clap::ValueEnum;

use distributor_audit::{Orchestrator, Outcome, RunOptions, RunReport};
use distributor_core::Settings;
use distributor_proxmox::ProxmoxClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

pub async fn run(
    settings: &Settings,
    exclude_pools: Vec<String>,
    pools: Vec<String>,
    format: Format,
) -> anyhow::Result<Outcome> {
    let client = ProxmoxClient::new(settings.proxmox()?).context("configuring Proxmox client")?;
    let catalog = super::open_catalog(settings)?;

    let options = run_options(settings, exclude_pools, pools);
    let orchestrator = Orchestrator::new(Arc::new(client), Arc::new(catalog), options);
    let report = orchestrator.run().await?;

    print!("{}", render(&report, format)?);
    Ok(report.outcome)
}

/// Merge command-line exclusions with the configured ones.
fn run_options(settings: &Settings, exclude_pools: Vec<String>, pools: Vec<String>) -> RunOptions {
    RunOptions {
        exclude_pools: settings
            .exclude_pools
            .iter()
            .cloned()
            .chain(exclude_pools)
            .collect(),
        pools,
    }
}

fn render(report: &RunReport, format: Format) -> anyhow::Result<String> {
    Ok(match format {
        Format::Text => report.lines().iter().map(|line| format!("{line}\n")).collect(),
        Format::Json => format!("{}\n", serde_json::to_string_pretty(report)?),
    })
}
