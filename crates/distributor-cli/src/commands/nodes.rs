use std::fmt::Write;

use distributor_catalog::{Catalog, NodeFilter};

pub fn list(catalog: &Catalog) -> anyhow::Result<()> {
    print!("{}", format_nodes(catalog)?);
    Ok(())
}

pub fn create(catalog: &Catalog, name: &str, zone_name: &str) -> anyhow::Result<()> {
    catalog.create_node(name, zone_name)?;
    Ok(())
}

pub fn delete(catalog: &Catalog, name: &str) -> anyhow::Result<()> {
    catalog.delete_node_by_name(name)?;
    Ok(())
}

/// Each node with its zone, followed by a blank line.
fn format_nodes(catalog: &Catalog) -> anyhow::Result<String> {
    let mut out = String::new();
    for node in catalog.nodes().get_multiple(&NodeFilter::default())? {
        let zone = catalog.zones().get(node.zone_id)?;
        writeln!(out, "- {} (ID {})", node.name, node.id)?;
        writeln!(out, "\tZone: {} (ID {})", zone.name, zone.id)?;
        out.push('\n');
    }
    Ok(out)
}
