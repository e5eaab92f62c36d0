use std::fmt::Write;

use distributor_catalog::{Catalog, ZoneFilter};

pub fn list(catalog: &Catalog) -> anyhow::Result<()> {
    print!("{}", format_zones(catalog)?);
    Ok(())
}

pub fn create(catalog: &Catalog, name: &str) -> anyhow::Result<()> {
    catalog.create_zone(name)?;
    Ok(())
}

pub fn delete(catalog: &Catalog, name: &str) -> anyhow::Result<()> {
    catalog.delete_zone_by_name(name)?;
    Ok(())
}

/// Each zone with its nodes, followed by a blank line.
fn format_zones(catalog: &Catalog) -> anyhow::Result<String> {
    let mut out = String::new();
    for zone in catalog.zones().get_multiple(&ZoneFilter::default())? {
        writeln!(out, "- {} (ID {})", zone.name, zone.id)?;
        writeln!(out, "\tNodes:")?;
        for node in catalog.nodes_in_zone(zone.id)? {
            writeln!(out, "\t{} (ID {})", node.name, node.id)?;
        }
        out.push('\n');
    }
    Ok(out)
}
