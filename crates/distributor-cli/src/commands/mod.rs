pub mod nodes;
pub mod run;
pub mod zones;

use anyhow::Context;
use distributor_catalog::Catalog;
use distributor_core::Settings;

pub fn open_catalog(settings: &Settings) -> anyhow::Result<Catalog> {
    let path = &settings.database_path;
    Catalog::open(path).with_context(|| format!("opening zone catalog {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_created_under_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            database_path: dir.path().join("state/catalog.redb"),
            ..Settings::default()
        };

        {
            let catalog = open_catalog(&settings).unwrap();
            catalog.create_zone("BIT-1").unwrap();
        }
        let catalog = open_catalog(&settings).unwrap();
        assert_eq!(catalog.zones().get_by_name("BIT-1").unwrap().id, 1);
    }
}
