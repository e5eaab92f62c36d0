//! Generic per-entity repository over a redb table.
//!
//! Each catalog entity kind implements [`Entity`] and gets its own
//! [`Repository`]. The repository owns the storage mechanics (id
//! allocation, name uniqueness, JSON encoding); the entity supplies its
//! table, its filter type and its referential checks.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{CatalogError, CatalogResult};
use crate::tables::SEQUENCES;

/// A catalog record stored in its own table.
pub trait Entity: Serialize + DeserializeOwned + Clone {
    /// Human-readable kind, used in errors and as the id sequence key.
    const KIND: &'static str;

    const TABLE: TableDefinition<'static, u64, &'static [u8]>;

    /// Input accepted by [`Repository::create`].
    type Create;

    /// Narrow filter accepted by [`Repository::get_multiple`].
    /// The default value matches everything.
    type Filter: Default;

    fn id(&self) -> u64;

    fn name(&self) -> &str;

    /// Materialize a new record from its create input.
    fn build(id: u64, input: Self::Create, now: u64) -> Self;

    fn matches(&self, filter: &Self::Filter) -> bool;

    /// Runs inside the create transaction before the record is written.
    fn check_insert(&self, _txn: &WriteTransaction) -> CatalogResult<()> {
        Ok(())
    }

    /// Runs inside the delete transaction before the record is removed.
    fn check_delete(&self, _txn: &WriteTransaction) -> CatalogResult<()> {
        Ok(())
    }
}

/// Typed CRUD access to one entity table.
pub struct Repository<E> {
    db: Arc<Database>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    pub(crate) fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }

    /// Get a record by id.
    pub fn get(&self, id: u64) -> CatalogResult<E> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(E::TABLE).map_err(map_err!(Table))?;
        match table.get(id).map_err(map_err!(Read))? {
            Some(guard) => decode(guard.value()),
            None => Err(CatalogError::not_found(E::KIND, id)),
        }
    }

    /// Get a record by its unique name.
    pub fn get_by_name(&self, name: &str) -> CatalogResult<E> {
        self.find_by_name(name)?
            .ok_or_else(|| CatalogError::not_found(E::KIND, name))
    }

    /// Like [`Repository::get_by_name`], but absence is not an error.
    pub fn find_by_name(&self, name: &str) -> CatalogResult<Option<E>> {
        Ok(self.scan(|e| e.name() == name)?.into_iter().next())
    }

    /// All records matching `filter`, ordered by id.
    pub fn get_multiple(&self, filter: &E::Filter) -> CatalogResult<Vec<E>> {
        self.scan(|e| e.matches(filter))
    }

    /// Create a record. Fails if the name is already taken or the entity's
    /// insert check rejects it.
    pub fn create(&self, input: E::Create) -> CatalogResult<E> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let id = next_id(&txn, E::KIND)?;
        let entity = E::build(id, input, unix_now());

        {
            let table = txn.open_table(E::TABLE).map_err(map_err!(Table))?;
            let taken = scan_table::<E, _>(&table, |existing| existing.name() == entity.name())?;
            if !taken.is_empty() {
                return Err(CatalogError::AlreadyExists {
                    kind: E::KIND,
                    name: entity.name().to_string(),
                });
            }
        }

        entity.check_insert(&txn)?;

        let value = serde_json::to_vec(&entity).map_err(map_err!(Serialize))?;
        {
            let mut table = txn.open_table(E::TABLE).map_err(map_err!(Table))?;
            table
                .insert(id, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        info!(kind = E::KIND, id, name = entity.name(), "catalog record created");
        Ok(entity)
    }

    /// Delete a record by id, returning what was removed.
    pub fn delete(&self, id: u64) -> CatalogResult<E> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let entity = {
            let table = txn.open_table(E::TABLE).map_err(map_err!(Table))?;
            let found = table
                .get(id)
                .map_err(map_err!(Read))?
                .map(|guard| decode::<E>(guard.value()))
                .transpose()?;
            found.ok_or_else(|| CatalogError::not_found(E::KIND, id))?
        };

        entity.check_delete(&txn)?;

        {
            let mut table = txn.open_table(E::TABLE).map_err(map_err!(Table))?;
            table.remove(id).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        info!(kind = E::KIND, id, name = entity.name(), "catalog record deleted");
        Ok(entity)
    }

    fn scan(&self, keep: impl FnMut(&E) -> bool) -> CatalogResult<Vec<E>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(E::TABLE).map_err(map_err!(Table))?;
        let results = scan_table(&table, keep)?;
        debug!(kind = E::KIND, count = results.len(), "catalog scan");
        Ok(results)
    }
}

/// Decode every record in `table` and keep those accepted by `keep`.
pub(crate) fn scan_table<E, T>(table: &T, mut keep: impl FnMut(&E) -> bool) -> CatalogResult<Vec<E>>
where
    E: DeserializeOwned,
    T: ReadableTable<u64, &'static [u8]>,
{
    let mut results = Vec::new();
    for entry in table.iter().map_err(map_err!(Read))? {
        let (_, value) = entry.map_err(map_err!(Read))?;
        let entity: E = decode(value.value())?;
        if keep(&entity) {
            results.push(entity);
        }
    }
    Ok(results)
}

pub(crate) fn decode<E: DeserializeOwned>(bytes: &[u8]) -> CatalogResult<E> {
    serde_json::from_slice(bytes).map_err(map_err!(Deserialize))
}

/// Bump and return the id sequence for `kind`.
fn next_id(txn: &WriteTransaction, kind: &str) -> CatalogResult<u64> {
    let mut table = txn.open_table(SEQUENCES).map_err(map_err!(Table))?;
    let last = table
        .get(kind)
        .map_err(map_err!(Read))?
        .map(|guard| guard.value())
        .unwrap_or(0);
    let next = last + 1;
    table.insert(kind, next).map_err(map_err!(Write))?;
    Ok(next)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
