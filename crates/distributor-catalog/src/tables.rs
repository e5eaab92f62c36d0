//! redb table definitions for the zone catalog.
//!
//! Entity tables use `u64` keys (catalog id) and `&[u8]` values
//! (JSON-serialized entities).

use redb::TableDefinition;

/// Zones keyed by id.
pub const ZONES: TableDefinition<u64, &[u8]> = TableDefinition::new("zones");

/// Nodes keyed by id.
pub const NODES: TableDefinition<u64, &[u8]> = TableDefinition::new("nodes");

/// Last id handed out, keyed by entity kind.
pub const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");
