//! redb table definitions for the fairgate state store.
//!
//! Unit and event values are JSON-serialized domain types.

use redb::TableDefinition;

/// Unit state keyed by `unit_id`.
pub const UNITS: TableDefinition<&str, &[u8]> = TableDefinition::new("units");

/// Event log keyed by a monotonically increasing sequence number.
pub const EVENTS: TableDefinition<u64, &[u8]> = TableDefinition::new("events");

/// Store metadata (`schema_version`).
pub const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

pub const SCHEMA_VERSION_KEY: &str = "schema_version";
