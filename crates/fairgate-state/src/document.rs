//! Versioned on-disk layout of the unit state map.
//!
//! ```json
//! { "schema_version": 1, "units": { "<unit_id>": { "state": "ACTIVE", ... } } }
//! ```
//!
//! Files written before the version tag existed hold the bare
//! `{ "<unit_id>": {...} }` map; those are read as version 0 and upgraded
//! on the next save.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use fairgate_core::UnitMap;

use crate::error::{StateError, StateResult};

/// Current persisted schema version.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDocument {
    pub schema_version: u32,
    pub units: UnitMap,
}

impl StateDocument {
    pub fn new(units: UnitMap) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            units,
        }
    }
}

/// Check a stored schema version against what this build understands.
pub fn check_version(found: u32) -> StateResult<()> {
    if found > SCHEMA_VERSION {
        return Err(StateError::UnsupportedSchema {
            found,
            supported: SCHEMA_VERSION,
        });
    }
    Ok(())
}

/// Make every record's `unit_id` agree with its map key.
pub fn normalize_ids(units: &mut UnitMap) {
    for (key, state) in units.iter_mut() {
        if state.unit_id != *key {
            state.unit_id = key.clone();
        }
    }
}

/// Decode a state file, accepting both the versioned and legacy layouts.
pub fn decode(bytes: &[u8]) -> StateResult<UnitMap> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| StateError::Deserialize(e.to_string()))?;

    // A legacy map may hold a unit literally named `schema_version`; only a
    // numeric tag next to a `units` object marks the versioned layout.
    let tagged = value
        .get("schema_version")
        .filter(|v| v.is_number() && value.get("units").is_some_and(Value::is_object));

    let mut units = match tagged {
        Some(version) => {
            let found = version
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| StateError::Deserialize("invalid schema_version".to_string()))?;
            check_version(found)?;
            let doc: StateDocument = serde_json::from_value(value)
                .map_err(|e| StateError::Deserialize(e.to_string()))?;
            doc.units
        }
        None => {
            debug!("reading unversioned state map");
            serde_json::from_value::<UnitMap>(value)
                .map_err(|e| StateError::Deserialize(e.to_string()))?
        }
    };

    normalize_ids(&mut units);
    Ok(units)
}

pub fn encode(units: &UnitMap) -> StateResult<Vec<u8>> {
    serde_json::to_vec_pretty(&StateDocument::new(units.clone()))
        .map_err(|e| StateError::Serialize(e.to_string()))
}
