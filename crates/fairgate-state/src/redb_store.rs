//! RedbStore — redb-backed unit state and event log.
//!
//! Unit records and events are JSON-serialized into redb's `&[u8]` value
//! columns. Events are keyed by a sequence number so iteration order is
//! append order. The store supports both on-disk and in-memory backends
//! (the latter for testing).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use redb::{
    Database, DatabaseError, ReadableDatabase, ReadableTable, StorageError, WriteTransaction,
};
use tracing::{debug, warn};

use fairgate_core::{Event, UnitMap, UnitState};

use crate::document::{self, SCHEMA_VERSION};
use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::UnitStore;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

/// Whether a failed open means the file itself is not a usable database,
/// as opposed to it being locked or the filesystem refusing access.
fn is_unreadable(e: &DatabaseError) -> bool {
    match e {
        DatabaseError::Storage(StorageError::Corrupted(_)) => true,
        DatabaseError::Storage(StorageError::Io(io)) => {
            matches!(io.kind(), ErrorKind::InvalidData | ErrorKind::UnexpectedEof)
        }
        DatabaseError::UpgradeRequired(_) => true,
        _ => false,
    }
}

/// Rename an unreadable database to the first free `<path>.corrupt-<n>`.
fn quarantine(path: &Path) -> StateResult<PathBuf> {
    let mut n = 0u32;
    let aside = loop {
        let mut candidate = path.as_os_str().to_owned();
        candidate.push(format!(".corrupt-{n}"));
        let candidate = PathBuf::from(candidate);
        if !candidate.exists() {
            break candidate;
        }
        n += 1;
    };
    std::fs::rename(path, &aside)
        .map_err(|e| StateError::Open(format!("{}: {e}", path.display())))?;
    Ok(aside)
}

fn write_units(txn: &WriteTransaction, units: &UnitMap) -> StateResult<()> {
    // Overwrite: drop every previous row in the same transaction.
    txn.delete_table(UNITS).map_err(map_err!(Table))?;
    let mut table = txn.open_table(UNITS).map_err(map_err!(Table))?;
    for (unit_id, state) in units {
        let value = serde_json::to_vec(state).map_err(map_err!(Serialize))?;
        table
            .insert(unit_id.as_str(), value.as_slice())
            .map_err(map_err!(Write))?;
    }
    let mut meta = txn.open_table(META).map_err(map_err!(Table))?;
    meta.insert(SCHEMA_VERSION_KEY, u64::from(SCHEMA_VERSION))
        .map_err(map_err!(Write))?;
    Ok(())
}

fn write_events(txn: &WriteTransaction, events: &[Event]) -> StateResult<()> {
    let mut table = txn.open_table(EVENTS).map_err(map_err!(Table))?;
    let mut seq = match table.last().map_err(map_err!(Read))? {
        Some((key, _)) => key.value() + 1,
        None => 0,
    };
    for event in events {
        let value = serde_json::to_vec(event).map_err(map_err!(Serialize))?;
        table
            .insert(seq, value.as_slice())
            .map_err(map_err!(Write))?;
        seq += 1;
    }
    Ok(())
}

fn clear_events(txn: &WriteTransaction) -> StateResult<()> {
    txn.delete_table(EVENTS).map_err(map_err!(Table))?;
    txn.open_table(EVENTS).map_err(map_err!(Table))?;
    Ok(())
}

impl RedbStore {
    /// Open (or create) a persistent store at the given path.
    ///
    /// A file redb cannot read as a database is moved aside to
    /// `<path>.corrupt-<n>` and a fresh, empty database is created in its
    /// place.
    pub fn open(path: &Path) -> StateResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(map_err!(Open))?;
        }
        let db = match Database::create(path) {
            Ok(db) => db,
            Err(e) if is_unreadable(&e) => {
                let aside = quarantine(path)?;
                warn!(
                    ?path,
                    moved_to = ?aside,
                    error = %e,
                    "state database unreadable, restarting from empty state"
                );
                Database::create(path).map_err(map_err!(Open))?
            }
            Err(e) => return Err(StateError::Open(e.to_string())),
        };
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "redb state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(UNITS).map_err(map_err!(Table))?;
        txn.open_table(EVENTS).map_err(map_err!(Table))?;
        txn.open_table(META).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Schema version recorded by the last save, if any.
    pub fn schema_version(&self) -> StateResult<Option<u32>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(META).map_err(map_err!(Table))?;
        let version = table
            .get(SCHEMA_VERSION_KEY)
            .map_err(map_err!(Read))?
            .map(|guard| guard.value());
        match version {
            Some(v) => u32::try_from(v)
                .map(Some)
                .map_err(|_| StateError::Deserialize(format!("invalid schema_version {v}"))),
            None => Ok(None),
        }
    }

    /// Get a single unit's state.
    pub fn get_unit(&self, unit_id: &str) -> StateResult<Option<UnitState>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(UNITS).map_err(map_err!(Table))?;
        match table.get(unit_id).map_err(map_err!(Read))? {
            Some(guard) => {
                let mut state: UnitState =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                state.unit_id = unit_id.to_string();
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }
}

impl UnitStore for RedbStore {
    fn load_units(&self) -> StateResult<UnitMap> {
        if let Some(found) = self.schema_version()? {
            document::check_version(found)?;
        }
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(UNITS).map_err(map_err!(Table))?;
        let mut units = UnitMap::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            let state: UnitState =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            units.insert(key.value().to_string(), state);
        }
        document::normalize_ids(&mut units);
        debug!(units = units.len(), "unit state loaded");
        Ok(units)
    }

    fn save_units(&self, units: &UnitMap) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        write_units(&txn, units)?;
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(units = units.len(), "unit state saved");
        Ok(())
    }

    fn load_events(&self) -> StateResult<Vec<Event>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(EVENTS).map_err(map_err!(Table))?;
        let mut events = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let event: Event =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            events.push(event);
        }
        Ok(events)
    }

    fn append_events(&self, events: &[Event]) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        write_events(&txn, events)?;
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(appended = events.len(), "events appended");
        Ok(())
    }

    fn reset_events(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        clear_events(&txn)?;
        txn.commit().map_err(map_err!(Transaction))?;
        debug!("event log reset");
        Ok(())
    }

    /// Units and events land in a single write transaction.
    fn persist_run(&self, units: &UnitMap, events: &[Event], reset_log: bool) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        if reset_log {
            clear_events(&txn)?;
        }
        write_events(&txn, events)?;
        write_units(&txn, units)?;
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(units = units.len(), appended = events.len(), "run persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairgate_core::{EventKind, EventReason, FlagState};

    fn test_unit(id: &str, state: FlagState) -> UnitState {
        UnitState {
            unit_id: id.to_string(),
            state,
            consecutive: if state == FlagState::Candidate { 2 } else { 0 },
            cooldown_left: 0,
            last_ratio: 0.58,
            last_timestamp: "2024-03-01T00:00:00Z".to_string(),
        }
    }

    fn test_event(id: &str, kind: EventKind) -> Event {
        Event {
            unit_id: id.to_string(),
            timestamp: "2024-03-01T00:00:00Z".to_string(),
            ratio: 0.45,
            kind,
            reason: match kind {
                EventKind::Exit => None,
                _ => Some(EventReason::Severe),
            },
        }
    }

    // ── Units ──────────────────────────────────────────────────────

    #[test]
    fn units_put_and_get() {
        let store = RedbStore::open_in_memory().unwrap();
        let mut units = UnitMap::new();
        units.insert("u-1".to_string(), test_unit("u-1", FlagState::Candidate));
        store.save_units(&units).unwrap();

        assert_eq!(store.get_unit("u-1").unwrap(), Some(units["u-1"].clone()));
        assert_eq!(store.get_unit("nope").unwrap(), None);
        assert_eq!(store.schema_version().unwrap(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn save_units_overwrites_whole_map() {
        let store = RedbStore::open_in_memory().unwrap();
        let mut units = UnitMap::new();
        units.insert("a".to_string(), test_unit("a", FlagState::Active));
        units.insert("b".to_string(), test_unit("b", FlagState::None));
        store.save_units(&units).unwrap();

        units.remove("b");
        store.save_units(&units).unwrap();

        let loaded = store.load_units().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key("a"));
    }

    // ── Events ─────────────────────────────────────────────────────

    #[test]
    fn events_append_preserves_order() {
        let store = RedbStore::open_in_memory().unwrap();
        store
            .append_events(&[test_event("a", EventKind::Enter)])
            .unwrap();
        store
            .append_events(&[
                test_event("a", EventKind::Exit),
                test_event("a", EventKind::Reenter),
            ])
            .unwrap();

        let kinds: Vec<_> = store
            .load_events()
            .unwrap()
            .into_iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![EventKind::Enter, EventKind::Exit, EventKind::Reenter]
        );
    }

    #[test]
    fn reset_events_empties_log() {
        let store = RedbStore::open_in_memory().unwrap();
        store
            .append_events(&[test_event("a", EventKind::Enter)])
            .unwrap();
        store.reset_events().unwrap();
        assert!(store.load_events().unwrap().is_empty());

        store
            .append_events(&[test_event("b", EventKind::Enter)])
            .unwrap();
        assert_eq!(store.load_events().unwrap().len(), 1);
    }

    // ── Persistence (on-disk) ──────────────────────────────────────

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested/fairgate.redb");

        {
            let store = RedbStore::open(&db_path).unwrap();
            let mut units = UnitMap::new();
            units.insert("a".to_string(), test_unit("a", FlagState::Cleared));
            store.save_units(&units).unwrap();
            store
                .append_events(&[test_event("a", EventKind::Exit)])
                .unwrap();
        }

        let store = RedbStore::open(&db_path).unwrap();
        assert_eq!(store.load_units().unwrap()["a"].state, FlagState::Cleared);
        assert_eq!(store.load_events().unwrap().len(), 1);
    }

    #[test]
    fn unreadable_file_is_moved_aside() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("fairgate.redb");
        std::fs::write(&db_path, vec![0xAB; 8192]).unwrap();

        let store = RedbStore::open(&db_path).unwrap();
        assert!(store.load_units().unwrap().is_empty());
        assert!(store.load_events().unwrap().is_empty());

        let aside = dir.path().join("fairgate.redb.corrupt-0");
        assert_eq!(std::fs::read(&aside).unwrap(), vec![0xAB; 8192]);
    }

    #[test]
    fn quarantine_picks_a_free_name() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("fairgate.redb");
        std::fs::write(dir.path().join("fairgate.redb.corrupt-0"), b"old").unwrap();
        std::fs::write(&db_path, b"new").unwrap();

        let aside = quarantine(&db_path).unwrap();
        assert_eq!(aside, dir.path().join("fairgate.redb.corrupt-1"));
        assert!(!db_path.exists());
    }

    // ── Whole-run persistence ──────────────────────────────────────

    #[test]
    fn persist_run_writes_units_and_events_together() {
        let store = RedbStore::open_in_memory().unwrap();
        store
            .append_events(&[test_event("old", EventKind::Enter)])
            .unwrap();

        let mut units = UnitMap::new();
        units.insert("a".to_string(), test_unit("a", FlagState::Active));
        store
            .persist_run(&units, &[test_event("a", EventKind::Enter)], true)
            .unwrap();

        assert_eq!(store.load_units().unwrap().len(), 1);
        let events = store.load_events().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].unit_id, "a");
    }

    // ── Edge cases ─────────────────────────────────────────────────

    #[test]
    fn stored_id_follows_table_key() {
        let store = RedbStore::open_in_memory().unwrap();
        let mut units = UnitMap::new();
        units.insert("a".to_string(), test_unit("stale", FlagState::Active));
        store.save_units(&units).unwrap();

        assert_eq!(store.get_unit("a").unwrap().unwrap().unit_id, "a");
        assert_eq!(store.load_units().unwrap()["a"].unit_id, "a");
    }

    #[test]
    fn empty_store_operations() {
        let store = RedbStore::open_in_memory().unwrap();
        assert!(store.load_units().unwrap().is_empty());
        assert!(store.load_events().unwrap().is_empty());
        assert_eq!(store.schema_version().unwrap(), None);
    }

    #[test]
    fn newer_schema_version_is_corruption() {
        let store = RedbStore::open_in_memory().unwrap();
        {
            let txn = store.db.begin_write().unwrap();
            {
                let mut meta = txn.open_table(META).unwrap();
                meta.insert(SCHEMA_VERSION_KEY, 99u64).unwrap();
            }
            txn.commit().unwrap();
        }
        assert!(store.load_units().unwrap_err().is_corruption());
    }

    #[test]
    fn undecodable_row_is_corruption() {
        let store = RedbStore::open_in_memory().unwrap();
        {
            let txn = store.db.begin_write().unwrap();
            {
                let mut table = txn.open_table(UNITS).unwrap();
                table.insert("bad", b"not json".as_slice()).unwrap();
            }
            txn.commit().unwrap();
        }
        assert!(store.load_units().unwrap_err().is_corruption());
    }
}
