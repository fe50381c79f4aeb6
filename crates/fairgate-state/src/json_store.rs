//! JsonFileStore — plain JSON files for unit state and the event log.
//!
//! Two files: the versioned state document (overwritten on every save)
//! and the event log (a JSON array that only ever grows). Writes go to a
//! sibling temp file first and are renamed into place.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use fairgate_core::{Event, UnitMap};

use crate::document;
use crate::error::{StateError, StateResult};
use crate::UnitStore;

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    state_path: PathBuf,
    events_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(state_path: impl Into<PathBuf>, events_path: impl Into<PathBuf>) -> Self {
        Self {
            state_path: state_path.into(),
            events_path: events_path.into(),
        }
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    pub fn events_path(&self) -> &Path {
        &self.events_path
    }
}

/// Read a file, mapping "not found" to `None`.
fn read_optional(path: &Path) -> StateResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StateError::Read(format!("{}: {e}", path.display()))),
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> StateResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| StateError::Write(format!("{}: {e}", parent.display())))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes).map_err(|e| StateError::Write(format!("{}: {e}", tmp.display())))?;
    fs::rename(&tmp, path).map_err(|e| StateError::Write(format!("{}: {e}", path.display())))?;
    Ok(())
}

impl UnitStore for JsonFileStore {
    fn load_units(&self) -> StateResult<UnitMap> {
        match read_optional(&self.state_path)? {
            Some(bytes) => {
                let units = document::decode(&bytes)?;
                debug!(path = ?self.state_path, units = units.len(), "unit state loaded");
                Ok(units)
            }
            None => {
                debug!(path = ?self.state_path, "no unit state yet");
                Ok(UnitMap::new())
            }
        }
    }

    fn save_units(&self, units: &UnitMap) -> StateResult<()> {
        let bytes = document::encode(units)?;
        write_atomic(&self.state_path, &bytes)?;
        debug!(path = ?self.state_path, units = units.len(), "unit state saved");
        Ok(())
    }

    fn load_events(&self) -> StateResult<Vec<Event>> {
        match read_optional(&self.events_path)? {
            Some(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| StateError::Deserialize(e.to_string()))
            }
            None => Ok(Vec::new()),
        }
    }

    fn append_events(&self, events: &[Event]) -> StateResult<()> {
        let mut log = self.load_events()?;
        log.extend_from_slice(events);
        let bytes =
            serde_json::to_vec_pretty(&log).map_err(|e| StateError::Serialize(e.to_string()))?;
        write_atomic(&self.events_path, &bytes)?;
        debug!(path = ?self.events_path, appended = events.len(), total = log.len(), "event log written");
        Ok(())
    }

    fn reset_events(&self) -> StateResult<()> {
        write_atomic(&self.events_path, b"[]")?;
        debug!(path = ?self.events_path, "event log reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairgate_core::{EventKind, EventReason, FlagState, UnitState};

    fn store(dir: &Path) -> JsonFileStore {
        JsonFileStore::new(dir.join("state/units.json"), dir.join("state/events.json"))
    }

    fn unit(id: &str, state: FlagState) -> UnitState {
        UnitState {
            unit_id: id.to_string(),
            state,
            consecutive: 0,
            cooldown_left: 0,
            last_ratio: 0.5,
            last_timestamp: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    fn event(id: &str, kind: EventKind) -> Event {
        Event {
            unit_id: id.to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            ratio: 0.4,
            kind,
            reason: Some(EventReason::Severe),
        }
    }

    #[test]
    fn missing_files_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        assert!(store.load_units().unwrap().is_empty());
        assert!(store.load_events().unwrap().is_empty());
    }

    #[test]
    fn units_survive_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let mut units = UnitMap::new();
        units.insert("a".to_string(), unit("a", FlagState::Active));
        units.insert("b".to_string(), unit("b", FlagState::None));
        store.save_units(&units).unwrap();

        let reopened = JsonFileStore::new(store.state_path(), store.events_path());
        assert_eq!(reopened.load_units().unwrap(), units);
    }

    #[test]
    fn save_overwrites_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let mut units = UnitMap::new();
        units.insert("a".to_string(), unit("a", FlagState::Active));
        store.save_units(&units).unwrap();

        units.insert("a".to_string(), unit("a", FlagState::Cleared));
        store.save_units(&units).unwrap();
        assert_eq!(store.load_units().unwrap()["a"].state, FlagState::Cleared);
    }

    #[test]
    fn events_append_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        store.append_events(&[event("a", EventKind::Enter)]).unwrap();
        store
            .append_events(&[event("a", EventKind::Exit), event("b", EventKind::Enter)])
            .unwrap();

        let log = store.load_events().unwrap();
        let kinds: Vec<_> = log.iter().map(|e| (e.unit_id.as_str(), e.kind)).collect();
        assert_eq!(
            kinds,
            vec![("a", EventKind::Enter), ("a", EventKind::Exit), ("b", EventKind::Enter)]
        );
    }

    #[test]
    fn corrupt_files_are_reported_as_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        fs::create_dir_all(dir.path().join("state")).unwrap();
        fs::write(store.state_path(), "{{{").unwrap();
        fs::write(store.events_path(), "nope").unwrap();

        assert!(store.load_units().unwrap_err().is_corruption());
        assert!(store.load_events().unwrap_err().is_corruption());

        store.reset_events().unwrap();
        assert!(store.load_events().unwrap().is_empty());
    }

    #[test]
    fn no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store.save_units(&UnitMap::new()).unwrap();
        assert!(!dir.path().join("state/units.json.tmp").exists());
        assert!(store.state_path().exists());
    }
}
