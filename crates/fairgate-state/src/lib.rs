//! fairgate-state — unit state and event log persistence for fairgate.
//!
//! The engine talks to persistence only through [`UnitStore`]. Two
//! backends are provided:
//!
//! - [`JsonFileStore`]: a versioned JSON state document plus a JSON array
//!   event log, the interchange format read by downstream reporting.
//! - [`RedbStore`]: an embedded [redb](https://docs.rs/redb) database, with
//!   an in-memory mode for tests.
//!
//! Unit state is always saved whole (overwrite); events are only ever
//! appended, except for [`UnitStore::reset_events`], which the engine uses
//! to restart an unreadable log.

pub mod document;
pub mod error;
pub mod json_store;
pub mod redb_store;
pub mod tables;

use fairgate_core::{Event, UnitMap};

pub use document::{SCHEMA_VERSION, StateDocument};
pub use error::{StateError, StateResult};
pub use json_store::JsonFileStore;
pub use redb_store::RedbStore;

/// Persistence boundary for the engine. One writer at a time.
pub trait UnitStore {
    /// Load every persisted unit. An absent store yields an empty map.
    fn load_units(&self) -> StateResult<UnitMap>;

    /// Replace the persisted unit map with `units`.
    fn save_units(&self, units: &UnitMap) -> StateResult<()>;

    /// Read the full event log, oldest first.
    fn load_events(&self) -> StateResult<Vec<Event>>;

    /// Append `events` after the existing log entries.
    fn append_events(&self, events: &[Event]) -> StateResult<()>;

    /// Discard the event log.
    fn reset_events(&self) -> StateResult<()>;

    /// Persist the outcome of one engine run: the new events (after an
    /// optional log reset) and the full unit map.
    ///
    /// Events are written before units. If the event write fails the old
    /// unit map stays in place, so replaying the same batch re-derives the
    /// lost transitions.
    fn persist_run(&self, units: &UnitMap, events: &[Event], reset_log: bool) -> StateResult<()> {
        if reset_log {
            self.reset_events()?;
        }
        self.append_events(events)?;
        self.save_units(units)
    }
}

impl<T: UnitStore + ?Sized> UnitStore for &T {
    fn load_units(&self) -> StateResult<UnitMap> {
        (**self).load_units()
    }

    fn save_units(&self, units: &UnitMap) -> StateResult<()> {
        (**self).save_units(units)
    }

    fn load_events(&self) -> StateResult<Vec<Event>> {
        (**self).load_events()
    }

    fn append_events(&self, events: &[Event]) -> StateResult<()> {
        (**self).append_events(events)
    }

    fn reset_events(&self) -> StateResult<()> {
        (**self).reset_events()
    }

    fn persist_run(&self, units: &UnitMap, events: &[Event], reset_log: bool) -> StateResult<()> {
        (**self).persist_run(units, events, reset_log)
    }
}

impl<T: UnitStore + ?Sized> UnitStore for Box<T> {
    fn load_units(&self) -> StateResult<UnitMap> {
        (**self).load_units()
    }

    fn save_units(&self, units: &UnitMap) -> StateResult<()> {
        (**self).save_units(units)
    }

    fn load_events(&self) -> StateResult<Vec<Event>> {
        (**self).load_events()
    }

    fn append_events(&self, events: &[Event]) -> StateResult<()> {
        (**self).append_events(events)
    }

    fn reset_events(&self) -> StateResult<()> {
        (**self).reset_events()
    }

    fn persist_run(&self, units: &UnitMap, events: &[Event], reset_log: bool) -> StateResult<()> {
        (**self).persist_run(units, events, reset_log)
    }
}
