//! Engine driver — replays a snapshot batch against persisted unit state.
//!
//! One `run` performs all of its I/O at the edges: load the unit map and
//! check the event log up front, step every snapshot through
//! [`decide`](crate::decision::decide) in memory, then hand the new events
//! and the full map to the store once at the end.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use fairgate_core::{
    Event, FlagState, Parameters, RunSummary, SnapshotRecord, UnitMap, UnitState,
};
use fairgate_state::UnitStore;

use crate::decision::decide;
use crate::error::EngineResult;

/// Outcome of replaying a batch in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Replay {
    /// Events emitted by this batch, in emission order.
    pub events: Vec<Event>,
    pub summary: RunSummary,
}

/// Step every record of a batch through the decision function, updating
/// `units` in place. Malformed records are skipped and counted.
///
/// Records are applied in feed order; per-unit chronological order is the
/// caller's responsibility.
pub fn replay<I>(params: &Parameters, units: &mut UnitMap, records: I) -> Replay
where
    I: IntoIterator<Item = SnapshotRecord>,
{
    let mut events = Vec::new();
    let mut touched: HashSet<String> = HashSet::new();
    let mut summary = RunSummary::default();

    for record in records {
        let snapshot = match record {
            Ok(snapshot) => snapshot,
            Err(reason) => {
                warn!(%reason, "skipping malformed snapshot");
                summary.malformed_skipped += 1;
                continue;
            }
        };

        let previous = units
            .get(&snapshot.unit_id)
            .map(UnitState::status)
            .unwrap_or_default();
        let decision = decide(params, previous, snapshot.ratio);

        if let Some(transition) = decision.transition {
            let event = Event::from_transition(transition, &snapshot);
            info!(
                unit_id = %event.unit_id,
                kind = event.kind.label(),
                reason = ?event.reason,
                ratio = event.ratio,
                timestamp = %event.timestamp,
                "unit transition"
            );
            events.push(event);
        } else if decision.status.state == FlagState::Candidate {
            debug!(
                unit_id = %snapshot.unit_id,
                consecutive = decision.status.consecutive,
                required = params.consecutive_required_standard(),
                "borderline reading counted"
            );
        }

        let next = UnitState::observed(decision.status, &snapshot);
        touched.insert(snapshot.unit_id.clone());
        units.insert(snapshot.unit_id, next);
        summary.snapshots_processed += 1;
    }

    summary.units_touched = touched.len();
    summary.events_emitted = events.len();
    Replay { events, summary }
}

/// The hysteresis engine: validated parameters plus a store handle.
pub struct Engine<S> {
    params: Parameters,
    store: S,
}

impl<S: UnitStore> Engine<S> {
    pub fn new(params: Parameters, store: S) -> Self {
        Self { params, store }
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load persisted units, falling back to an empty map when the store
    /// cannot be read.
    fn load_units(&self) -> UnitMap {
        match self.store.load_units() {
            Ok(units) => units,
            Err(e) => {
                warn!(
                    error = %e,
                    corrupt = e.is_corruption(),
                    "unit state unreadable, restarting from empty state"
                );
                UnitMap::new()
            }
        }
    }

    /// Whether the existing event log can be appended to as-is.
    fn event_log_readable(&self) -> bool {
        match self.store.load_events() {
            Ok(events) => {
                debug!(existing = events.len(), "event log loaded");
                true
            }
            Err(e) => {
                warn!(
                    error = %e,
                    corrupt = e.is_corruption(),
                    "event log unreadable, restarting it empty"
                );
                false
            }
        }
    }

    /// Process one ordered batch and persist the result.
    ///
    /// Persists exactly two artifacts: the events emitted by this batch
    /// (append) and the full unit map (overwrite), in that order.
    pub fn run<I>(&self, records: I) -> EngineResult<RunSummary>
    where
        I: IntoIterator<Item = SnapshotRecord>,
    {
        let mut units = self.load_units();
        let log_readable = self.event_log_readable();

        let Replay { events, summary } = replay(&self.params, &mut units, records);

        self.store.persist_run(&units, &events, !log_readable)?;

        info!(
            snapshots = summary.snapshots_processed,
            units = summary.units_touched,
            events = summary.events_emitted,
            malformed = summary.malformed_skipped,
            "engine run complete"
        );
        Ok(summary)
    }
}
