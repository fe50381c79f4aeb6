//! Shared types used across fairgate crates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unique identifier of a monitored unit.
pub type UnitId = String;

/// All known units, ordered by id so persisted output is stable.
pub type UnitMap = BTreeMap<UnitId, UnitState>;

// ── Unit state ─────────────────────────────────────────────────────

/// Position of a unit in the flagging state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagState {
    /// Never flagged, or fully reset after a healthy reading.
    #[default]
    None,
    /// Borderline readings seen; waiting for debounce confirmation.
    Candidate,
    /// Flagged as under-served.
    Active,
    /// Recovered from `Active`; re-entry via the standard path is gated
    /// by the cooldown.
    Cleared,
}

impl FlagState {
    pub fn label(&self) -> &'static str {
        match self {
            FlagState::None => "NONE",
            FlagState::Candidate => "CANDIDATE",
            FlagState::Active => "ACTIVE",
            FlagState::Cleared => "CLEARED",
        }
    }
}

/// The counters the state machine steps on. `Copy`, no allocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitStatus {
    pub state: FlagState,
    /// Borderline readings in a row; only meaningful while `Candidate`.
    pub consecutive: u32,
    /// Snapshots left before standard re-entry is armed; only meaningful
    /// while `Cleared`.
    pub cooldown_left: u32,
}

/// Persisted per-unit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitState {
    #[serde(default)]
    pub unit_id: UnitId,
    pub state: FlagState,
    #[serde(default)]
    pub consecutive: u32,
    #[serde(default)]
    pub cooldown_left: u32,
    pub last_ratio: f64,
    pub last_timestamp: String,
}

impl UnitState {
    pub fn status(&self) -> UnitStatus {
        UnitStatus {
            state: self.state,
            consecutive: self.consecutive,
            cooldown_left: self.cooldown_left,
        }
    }

    /// Build the record for a unit after it has observed `snapshot`.
    pub fn observed(status: UnitStatus, snapshot: &Snapshot) -> Self {
        UnitState {
            unit_id: snapshot.unit_id.clone(),
            state: status.state,
            consecutive: status.consecutive,
            cooldown_left: status.cooldown_left,
            last_ratio: snapshot.ratio,
            last_timestamp: snapshot.timestamp.clone(),
        }
    }
}

// ── Snapshot ───────────────────────────────────────────────────────

/// One equity-ratio observation for a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub unit_id: UnitId,
    /// ISO-8601 timestamp, carried through verbatim.
    pub timestamp: String,
    pub ratio: f64,
}

impl Snapshot {
    pub fn new(unit_id: impl Into<String>, timestamp: impl Into<String>, ratio: f64) -> Self {
        Snapshot {
            unit_id: unit_id.into(),
            timestamp: timestamp.into(),
            ratio,
        }
    }
}

// ── Events ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Enter,
    Exit,
    Reenter,
}

impl EventKind {
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Enter => "ENTER",
            EventKind::Exit => "EXIT",
            EventKind::Reenter => "REENTER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventReason {
    /// Ratio fell below `T_enter_major`.
    Severe,
    /// Debounce count reached `consecutive_required_standard`.
    Consecutive,
}

/// A state transition worth recording, before it is attached to a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub kind: EventKind,
    pub reason: Option<EventReason>,
}

/// Append-only event log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub unit_id: UnitId,
    pub timestamp: String,
    pub ratio: f64,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub reason: Option<EventReason>,
}

impl Event {
    pub fn from_transition(transition: Transition, snapshot: &Snapshot) -> Self {
        Event {
            unit_id: snapshot.unit_id.clone(),
            timestamp: snapshot.timestamp.clone(),
            ratio: snapshot.ratio,
            kind: transition.kind,
            reason: transition.reason,
        }
    }
}

// ── Run summary ────────────────────────────────────────────────────

/// Outcome counters of one engine run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub snapshots_processed: usize,
    pub units_touched: usize,
    pub events_emitted: usize,
    pub malformed_skipped: usize,
}
