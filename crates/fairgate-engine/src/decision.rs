//! The hysteresis decision function.
//!
//! Pure: `(parameters, previous status, ratio) -> (next status, transition)`.
//! No I/O, no allocation, no panics for any `f64`.

use fairgate_core::{
    EventKind, EventReason, FlagState, Parameters, Transition, UnitStatus,
};

/// Where a ratio falls relative to the entry thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    /// `r < T_enter_major`
    Severe,
    /// `T_enter_major <= r < T_enter_standard`
    Borderline,
    /// `r >= T_enter_standard`
    Healthy,
}

pub fn classify(params: &Parameters, ratio: f64) -> Band {
    if ratio < params.t_enter_major() {
        Band::Severe
    } else if ratio < params.t_enter_standard() {
        Band::Borderline
    } else {
        Band::Healthy
    }
}

/// Result of feeding one ratio to a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub status: UnitStatus,
    pub transition: Option<Transition>,
}

impl Decision {
    fn quiet(status: UnitStatus) -> Self {
        Self {
            status,
            transition: None,
        }
    }

    fn activate(kind: EventKind, reason: EventReason) -> Self {
        Self {
            status: UnitStatus {
                state: FlagState::Active,
                consecutive: 0,
                cooldown_left: 0,
            },
            transition: Some(Transition {
                kind,
                reason: Some(reason),
            }),
        }
    }
}

fn none() -> UnitStatus {
    UnitStatus::default()
}

fn cleared(cooldown_left: u32) -> UnitStatus {
    UnitStatus {
        state: FlagState::Cleared,
        consecutive: 0,
        cooldown_left,
    }
}

fn candidate(consecutive: u32) -> UnitStatus {
    UnitStatus {
        state: FlagState::Candidate,
        consecutive,
        cooldown_left: 0,
    }
}

/// Count a further borderline reading; enter once the count is met.
///
/// Only a unit already in CANDIDATE can enter this way. The reading that
/// opens a candidacy always lands in CANDIDATE(1), even when one reading
/// is all that is required.
fn debounce(params: &Parameters, count: u32) -> Decision {
    if count >= params.consecutive_required_standard() {
        Decision::activate(EventKind::Enter, EventReason::Consecutive)
    } else {
        Decision::quiet(candidate(count))
    }
}

/// Step a unit's state machine by one observation.
///
/// A unit seen for the first time starts from `UnitStatus::default()`
/// (`NONE`, both counters zero).
pub fn decide(params: &Parameters, previous: UnitStatus, ratio: f64) -> Decision {
    let band = classify(params, ratio);

    match previous.state {
        FlagState::None => match band {
            Band::Severe => Decision::activate(EventKind::Enter, EventReason::Severe),
            Band::Borderline => Decision::quiet(candidate(1)),
            Band::Healthy => Decision::quiet(none()),
        },
        FlagState::Candidate => match band {
            Band::Severe => Decision::activate(EventKind::Enter, EventReason::Severe),
            Band::Borderline => debounce(params, previous.consecutive.saturating_add(1)),
            // No partial credit: a single healthy reading restarts the count.
            Band::Healthy => Decision::quiet(none()),
        },
        FlagState::Active => {
            if ratio >= params.t_exit() {
                Decision {
                    status: cleared(params.cooldown_snapshots_after_exit()),
                    transition: Some(Transition {
                        kind: EventKind::Exit,
                        reason: None,
                    }),
                }
            } else {
                Decision::quiet(UnitStatus {
                    state: FlagState::Active,
                    consecutive: 0,
                    cooldown_left: 0,
                })
            }
        }
        FlagState::Cleared => {
            let cooldown_left = previous.cooldown_left.saturating_sub(1);
            match band {
                Band::Severe => Decision::activate(EventKind::Reenter, EventReason::Severe),
                Band::Borderline if cooldown_left == 0 => Decision::quiet(candidate(1)),
                _ => Decision::quiet(cleared(cooldown_left)),
            }
        }
    }
}
