//! fairgate-engine — hysteresis flagging for equity-ratio observations.
//!
//! Decides, per monitored unit, whether it should be flagged as
//! under-served, without flapping when ratios hover near a threshold.
//!
//! # State Machine
//!
//! ```text
//! band(r) = severe      if r <  T_enter_major
//!           borderline  if r <  T_enter_standard
//!           healthy     otherwise
//!
//! NONE       severe                       → ACTIVE     ENTER(severe)
//!            borderline                   → CANDIDATE(1)
//! CANDIDATE  severe                       → ACTIVE     ENTER(severe)
//!            borderline, count met        → ACTIVE     ENTER(consecutive)
//!            borderline                   → CANDIDATE(count + 1)
//!            healthy                      → NONE
//! ACTIVE     r >= T_exit                  → CLEARED(cooldown)   EXIT
//! CLEARED    (cooldown -= 1, floor 0)
//!            severe                       → ACTIVE     REENTER(severe)
//!            cooldown == 0 && borderline  → CANDIDATE(1)
//! ```
//!
//! Every other combination keeps the current state. `T_exit` sits at or
//! above both entry thresholds, so a flagged unit has to recover past the
//! entry band before it clears, and can only reach `NONE`/`CANDIDATE`
//! again by way of `CLEARED`.
//!
//! # Architecture
//!
//! ```text
//! Engine<S: UnitStore>
//!   ├── load unit map + check event log  (warn + empty on corruption)
//!   ├── replay(): decide() per snapshot, in feed order
//!   └── persist_run(): append events, then save unit map (overwrite)
//! ```

pub mod decision;
pub mod driver;
pub mod error;

pub use decision::{Band, Decision, classify, decide};
pub use driver::{Engine, Replay, replay};
pub use error::{EngineError, EngineResult};
