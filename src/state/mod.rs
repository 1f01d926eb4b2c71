//! Session state.
//!
//! - `JudgmentEngine` / `JudgmentState` - scoring of a single run
//! - `PlaySession` - phase machine around a run

pub mod judgment;
pub mod session;

pub use judgment::{ActiveBonus, JudgmentEngine, JudgmentEvent, JudgmentState, RunResult};
pub use session::{PlaySession, SessionPhase};
