//! Five-lane rhythm game engine.
//!
//! Charts are generated offline from a track's audio and BPM, cached in
//! SQLite, then played against a playback clock by the judgment engine.

pub mod database;
pub mod error;
pub mod input;
pub mod logic;
pub mod models;
pub mod shared;
pub mod state;
pub mod system;

pub use database::{ChartStore, MemoryChartStore, SqliteChartStore};
pub use error::{CatalogError, ChartError, ConfigError, StoreError};
pub use logic::generator::{CancelToken, ChartGenerator, ChartJob, TrackRequest};
pub use logic::spectrum::{SpectrumAdapter, SpectrumCapture, SpectrumSample};
pub use models::chart::{BonusType, ChartData, ChartNote};
pub use state::{JudgmentEngine, JudgmentEvent, JudgmentState, PlaySession, RunResult, SessionPhase};
