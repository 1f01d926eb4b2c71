//! Play session lifecycle: track selection, analysis, play, pause and results.

use super::judgment::{JudgmentEngine, JudgmentEvent, JudgmentState, RunResult};
use crate::database::ChartStore;
use crate::error::ChartError;
use crate::models::chart::ChartData;
use crate::models::progress::GlobalUnlockState;
use crate::shared::snapshot::JudgmentSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    SelectTrack,
    Analyzing,
    Ready,
    Playing,
    Paused,
    Ended,
}

/// Owns the judgment state of the current run and guards its transitions.
///
/// Transitions that do not apply to the current phase are ignored and
/// return `false`.
pub struct PlaySession {
    phase: SessionPhase,
    engine: Option<JudgmentEngine>,
    state: Option<JudgmentState>,
    result: Option<RunResult>,
}

impl Default for PlaySession {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaySession {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::SelectTrack,
            engine: None,
            state: None,
            result: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn engine(&self) -> Option<&JudgmentEngine> {
        self.engine.as_ref()
    }

    pub fn state(&self) -> Option<&JudgmentState> {
        self.state.as_ref()
    }

    pub fn result(&self) -> Option<&RunResult> {
        self.result.as_ref()
    }

    fn transition(&mut self, allowed: &[SessionPhase], to: SessionPhase) -> bool {
        if !allowed.contains(&self.phase) {
            log::debug!("LOGIC: Ignoring {:?} -> {:?}", self.phase, to);
            return false;
        }
        log::info!("LOGIC: {:?} -> {:?}", self.phase, to);
        self.phase = to;
        true
    }

    pub fn begin_analysis(&mut self) -> bool {
        self.transition(&[SessionPhase::SelectTrack], SessionPhase::Analyzing)
    }

    /// A chart is available. Cached charts may skip the analysis phase.
    pub fn load_chart(&mut self, chart: ChartData) -> bool {
        if !self.transition(
            &[SessionPhase::SelectTrack, SessionPhase::Analyzing],
            SessionPhase::Ready,
        ) {
            return false;
        }
        self.engine = Some(JudgmentEngine::new(chart));
        self.state = None;
        self.result = None;
        true
    }

    /// Generation failed or was refused; back to track selection.
    pub fn analysis_failed(&mut self, error: &ChartError) -> bool {
        if !self.transition(&[SessionPhase::Analyzing], SessionPhase::SelectTrack) {
            return false;
        }
        log::warn!("LOGIC: Chart unavailable: {}", error);
        true
    }

    /// Starts a run with a fresh judgment state.
    pub fn start(&mut self) -> bool {
        let Some(engine) = &self.engine else {
            return false;
        };
        let state = engine.new_state();
        if !self.transition(&[SessionPhase::Ready], SessionPhase::Playing) {
            return false;
        }
        self.state = Some(state);
        true
    }

    pub fn pause(&mut self) -> bool {
        self.transition(&[SessionPhase::Playing], SessionPhase::Paused)
    }

    pub fn resume(&mut self) -> bool {
        self.transition(&[SessionPhase::Paused], SessionPhase::Playing)
    }

    /// Per-frame update. Does nothing unless playing.
    pub fn tick(&mut self, now_ms: i64) -> Vec<JudgmentEvent> {
        match (self.phase, &self.engine, &mut self.state) {
            (SessionPhase::Playing, Some(engine), Some(state)) => engine.tick(state, now_ms),
            _ => Vec::new(),
        }
    }

    /// Lane input. Ignored unless playing.
    pub fn tap(&mut self, lane: u8, now_ms: i64) -> Vec<JudgmentEvent> {
        match (self.phase, &self.engine, &mut self.state) {
            (SessionPhase::Playing, Some(engine), Some(state)) => {
                engine.on_lane_tap(state, lane, now_ms)
            }
            _ => Vec::new(),
        }
    }

    /// The track played to the end.
    pub fn complete(
        &mut self,
        unlocks: &mut GlobalUnlockState,
        store: &dyn ChartStore,
    ) -> Option<RunResult> {
        self.end(&[SessionPhase::Playing], unlocks, store)
    }

    /// The player quit mid-run. Pending notes count as missed.
    pub fn quit(
        &mut self,
        unlocks: &mut GlobalUnlockState,
        store: &dyn ChartStore,
    ) -> Option<RunResult> {
        self.end(&[SessionPhase::Playing, SessionPhase::Paused], unlocks, store)
    }

    fn end(
        &mut self,
        allowed: &[SessionPhase],
        unlocks: &mut GlobalUnlockState,
        store: &dyn ChartStore,
    ) -> Option<RunResult> {
        if !self.transition(allowed, SessionPhase::Ended) {
            return None;
        }
        let (engine, state) = (self.engine.as_mut()?, self.state.as_mut()?);
        let result = engine.finish(state, unlocks, store);
        self.result = Some(result.clone());
        Some(result)
    }

    /// Leaves the result screen, or abandons a loaded chart.
    pub fn back_to_select(&mut self) -> bool {
        if !self.transition(
            &[SessionPhase::Ready, SessionPhase::Ended],
            SessionPhase::SelectTrack,
        ) {
            return false;
        }
        self.engine = None;
        self.state = None;
        true
    }

    pub fn snapshot(&self, position_ms: i64, lane_bands: [f32; 5]) -> Option<JudgmentSnapshot> {
        let (engine, state) = (self.engine.as_ref()?, self.state.as_ref()?);
        Some(engine.snapshot(state, position_ms, lane_bands))
    }
}
