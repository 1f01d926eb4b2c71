//! Logic thread: the fixed-rate loop that drives a play session.
//!
//! Each tick drains player commands, playback events and lane presses, then
//! reconciles the judgment state with the playback clock. Taps are only
//! applied between ticks, never during one.

pub mod audio;
pub mod audio_thread;
pub mod generator;
pub mod spectrum;

use crate::database::ChartStore;
use crate::logic::audio::PlaybackClock;
use crate::logic::spectrum::{SpectrumAdapter, SpectrumSample};
use crate::models::progress::GlobalUnlockState;
use crate::state::{PlaySession, RunResult, SessionPhase};
use crate::system::bus::{PlaybackEvent, SessionCommand, SystemBus};
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub struct LogicLoop {
    bus: SystemBus,
    session: PlaySession,
    clock: Box<dyn PlaybackClock>,
    spectrum: SpectrumAdapter,
    spectrum_rx: Option<Receiver<SpectrumSample>>,
    store: Arc<dyn ChartStore>,
    unlocks: GlobalUnlockState,
    tick_duration: Duration,
    end_ms: Option<i64>,
    track_completed: bool,
}

impl LogicLoop {
    /// `session` must hold a loaded chart (phase `Ready`).
    pub fn new(
        bus: SystemBus,
        session: PlaySession,
        clock: Box<dyn PlaybackClock>,
        spectrum: SpectrumAdapter,
        store: Arc<dyn ChartStore>,
        tick_rate_hz: u32,
    ) -> Self {
        let unlocks = store.load_unlocks();
        let end_ms = session
            .engine()
            .map(|e| e.chart().duration_ms)
            .filter(|&d| d > 0);
        Self {
            bus,
            session,
            clock,
            spectrum,
            spectrum_rx: None,
            store,
            unlocks,
            tick_duration: Duration::from_nanos(1_000_000_000 / tick_rate_hz.max(1) as u64),
            end_ms,
            track_completed: false,
        }
    }

    pub fn with_spectrum(mut self, rx: Receiver<SpectrumSample>) -> Self {
        self.spectrum_rx = Some(rx);
        self
    }

    /// Plays the run to its end. Returns `None` if the session could not start.
    pub fn run(&mut self) -> Option<RunResult> {
        if !self.session.start() {
            log::error!("LOGIC: No chart loaded, nothing to play");
            return None;
        }
        self.clock.play();

        let mut next_tick = Instant::now();
        loop {
            let now = Instant::now();

            if let Some(result) = self.handle_commands() {
                return result;
            }
            self.handle_playback_events();

            let position = self.clock.position_ms();
            self.handle_lanes(position, now);
            for event in self.session.tick(position) {
                log::trace!("LOGIC: {:?}", event);
            }

            if self.session.phase() == SessionPhase::Playing && self.reached_end(position) {
                self.clock.stop();
                return self.session.complete(&mut self.unlocks, self.store.as_ref());
            }

            if let Some(rx) = &self.spectrum_rx {
                self.spectrum.drain(rx);
            }
            if let Some(snapshot) = self.session.snapshot(position, self.spectrum.bands()) {
                let _ = self.bus.snapshot_tx.try_send(snapshot);
            }

            next_tick += self.tick_duration;
            if now < next_tick {
                thread::sleep(next_tick - now);
            } else {
                next_tick = now + self.tick_duration;
            }
        }
    }

    /// `Some` once the run is over.
    fn handle_commands(&mut self) -> Option<Option<RunResult>> {
        while let Ok(cmd) = self.bus.control_rx.try_recv() {
            match cmd {
                SessionCommand::Pause => {
                    if self.session.pause() {
                        self.clock.pause();
                    }
                }
                SessionCommand::Resume => {
                    if self.session.resume() {
                        self.clock.play();
                    }
                }
                SessionCommand::Quit => {
                    log::info!("LOGIC: Quit received...");
                    self.clock.stop();
                    return Some(self.session.quit(&mut self.unlocks, self.store.as_ref()));
                }
            }
        }
        None
    }

    fn handle_playback_events(&mut self) {
        while let Ok(event) = self.bus.playback_rx.try_recv() {
            match event {
                PlaybackEvent::DurationKnown { duration_ms } if duration_ms > 0 => {
                    self.end_ms = Some(duration_ms);
                }
                PlaybackEvent::DurationKnown { .. } => {}
                PlaybackEvent::Completed => self.track_completed = true,
                PlaybackEvent::Unavailable => {
                    log::warn!("LOGIC: Playback unavailable");
                }
            }
        }
    }

    /// Presses are stamped with the playback position at the time they were read.
    fn handle_lanes(&mut self, position: i64, now: Instant) {
        while let Ok(event) = self.bus.lane_rx.try_recv() {
            let latency = now.saturating_duration_since(event.at).as_millis() as i64;
            self.session.tap(event.lane, (position - latency).max(0));
        }
    }

    fn reached_end(&self, position: i64) -> bool {
        self.track_completed || self.end_ms.is_some_and(|end| position >= end)
    }
}

/// Runs `logic` on its own thread.
pub fn start_thread(mut logic: LogicLoop) -> thread::JoinHandle<Option<RunResult>> {
    thread::Builder::new()
        .name("Logic Thread".to_string())
        .spawn(move || {
            log::info!("LOGIC: Thread started");
            let result = logic.run();
            log::info!("LOGIC: Thread stopped");
            result
        })
        .expect("Failed to spawn Logic thread")
}
