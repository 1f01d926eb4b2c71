//! Playback clocks and the handle to the audio thread.
//!
//! Judgment runs on the position reported by a [`PlaybackClock`]. With a
//! device this is the sample counter of the audio thread; without one a
//! pausable wall clock stands in.

use crate::logic::spectrum::{SpectrumCapture, SpectrumSample};
use crate::system::bus::{AudioCommand, SystemBus};
use crossbeam_channel::{Receiver, Sender, bounded};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Spectrum readings buffered between two logic ticks.
const SPECTRUM_QUEUE: usize = 16;

/// Source of the current position in the track.
pub trait PlaybackClock: Send {
    fn position_ms(&self) -> i64;
    fn play(&mut self);
    /// Freezes the position until the next `play`.
    fn pause(&mut self);
    fn stop(&mut self);
}

/// Sends commands to the audio thread and reads its position counter.
#[derive(Clone)]
pub struct AudioManager {
    cmd_tx: Sender<AudioCommand>,
    position: Arc<AtomicU64>,
    sample_rate: Arc<AtomicU64>,
    channels: Arc<AtomicU64>,
}

impl AudioManager {
    pub fn new(bus: &SystemBus) -> Self {
        Self {
            cmd_tx: bus.audio_cmd_tx.clone(),
            position: bus.audio_position.clone(),
            sample_rate: bus.audio_sample_rate.clone(),
            channels: bus.audio_channels.clone(),
        }
    }

    pub fn load_music(&self, path: &Path) {
        let _ = self.cmd_tx.send(AudioCommand::Load {
            path: path.to_path_buf(),
        });
    }

    /// Sets the master volume (0.0 to 1.0).
    pub fn set_volume(&self, volume: f32) {
        let _ = self.cmd_tx.send(AudioCommand::SetVolume { volume });
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(AudioCommand::Shutdown);
    }

    /// Position derived from the sample count shared with the audio thread.
    pub fn get_position_seconds(&self) -> f64 {
        let samples = self.position.load(Ordering::Relaxed) as f64;
        let sample_rate = self.sample_rate.load(Ordering::Relaxed).max(1) as f64;
        let channels = self.channels.load(Ordering::Relaxed).max(1) as f64;

        samples / (sample_rate * channels)
    }
}

impl PlaybackClock for AudioManager {
    fn position_ms(&self) -> i64 {
        (self.get_position_seconds() * 1000.0).round() as i64
    }

    fn play(&mut self) {
        let _ = self.cmd_tx.send(AudioCommand::Play);
    }

    fn pause(&mut self) {
        let _ = self.cmd_tx.send(AudioCommand::Pause);
    }

    fn stop(&mut self) {
        let _ = self.cmd_tx.send(AudioCommand::Stop);
    }
}

/// Band levels of whatever the audio thread is playing.
pub struct AudioSpectrumCapture {
    cmd_tx: Sender<AudioCommand>,
}

impl AudioSpectrumCapture {
    pub fn new(bus: &SystemBus) -> Self {
        Self {
            cmd_tx: bus.audio_cmd_tx.clone(),
        }
    }
}

impl SpectrumCapture for AudioSpectrumCapture {
    fn start_capture(&mut self) -> Receiver<SpectrumSample> {
        let (tx, rx) = bounded(SPECTRUM_QUEUE);
        let _ = self.cmd_tx.send(AudioCommand::StartSpectrum { tx });
        rx
    }

    fn stop_capture(&mut self) {
        let _ = self.cmd_tx.send(AudioCommand::StopSpectrum);
    }
}

/// Pausable monotonic clock for silent mode.
#[derive(Debug, Default)]
pub struct WallClock {
    running_since: Option<Instant>,
    elapsed: Duration,
}

impl WallClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlaybackClock for WallClock {
    fn position_ms(&self) -> i64 {
        let running = self.running_since.map(|t| t.elapsed()).unwrap_or_default();
        (self.elapsed + running).as_millis() as i64
    }

    fn play(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.elapsed += since.elapsed();
        }
    }

    fn stop(&mut self) {
        self.running_since = None;
        self.elapsed = Duration::ZERO;
    }
}
