//! Shared channel infrastructure between system threads.
//!
//! The `SystemBus` connects the input thread, the audio thread and the logic
//! thread with crossbeam channels.

use crate::logic::spectrum::SpectrumSample;
use crate::shared::snapshot::JudgmentSnapshot;
use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Instant;

/// A lane button press.
#[derive(Debug, Clone, Copy)]
pub struct LaneEvent {
    pub lane: u8,
    /// When the press was read; the logic thread converts it to a playback position.
    pub at: Instant,
}

/// Player commands that change the session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Pause,
    Resume,
    Quit,
}

/// Signals from the audio thread about the track being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    DurationKnown { duration_ms: i64 },
    /// The track reached its end.
    Completed,
    /// No device, or the file could not be played.
    Unavailable,
}

/// Commands sent to the dedicated audio thread.
#[derive(Debug, Clone)]
pub enum AudioCommand {
    /// Load an audio file for playback.
    Load { path: PathBuf },
    Play,
    Pause,
    /// Stop and reset playback position.
    Stop,
    SetVolume { volume: f32 },
    /// Start sending band levels of the playing audio.
    StartSpectrum { tx: Sender<SpectrumSample> },
    StopSpectrum,
    Shutdown,
}

/// Aggregates the cross-thread communication channels.
#[derive(Clone)]
pub struct SystemBus {
    /// Input → Logic: lane presses.
    pub lane_tx: Sender<LaneEvent>,
    pub lane_rx: Receiver<LaneEvent>,

    /// Input → Logic: pause, resume, quit.
    pub control_tx: Sender<SessionCommand>,
    pub control_rx: Receiver<SessionCommand>,

    /// Audio → Logic: duration and end of track.
    pub playback_tx: Sender<PlaybackEvent>,
    pub playback_rx: Receiver<PlaybackEvent>,

    /// Logic → presentation: judgment snapshots.
    pub snapshot_tx: Sender<JudgmentSnapshot>,
    pub snapshot_rx: Receiver<JudgmentSnapshot>,

    /// Logic → Audio: audio commands.
    pub audio_cmd_tx: Sender<AudioCommand>,
    pub audio_cmd_rx: Receiver<AudioCommand>,

    /// Shared audio position in samples.
    /// Written by the audio thread, read by the logic thread.
    pub audio_position: Arc<AtomicU64>,

    /// Current audio sample rate.
    pub audio_sample_rate: Arc<AtomicU64>,

    /// Number of audio channels.
    pub audio_channels: Arc<AtomicU64>,
}

impl SystemBus {
    pub fn new() -> Self {
        let (lane_tx, lane_rx) = unbounded();
        let (control_tx, control_rx) = unbounded();
        let (playback_tx, playback_rx) = unbounded();

        // Bounded snapshot channel: max 2 frames queued to limit latency
        let (snapshot_tx, snapshot_rx) = bounded(2);

        let (audio_cmd_tx, audio_cmd_rx) = unbounded();

        Self {
            lane_tx,
            lane_rx,
            control_tx,
            control_rx,
            playback_tx,
            playback_rx,
            snapshot_tx,
            snapshot_rx,
            audio_cmd_tx,
            audio_cmd_rx,
            audio_position: Arc::new(AtomicU64::new(0)),
            audio_sample_rate: Arc::new(AtomicU64::new(44100)),
            audio_channels: Arc::new(AtomicU64::new(2)),
        }
    }
}

impl Default for SystemBus {
    fn default() -> Self {
        Self::new()
    }
}
