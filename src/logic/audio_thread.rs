//! Dedicated audio thread that owns the output device.
//!
//! Playback position is published as a sample counter so the logic thread can
//! read it without blocking.

use crate::logic::spectrum::{BandSplitter, SpectrumSample};
use crate::system::bus::{AudioCommand, PlaybackEvent, SystemBus};
use crossbeam_channel::{RecvTimeoutError, Sender};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// How often the worker checks for the end of the track.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

type SpectrumTap = Arc<Mutex<Option<Sender<SpectrumSample>>>>;

struct AudioWorker {
    _stream: Option<OutputStream>,
    stream_handle: Option<OutputStreamHandle>,
    sink: Option<Sink>,
    volume: f32,
    position_counter: Arc<AtomicU64>,
    spectrum_tap: SpectrumTap,
    /// Set while a loaded track is playing, until `Completed` is sent.
    playing: bool,
}

impl AudioWorker {
    fn new(bus: &SystemBus) -> Self {
        let (stream, stream_handle) = match OutputStream::try_default() {
            Ok((stream, handle)) => {
                log::info!("AUDIO: Device found, audio enabled");
                (Some(stream), Some(handle))
            }
            Err(e) => {
                log::warn!(
                    "AUDIO: No audio device found ({}), running in silent mode",
                    e
                );
                (None, None)
            }
        };
        Self {
            _stream: stream,
            stream_handle,
            sink: None,
            volume: 1.0,
            position_counter: bus.audio_position.clone(),
            spectrum_tap: Arc::new(Mutex::new(None)),
            playing: false,
        }
    }

    /// Returns `false` when the thread should stop.
    fn handle_command(&mut self, cmd: AudioCommand, bus: &SystemBus) -> bool {
        match cmd {
            AudioCommand::Load { path } => self.load_music(&path, bus),
            AudioCommand::Play => {
                if let Some(sink) = &self.sink {
                    sink.play();
                    self.playing = true;
                }
            }
            AudioCommand::Pause => {
                if let Some(sink) = &self.sink {
                    sink.pause();
                }
            }
            AudioCommand::Stop => {
                if let Some(sink) = self.sink.take() {
                    sink.stop();
                }
                self.playing = false;
                self.position_counter.store(0, Ordering::Relaxed);
            }
            AudioCommand::SetVolume { volume } => {
                self.volume = volume;
                if let Some(sink) = &self.sink {
                    sink.set_volume(volume);
                }
            }
            AudioCommand::StartSpectrum { tx } => self.set_tap(Some(tx)),
            AudioCommand::StopSpectrum => self.set_tap(None),
            AudioCommand::Shutdown => return false,
        }
        true
    }

    fn set_tap(&self, tx: Option<Sender<SpectrumSample>>) {
        if let Ok(mut tap) = self.spectrum_tap.lock() {
            *tap = tx;
        }
    }

    fn load_music(&mut self, path: &Path, bus: &SystemBus) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.playing = false;

        let Some(stream_handle) = &self.stream_handle else {
            let _ = bus.playback_tx.send(PlaybackEvent::Unavailable);
            return;
        };

        let Ok(file) = File::open(path) else {
            log::error!("AUDIO: Cannot open file {:?}", path);
            let _ = bus.playback_tx.send(PlaybackEvent::Unavailable);
            return;
        };

        let Ok(source) = Decoder::new(BufReader::new(file)) else {
            log::error!("AUDIO: Cannot decode file {:?}", path);
            let _ = bus.playback_tx.send(PlaybackEvent::Unavailable);
            return;
        };

        let sample_rate = source.sample_rate();
        let channels = source.channels();
        bus.audio_sample_rate
            .store(sample_rate as u64, Ordering::Relaxed);
        bus.audio_channels.store(channels as u64, Ordering::Relaxed);
        self.position_counter.store(0, Ordering::Relaxed);

        let duration = source.total_duration();

        let monitor = AudioMonitor {
            inner: source.convert_samples::<f32>(),
            position_counter: self.position_counter.clone(),
            splitter: BandSplitter::new(sample_rate),
            tap: self.spectrum_tap.clone(),
            channels: channels.max(1) as usize,
            frame_sum: 0.0,
            in_frame: 0,
        };

        let Ok(sink) = Sink::try_new(stream_handle) else {
            log::error!("AUDIO: Failed to create sink");
            let _ = bus.playback_tx.send(PlaybackEvent::Unavailable);
            return;
        };
        sink.set_volume(self.volume);
        sink.append(monitor);
        sink.pause();
        self.sink = Some(sink);

        log::info!("AUDIO: Loaded {:?}", path);
        let duration_ms = duration.map(|d| d.as_millis() as i64).unwrap_or(0);
        let _ = bus
            .playback_tx
            .send(PlaybackEvent::DurationKnown { duration_ms });
    }

    fn check_completed(&mut self, bus: &SystemBus) {
        if self.playing && self.sink.as_ref().is_some_and(|s| s.empty()) {
            self.playing = false;
            log::info!("AUDIO: Track finished");
            let _ = bus.playback_tx.send(PlaybackEvent::Completed);
        }
    }
}

/// Counts samples as the device pulls them and feeds the spectrum tap.
struct AudioMonitor<I> {
    inner: I,
    position_counter: Arc<AtomicU64>,
    splitter: BandSplitter,
    tap: SpectrumTap,
    channels: usize,
    frame_sum: f32,
    in_frame: usize,
}

impl<I> AudioMonitor<I> {
    fn feed(&mut self, sample: f32) {
        self.frame_sum += sample;
        self.in_frame += 1;
        if self.in_frame < self.channels {
            return;
        }
        let mono = self.frame_sum / self.channels as f32;
        self.frame_sum = 0.0;
        self.in_frame = 0;

        if let Some(reading) = self.splitter.push(mono)
            && let Ok(tap) = self.tap.try_lock()
            && let Some(tx) = tap.as_ref()
        {
            let _ = tx.try_send(reading);
        }
    }
}

impl<I> Iterator for AudioMonitor<I>
where
    I: Iterator<Item = f32>,
{
    type Item = f32;
    fn next(&mut self) -> Option<f32> {
        let item = self.inner.next()?;
        self.position_counter.fetch_add(1, Ordering::Relaxed);
        self.feed(item);
        Some(item)
    }
}

impl<I> Source for AudioMonitor<I>
where
    I: Source<Item = f32>,
{
    fn current_frame_len(&self) -> Option<usize> {
        self.inner.current_frame_len()
    }
    fn channels(&self) -> u16 {
        self.inner.channels()
    }
    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }
    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }
}

/// Starts the dedicated audio thread.
pub fn start_audio_thread(bus: SystemBus) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("Audio Thread".to_string())
        .spawn(move || {
            log::info!("AUDIO: Thread started");

            let mut worker = AudioWorker::new(&bus);

            loop {
                match bus.audio_cmd_rx.recv_timeout(POLL_INTERVAL) {
                    Ok(cmd) => {
                        if !worker.handle_command(cmd, &bus) {
                            break;
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
                worker.check_completed(&bus);
            }

            log::info!("AUDIO: Thread stopped");
        })
        .expect("Failed to spawn Audio thread")
}
