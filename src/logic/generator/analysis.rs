//! Audio decoding and onset analysis.
//!
//! Onsets come from positive energy flux over short frames, picked against a
//! local adaptive threshold. Each onset also carries a brightness value (the
//! frame's zero-crossing rate, ranked across the track) used to pick a lane.

use crate::error::ChartError;
use crate::logic::generator::CancelToken;
use crate::models::settings::GeneratorSettings;
use rodio::{Decoder, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Peak RMS below which a track counts as silent.
const SILENCE_FLOOR: f32 = 1e-4;
/// Frames on each side used for the local mean flux.
const LOCAL_WINDOW_FRAMES: usize = 50;
/// Absolute part of the threshold, relative to the loudest frame.
const FLUX_FLOOR_RATIO: f32 = 0.05;
/// Beats quieter than this fraction of the peak are dropped from the fallback grid.
const GRID_GATE_RATIO: f32 = 0.1;
/// Below this many onsets per second the beat grid is used instead.
const MIN_ONSETS_PER_SECOND: f64 = 0.5;
/// Samples decoded between two cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 1 << 16;

/// Mono PCM in [-1, 1].
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn duration_ms(&self) -> i64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as i64 * 1000 / self.sample_rate as i64
    }
}

/// A detected musical event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Onset {
    pub timestamp_ms: i64,
    /// 0 (dull) to 1 (bright), ranked within the track.
    pub brightness: f32,
}

/// Decodes a file and downmixes it to mono.
pub fn decode_mono(path: &Path, cancel: &CancelToken) -> Result<DecodedAudio, ChartError> {
    let file = File::open(path)
        .map_err(|e| ChartError::AnalysisFailed(format!("cannot open {:?}: {}", path, e)))?;
    let source = Decoder::new(BufReader::new(file))
        .map_err(|e| ChartError::AnalysisFailed(format!("cannot decode {:?}: {}", path, e)))?;

    let sample_rate = source.sample_rate();
    let channels = source.channels().max(1) as usize;

    let mut samples = Vec::new();
    let mut frame_sum = 0.0f32;
    let mut in_frame = 0usize;
    for (i, sample) in source.convert_samples::<f32>().enumerate() {
        frame_sum += sample;
        in_frame += 1;
        if in_frame == channels {
            samples.push(frame_sum / channels as f32);
            frame_sum = 0.0;
            in_frame = 0;
        }
        if i % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
            return Err(ChartError::Cancelled);
        }
    }

    if sample_rate == 0 || samples.is_empty() {
        return Err(ChartError::AnalysisFailed(format!(
            "{:?} contains no audio",
            path
        )));
    }

    log::debug!(
        "CHART: Decoded {} samples at {} Hz ({} channels)",
        samples.len(),
        sample_rate,
        channels
    );
    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}

struct FrameFeatures {
    frame_ms: f64,
    energy: Vec<f32>,
    zero_crossings: Vec<f32>,
}

impl FrameFeatures {
    fn compute(audio: &DecodedAudio, frame_ms: u32) -> Self {
        let frame_len = (audio.sample_rate as usize * frame_ms as usize / 1000).max(1);
        let mut energy = Vec::with_capacity(audio.samples.len() / frame_len + 1);
        let mut zero_crossings = Vec::with_capacity(energy.capacity());

        for frame in audio.samples.chunks(frame_len) {
            let power: f32 = frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32;
            energy.push(power.sqrt());

            let crossings = frame
                .windows(2)
                .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
                .count();
            zero_crossings.push(crossings as f32 / frame.len().max(2) as f32);
        }

        Self {
            frame_ms: frame_len as f64 * 1000.0 / audio.sample_rate as f64,
            energy,
            zero_crossings,
        }
    }

    fn timestamp_ms(&self, frame: usize) -> i64 {
        (frame as f64 * self.frame_ms).round() as i64
    }

    fn frame_at(&self, timestamp_ms: i64) -> usize {
        (timestamp_ms as f64 / self.frame_ms) as usize
    }

    fn peak(&self) -> f32 {
        self.energy.iter().copied().fold(0.0, f32::max)
    }
}

/// Produces the ascending list of chart events for a decoded track.
pub fn analyze(
    audio: &DecodedAudio,
    bpm: f64,
    settings: &GeneratorSettings,
    cancel: &CancelToken,
) -> Result<Vec<Onset>, ChartError> {
    if audio.sample_rate == 0 || audio.samples.is_empty() {
        return Err(ChartError::AnalysisFailed("no audio samples".into()));
    }

    let features = FrameFeatures::compute(audio, settings.analysis_frame_ms);
    let peak = features.peak();
    if peak <= SILENCE_FLOOR {
        return Err(ChartError::AnalysisFailed("track is silent".into()));
    }
    if cancel.is_cancelled() {
        return Err(ChartError::Cancelled);
    }

    let mut onsets = detect_onsets(&features, peak, settings);
    let seconds = audio.duration_ms() as f64 / 1000.0;
    if (onsets.len() as f64) < seconds * MIN_ONSETS_PER_SECOND {
        log::info!(
            "CHART: Only {} onsets in {:.1}s, falling back to the beat grid",
            onsets.len(),
            seconds
        );
        onsets = beat_grid(&features, peak, bpm, audio.duration_ms());
    }

    rank_brightness(&mut onsets);
    log::debug!("CHART: {} events detected", onsets.len());
    Ok(onsets)
}

fn detect_onsets(features: &FrameFeatures, peak: f32, settings: &GeneratorSettings) -> Vec<Onset> {
    let energy = &features.energy;
    if energy.len() < 3 {
        return Vec::new();
    }

    let mut flux = Vec::with_capacity(energy.len());
    flux.push(0.0f32);
    flux.extend(energy.windows(2).map(|w| (w[1] - w[0]).max(0.0)));

    let mut prefix = Vec::with_capacity(flux.len() + 1);
    prefix.push(0.0f64);
    for &f in &flux {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + f as f64);
    }

    let floor = peak * FLUX_FLOOR_RATIO;
    let mut onsets: Vec<Onset> = Vec::new();
    for i in 1..flux.len() - 1 {
        let lo = i.saturating_sub(LOCAL_WINDOW_FRAMES);
        let hi = (i + LOCAL_WINDOW_FRAMES + 1).min(flux.len());
        let local_mean = ((prefix[hi] - prefix[lo]) / (hi - lo) as f64) as f32;
        let threshold = local_mean * settings.onset_sensitivity + floor;

        let is_peak = flux[i] > threshold && flux[i] >= flux[i - 1] && flux[i] > flux[i + 1];
        if !is_peak {
            continue;
        }

        let timestamp_ms = features.timestamp_ms(i);
        let spaced = onsets
            .last()
            .is_none_or(|last| timestamp_ms - last.timestamp_ms >= settings.min_onset_gap_ms);
        if spaced {
            onsets.push(Onset {
                timestamp_ms,
                brightness: features.zero_crossings[i],
            });
        }
    }
    onsets
}

/// One event per beat from the first audible frame, skipping quiet beats.
fn beat_grid(features: &FrameFeatures, peak: f32, bpm: f64, duration_ms: i64) -> Vec<Onset> {
    let gate = peak * GRID_GATE_RATIO;
    let Some(first) = features.energy.iter().position(|&e| e > gate) else {
        return Vec::new();
    };

    let beat_ms = 60_000.0 / bpm;
    let start = features.timestamp_ms(first) as f64;
    let mut onsets = Vec::new();
    let mut beat = 0u32;
    loop {
        let timestamp_ms = (start + beat as f64 * beat_ms).round() as i64;
        if timestamp_ms >= duration_ms {
            break;
        }
        let frame = features.frame_at(timestamp_ms);
        if let Some(&e) = features.energy.get(frame)
            && e > gate
        {
            onsets.push(Onset {
                timestamp_ms,
                brightness: features.zero_crossings[frame],
            });
        }
        beat += 1;
    }
    onsets
}

/// Replaces raw zero-crossing rates by their rank in [0, 1].
fn rank_brightness(onsets: &mut [Onset]) {
    if onsets.len() < 2 {
        for onset in onsets.iter_mut() {
            onset.brightness = 0.5;
        }
        return;
    }

    let mut order: Vec<usize> = (0..onsets.len()).collect();
    order.sort_by(|&a, &b| {
        onsets[a]
            .brightness
            .total_cmp(&onsets[b].brightness)
            .then(a.cmp(&b))
    });

    let last = (onsets.len() - 1) as f32;
    let mut ranked = vec![0.0f32; onsets.len()];
    for (rank, &idx) in order.iter().enumerate() {
        ranked[idx] = rank as f32 / last;
    }
    for (onset, rank) in onsets.iter_mut().zip(ranked) {
        onset.brightness = rank;
    }
}
