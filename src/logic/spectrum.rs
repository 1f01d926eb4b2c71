//! Cosmetic lane bands derived from a {bass, mid, treble} stream.
//!
//! Nothing in here is read by the judgment engine.

use crate::models::engine::NUM_LANES;
use crate::models::settings::SpectrumSettings;
use crossbeam_channel::Receiver;

/// One normalized spectral reading, each band in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpectrumSample {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
}

impl SpectrumSample {
    /// Raw per-lane targets, bass on the left and treble on the right.
    pub fn lane_targets(&self) -> [f32; NUM_LANES] {
        let bass = self.bass.clamp(0.0, 1.0);
        let mid = self.mid.clamp(0.0, 1.0);
        let treble = self.treble.clamp(0.0, 1.0);
        [
            bass,
            (bass + mid) * 0.5,
            mid,
            (mid + treble) * 0.5,
            treble,
        ]
    }
}

/// A platform source of spectral samples.
pub trait SpectrumCapture {
    fn start_capture(&mut self) -> Receiver<SpectrumSample>;
    fn stop_capture(&mut self);
}

/// Five smoothed lane intensities: fast rise, slow fall.
#[derive(Debug, Clone)]
pub struct SpectrumAdapter {
    bands: [f32; NUM_LANES],
    attack: f32,
    decay: f32,
}

impl SpectrumAdapter {
    pub fn new(settings: SpectrumSettings) -> Self {
        Self {
            bands: [0.0; NUM_LANES],
            attack: settings.attack,
            decay: settings.decay,
        }
    }

    pub fn push(&mut self, sample: SpectrumSample) {
        for (band, target) in self.bands.iter_mut().zip(sample.lane_targets()) {
            let rate = if target > *band { self.attack } else { self.decay };
            *band = (*band + (target - *band) * rate).clamp(0.0, 1.0);
        }
    }

    /// Applies every sample waiting on `rx`.
    pub fn drain(&mut self, rx: &Receiver<SpectrumSample>) {
        while let Ok(sample) = rx.try_recv() {
            self.push(sample);
        }
    }

    pub fn bands(&self) -> [f32; NUM_LANES] {
        self.bands
    }
}

/// Splits raw samples into three bands with one-pole filters and reports a
/// normalized RMS per block.
pub struct BandSplitter {
    low_coeff: f32,
    high_coeff: f32,
    low: f32,
    below_high: f32,
    sums: [f32; 3],
    count: usize,
    block_len: usize,
}

/// Crossovers of the three bands.
const BASS_CUTOFF_HZ: f32 = 250.0;
const TREBLE_CUTOFF_HZ: f32 = 4_000.0;
/// RMS to [0, 1] scaling.
const BAND_GAIN: f32 = 3.0;
/// Readings per second.
const BLOCKS_PER_SECOND: u32 = 60;

impl BandSplitter {
    pub fn new(sample_rate: u32) -> Self {
        let rate = sample_rate.max(1) as f32;
        let coeff = |cutoff: f32| 1.0 - (-2.0 * std::f32::consts::PI * cutoff / rate).exp();
        Self {
            low_coeff: coeff(BASS_CUTOFF_HZ),
            high_coeff: coeff(TREBLE_CUTOFF_HZ),
            low: 0.0,
            below_high: 0.0,
            sums: [0.0; 3],
            count: 0,
            block_len: (sample_rate / BLOCKS_PER_SECOND).max(1) as usize,
        }
    }

    /// Feeds one sample; returns a reading at the end of each block.
    pub fn push(&mut self, x: f32) -> Option<SpectrumSample> {
        self.low += (x - self.low) * self.low_coeff;
        self.below_high += (x - self.below_high) * self.high_coeff;
        let bands = [self.low, self.below_high - self.low, x - self.below_high];
        for (sum, b) in self.sums.iter_mut().zip(bands) {
            *sum += b * b;
        }

        self.count += 1;
        if self.count < self.block_len {
            return None;
        }

        let n = self.count as f32;
        let level = |sum: f32| ((sum / n).sqrt() * BAND_GAIN).clamp(0.0, 1.0);
        let sample = SpectrumSample {
            bass: level(self.sums[0]),
            mid: level(self.sums[1]),
            treble: level(self.sums[2]),
        };
        self.sums = [0.0; 3];
        self.count = 0;
        Some(sample)
    }
}
