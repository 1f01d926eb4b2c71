//! Offline chart generation: audio + BPM in, sorted lane-assigned notes out.
//!
//! The output only depends on the audio, the BPM and the track id. Bonus
//! placement is seeded from an MD5 of the track id, so replays of a track keep
//! the same layout while different tracks differ.

pub mod analysis;
pub mod job;
pub mod lanes;

pub use analysis::{DecodedAudio, Onset};
pub use job::ChartJob;

use crate::error::ChartError;
use crate::models::catalog::TrackEntry;
use crate::models::chart::{BonusType, ChartData, ChartNote};
use crate::models::engine::HitWindow;
use crate::models::settings::{EngineConfig, GeneratorSettings};
use lanes::LaneAssigner;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag used to abandon a running generation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Everything the generator needs to know about a track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRequest {
    pub audio_path: PathBuf,
    pub track_id: String,
    pub track_name: String,
    pub artist_name: String,
    pub duration_ms: i64,
    pub bpm: f64,
}

impl TrackRequest {
    pub fn from_entry(entry: &TrackEntry, bpm: f64) -> Self {
        Self {
            audio_path: entry.local_audio_path.clone(),
            track_id: entry.track_id.clone(),
            track_name: entry.name.clone(),
            artist_name: entry.artist.clone(),
            duration_ms: entry.duration_ms,
            bpm,
        }
    }
}

/// Stable per-track seed: the first 8 bytes of the MD5 of the id.
pub fn track_seed(track_id: &str) -> u64 {
    let digest = md5::compute(track_id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest.0[..8]);
    u64::from_le_bytes(bytes)
}

#[derive(Debug, Clone)]
pub struct ChartGenerator {
    max_duration_ms: i64,
    settings: GeneratorSettings,
}

impl ChartGenerator {
    pub fn new(max_duration_ms: i64, settings: GeneratorSettings) -> Self {
        Self {
            max_duration_ms,
            settings,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.max_duration_ms, config.generator.clone())
    }

    /// Decodes and analyses the track. Over-long tracks are refused before the file is opened.
    pub fn generate(
        &self,
        request: &TrackRequest,
        cancel: &CancelToken,
    ) -> Result<ChartData, ChartError> {
        self.check_request(request)?;
        log::info!(
            "CHART: Analyzing {} - {} ({} BPM)",
            request.artist_name,
            request.track_name,
            request.bpm
        );
        let audio = analysis::decode_mono(&request.audio_path, cancel)?;
        self.generate_from_audio(request, &audio, cancel)
    }

    /// Same as [`generate`](Self::generate) on already decoded audio.
    pub fn generate_from_audio(
        &self,
        request: &TrackRequest,
        audio: &DecodedAudio,
        cancel: &CancelToken,
    ) -> Result<ChartData, ChartError> {
        self.check_request(request)?;
        let decoded_ms = audio.duration_ms();
        if decoded_ms > self.max_duration_ms {
            return Err(ChartError::DurationExceeded {
                duration_ms: decoded_ms,
                max_ms: self.max_duration_ms,
            });
        }

        let onsets = analysis::analyze(audio, request.bpm, &self.settings, cancel)?;

        let spacing_ms = HitWindow::from_bpm(request.bpm).hit_ms_whole();
        let mut assigner = LaneAssigner::new(spacing_ms);
        let mut notes: Vec<ChartNote> = onsets
            .iter()
            .filter_map(|onset| {
                assigner
                    .assign(onset.timestamp_ms, onset.brightness)
                    .map(|lane| ChartNote::tap(onset.timestamp_ms, lane))
            })
            .collect();

        if cancel.is_cancelled() {
            return Err(ChartError::Cancelled);
        }
        if notes.is_empty() {
            return Err(ChartError::AnalysisFailed("no playable events".into()));
        }

        let mut rng = StdRng::seed_from_u64(track_seed(&request.track_id));
        let bonuses = place_bonuses(&mut notes, spacing_ms, &self.settings, &mut rng);

        let duration_ms = if request.duration_ms > 0 {
            request.duration_ms
        } else {
            decoded_ms
        };

        log::info!(
            "CHART: {} notes ({} bonus) for {}",
            notes.len(),
            bonuses,
            request.track_id
        );

        Ok(ChartData {
            track_id: request.track_id.clone(),
            track_name: request.track_name.clone(),
            artist_name: request.artist_name.clone(),
            bpm: request.bpm,
            duration_ms,
            notes,
            high_score: 0,
            best_multiplier: 1,
        })
    }

    fn check_request(&self, request: &TrackRequest) -> Result<(), ChartError> {
        if request.duration_ms > self.max_duration_ms {
            log::warn!(
                "CHART: {} is too long ({} ms > {} ms)",
                request.track_id,
                request.duration_ms,
                self.max_duration_ms
            );
            return Err(ChartError::DurationExceeded {
                duration_ms: request.duration_ms,
                max_ms: self.max_duration_ms,
            });
        }
        if !(request.bpm.is_finite() && request.bpm > 0.0) {
            return Err(ChartError::AnalysisFailed(format!(
                "invalid BPM {}",
                request.bpm
            )));
        }
        Ok(())
    }
}

/// Turns a few isolated notes into bonus notes. Returns how many were placed.
///
/// A candidate comes up every `bonus_interval` notes and is only used when no
/// other note (in any lane) lies within one hit window of it.
fn place_bonuses(
    notes: &mut [ChartNote],
    spacing_ms: i64,
    settings: &GeneratorSettings,
    rng: &mut StdRng,
) -> usize {
    let chance = settings.bonus_chance.clamp(0.0, 1.0);
    let interval = settings.bonus_interval.max(1);
    let mut since_last = 0usize;
    let mut placed = 0usize;

    for i in 0..notes.len() {
        since_last += 1;
        if since_last < interval {
            continue;
        }

        let at = notes[i].timestamp_ms;
        let clear_before = i == 0 || at - notes[i - 1].timestamp_ms >= spacing_ms;
        let clear_after = i + 1 >= notes.len() || notes[i + 1].timestamp_ms - at >= spacing_ms;
        if !(clear_before && clear_after) || !rng.random_bool(chance) {
            continue;
        }

        let bonus = BonusType::ALL[rng.random_range(0..BonusType::ALL.len())];
        notes[i].bonus = Some(bonus);
        since_last = 0;
        placed += 1;
    }
    placed
}

#[cfg(test)]
mod tests {
    use super::analysis::tests::{click_track, steady_tone};
    use super::*;
    use crate::models::engine::NUM_LANES;
    use proptest::prelude::*;

    fn request(track_id: &str, duration_ms: i64, bpm: f64) -> TrackRequest {
        TrackRequest {
            audio_path: PathBuf::from("/nonexistent/audio.mp3"),
            track_id: track_id.to_string(),
            track_name: "Name".into(),
            artist_name: "Artist".into(),
            duration_ms,
            bpm,
        }
    }

    fn generator() -> ChartGenerator {
        let settings = GeneratorSettings {
            bonus_interval: 8,
            bonus_chance: 1.0,
            ..GeneratorSettings::default()
        };
        ChartGenerator::new(600_000, settings)
    }

    fn dense_track() -> DecodedAudio {
        let clicks: Vec<i64> = (1..150).map(|k| k * 100 + (k % 3) * 7).collect();
        click_track(15_500, &clicks)
    }

    #[test]
    fn test_chart_invariants_hold() {
        let chart = generator()
            .generate_from_audio(&request("dense", 15_500, 140.0), &dense_track(), &CancelToken::new())
            .unwrap();

        assert!(!chart.notes.is_empty());
        assert!(chart.is_well_formed());
        assert!(chart.notes.iter().all(|n| (n.lane as usize) < NUM_LANES));

        let spacing = HitWindow::from_bpm(140.0).hit_ms_whole();
        for lane in 0..NUM_LANES as u8 {
            let times: Vec<i64> = chart
                .notes
                .iter()
                .filter(|n| n.lane == lane)
                .map(|n| n.timestamp_ms)
                .collect();
            for w in times.windows(2) {
                assert!(w[1] - w[0] >= spacing, "lane {lane}: {} then {}", w[0], w[1]);
            }
        }
    }

    #[test]
    fn test_same_input_same_chart() {
        let audio = dense_track();
        let a = generator()
            .generate_from_audio(&request("same", 15_500, 140.0), &audio, &CancelToken::new())
            .unwrap();
        let b = generator()
            .generate_from_audio(&request("same", 15_500, 140.0), &audio, &CancelToken::new())
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_isolated_notes_become_bonuses() {
        let clicks: Vec<i64> = (1..40).map(|k| k * 500).collect();
        let audio = click_track(20_500, &clicks);
        let chart = generator()
            .generate_from_audio(&request("sparse", 20_500, 120.0), &audio, &CancelToken::new())
            .unwrap();

        let bonuses = chart.bonus_note_count();
        assert!(bonuses >= 1);
        assert!(bonuses <= chart.notes.len() / 8);
        assert!(chart.playable_note_count() > bonuses);
    }

    #[test]
    fn test_bonuses_avoid_crowded_notes() {
        let mut notes: Vec<ChartNote> = (0..32).map(|k| ChartNote::tap(k * 50, (k % 5) as u8)).collect();
        let settings = GeneratorSettings {
            bonus_interval: 4,
            bonus_chance: 1.0,
            ..GeneratorSettings::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(place_bonuses(&mut notes, 143, &settings, &mut rng), 0);
        assert!(notes.iter().all(|n| !n.is_bonus()));
    }

    #[test]
    fn test_duration_limit_checked_before_audio() {
        let generator = ChartGenerator::new(60_000, GeneratorSettings::default());
        let result = generator.generate(&request("long", 60_001, 120.0), &CancelToken::new());
        assert!(matches!(
            result,
            Err(ChartError::DurationExceeded {
                duration_ms: 60_001,
                max_ms: 60_000
            })
        ));
    }

    #[test]
    fn test_decoded_length_also_limited() {
        let generator = ChartGenerator::new(5_000, GeneratorSettings::default());
        let result = generator.generate_from_audio(
            &request("unknown-length", 0, 120.0),
            &steady_tone(6_000),
            &CancelToken::new(),
        );
        assert!(matches!(result, Err(ChartError::DurationExceeded { .. })));
    }

    #[test]
    fn test_unreadable_audio_fails() {
        let result = generator().generate(&request("missing", 30_000, 120.0), &CancelToken::new());
        assert!(matches!(result, Err(ChartError::AnalysisFailed(_))));
    }

    #[test]
    fn test_invalid_bpm_fails() {
        let result = generator().generate_from_audio(
            &request("nobpm", 8_000, 0.0),
            &steady_tone(8_000),
            &CancelToken::new(),
        );
        assert!(matches!(result, Err(ChartError::AnalysisFailed(_))));
    }

    #[test]
    fn test_seed_is_stable_per_track() {
        assert_eq!(track_seed("abc"), track_seed("abc"));
        assert_ne!(track_seed("abc"), track_seed("abd"));
    }

    #[test]
    fn test_duration_falls_back_to_decoded_length() {
        let chart = generator()
            .generate_from_audio(&request("tone", 0, 120.0), &steady_tone(8_000), &CancelToken::new())
            .unwrap();
        assert_eq!(chart.duration_ms, 8_000);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn test_generated_charts_keep_invariants(
            clicks in prop::collection::btree_set(50i64..5_900, 1..60),
            bpm in 60.0f64..220.0,
        ) {
            let clicks: Vec<i64> = clicks.into_iter().collect();
            let audio = click_track(6_000, &clicks);
            let result = generator().generate_from_audio(
                &request("prop", 6_000, bpm),
                &audio,
                &CancelToken::new(),
            );

            let chart = match result {
                Ok(chart) => chart,
                Err(ChartError::AnalysisFailed(_)) => return Ok(()),
                Err(e) => return Err(TestCaseError::fail(format!("unexpected error: {e}"))),
            };
            prop_assert!(chart.is_well_formed());
            prop_assert!(chart.notes.iter().all(|n| (n.lane as usize) < NUM_LANES));

            let spacing = HitWindow::from_bpm(bpm).hit_ms_whole();
            let mut last_in_lane = [None::<i64>; NUM_LANES];
            for note in &chart.notes {
                if let Some(last) = last_in_lane[note.lane as usize] {
                    prop_assert!(note.timestamp_ms - last >= spacing);
                }
                last_in_lane[note.lane as usize] = Some(note.timestamp_ms);
            }
            prop_assert!(chart.bonus_note_count() <= chart.notes.len() / 8);
        }
    }
}
