//! Tempo-derived hit windows.

use crate::models::engine::constants::{
    HIT_WINDOW_BEAT_DIVISOR, MAGNET_HIT_SCALE, MAGNET_PERFECT_RATIO, PERFECT_WINDOW_RATIO,
};
use crate::models::stats::Judgement;

/// Used when a chart carries a nonsensical tempo.
const FALLBACK_BPM: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitWindow {
    /// Largest offset that still counts as a hit.
    pub hit_ms: f64,
    /// Largest offset that counts as a perfect hit.
    pub perfect_ms: f64,
}

impl HitWindow {
    /// Faster tracks get tighter windows.
    pub fn from_bpm(bpm: f64) -> Self {
        let bpm = if bpm.is_finite() && bpm > 0.0 {
            bpm
        } else {
            FALLBACK_BPM
        };
        let hit_ms = (60_000.0 / bpm / HIT_WINDOW_BEAT_DIVISOR).round();
        Self {
            hit_ms,
            perfect_ms: (hit_ms * PERFECT_WINDOW_RATIO).round(),
        }
    }

    /// The more forgiving windows used while a note magnet is active.
    pub fn with_magnet(&self) -> Self {
        Self {
            hit_ms: self.hit_ms * MAGNET_HIT_SCALE,
            perfect_ms: self.hit_ms * MAGNET_PERFECT_RATIO,
        }
    }

    /// Hit window rounded to whole milliseconds, for chart spacing.
    pub fn hit_ms_whole(&self) -> i64 {
        self.hit_ms.round() as i64
    }

    #[inline]
    pub fn contains(&self, offset_ms: i64) -> bool {
        offset_ms.unsigned_abs() as f64 <= self.hit_ms
    }

    /// Classifies a timing offset; `None` when outside the hit window.
    pub fn judge(&self, offset_ms: i64) -> Option<Judgement> {
        let distance = offset_ms.unsigned_abs() as f64;
        if distance <= self.perfect_ms {
            Some(Judgement::Perfect)
        } else if distance <= self.hit_ms {
            Some(Judgement::Good)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_at_120_bpm() {
        let w = HitWindow::from_bpm(120.0);
        assert_eq!(w.hit_ms, 143.0);
        assert_eq!(w.perfect_ms, 57.0);
    }

    #[test]
    fn test_faster_tracks_are_stricter() {
        let mut previous = HitWindow::from_bpm(40.0).hit_ms;
        for bpm in [60.0, 90.0, 120.0, 150.0, 180.0, 240.0] {
            let current = HitWindow::from_bpm(bpm).hit_ms;
            assert!(current < previous, "{bpm} BPM should be stricter");
            previous = current;
        }
    }

    #[test]
    fn test_magnet_is_more_forgiving() {
        let base = HitWindow::from_bpm(120.0);
        let magnet = base.with_magnet();
        assert_eq!(magnet.hit_ms, 214.5);
        assert!((magnet.perfect_ms - 114.4).abs() < 1e-9);
        assert!(magnet.hit_ms > base.hit_ms && magnet.perfect_ms > base.perfect_ms);
    }

    #[test]
    fn test_judge_boundaries() {
        let w = HitWindow::from_bpm(120.0);
        assert_eq!(w.judge(0), Some(Judgement::Perfect));
        assert_eq!(w.judge(-57), Some(Judgement::Perfect));
        assert_eq!(w.judge(58), Some(Judgement::Good));
        assert_eq!(w.judge(-143), Some(Judgement::Good));
        assert_eq!(w.judge(144), None);
    }

    #[test]
    fn test_invalid_bpm_falls_back() {
        assert_eq!(HitWindow::from_bpm(0.0), HitWindow::from_bpm(120.0));
        assert_eq!(HitWindow::from_bpm(f64::NAN), HitWindow::from_bpm(120.0));
    }
}
