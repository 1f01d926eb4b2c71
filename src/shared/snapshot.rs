//! Read-only snapshots sent from the logic thread to the presentation layer.

use crate::models::chart::{BonusType, ChartNote};
use crate::models::stats::Judgement;

/// Everything a renderer needs to draw one frame of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct JudgmentSnapshot {
    /// Playback position in milliseconds.
    pub position_ms: i64,

    pub score: u32,
    pub combo: u32,
    pub max_combo: u32,
    pub multiplier: u32,
    pub perfect_hits: u32,
    pub good_hits: u32,
    pub missed_notes: u32,
    /// Accuracy over the notes judged so far.
    pub accuracy: f64,

    pub shield_charges: u32,
    /// Running timed bonus and its remaining time in ms.
    pub active_bonus: Option<(BonusType, i64)>,
    pub lightning_lane: Option<u8>,
    pub bonuses_collected: u32,

    /// Last hit judgement (for flash display).
    pub last_judgement: Option<Judgement>,
    pub last_offset_ms: Option<i64>,

    /// Unresolved notes within the look-ahead horizon.
    pub upcoming: Vec<ChartNote>,
    /// Smoothed spectral intensity per lane, cosmetic only.
    pub lane_bands: [f32; 5],
}

impl JudgmentSnapshot {
    /// One-line text HUD.
    pub fn hud_line(&self) -> String {
        let mut line = format!(
            "{:>6.1}s  score {:>7}  combo {:>4}  x{}  acc {:>6.2}%",
            self.position_ms as f64 / 1000.0,
            self.score,
            self.combo,
            self.multiplier,
            self.accuracy
        );
        if self.shield_charges > 0 {
            line.push_str(&format!("  shield {}", self.shield_charges));
        }
        if let Some((bonus, remaining)) = self.active_bonus {
            line.push_str(&format!("  {} {:.1}s", bonus.label(), remaining as f64 / 1000.0));
        }
        if let Some(j) = self.last_judgement {
            line.push_str(&format!("  {}", j.label()));
        }
        let bars: String = self
            .lane_bands
            .iter()
            .map(|b| match (b * 4.0).round() as u8 {
                0 => ' ',
                1 => '.',
                2 => ':',
                3 => '|',
                _ => '#',
            })
            .collect();
        line.push_str(&format!("  [{bars}]"));
        line
    }
}
