//! Hit, miss and bonus resolution.

use super::{ActiveBonus, JudgmentEngine, JudgmentEvent, JudgmentState};
use crate::models::chart::BonusType;
use crate::models::engine::{
    BASE_POINTS, CELEBRATION_MILESTONES, MAX_MULTIPLIER, MULTIPLIER_MILESTONES, NUM_LANES,
    SHIELD_CHARGES,
};
use crate::models::stats::Judgement;
use rand::Rng;

impl JudgmentEngine {
    /// Scores a hit. Perfect and good are worth the same; only the label differs.
    pub(crate) fn resolve_hit(
        &self,
        state: &mut JudgmentState,
        lane: u8,
        perfect: bool,
        events: &mut Vec<JudgmentEvent>,
    ) {
        let effective = if state.double_points_active {
            state.multiplier * 2
        } else {
            state.multiplier
        };
        state.score += BASE_POINTS * effective;

        if perfect {
            state.perfect_hits += 1;
            state.last_judgement = Some(Judgement::Perfect);
            events.push(JudgmentEvent::Perfect { lane });
        } else {
            state.good_hits += 1;
            state.last_judgement = Some(Judgement::Good);
            events.push(JudgmentEvent::Good { lane });
        }

        state.combo += 1;
        state.max_combo = state.max_combo.max(state.combo);

        for (combo, multiplier) in MULTIPLIER_MILESTONES {
            if state.combo == combo && state.multiplier < multiplier {
                state.multiplier = multiplier.min(MAX_MULTIPLIER);
                state.peak_multiplier = state.peak_multiplier.max(state.multiplier);
                events.push(JudgmentEvent::MultiplierUp {
                    multiplier: state.multiplier,
                });
            }
        }
        if CELEBRATION_MILESTONES.contains(&state.combo) {
            log::debug!("LOGIC: Combo {}", state.combo);
            events.push(JudgmentEvent::Milestone { combo: state.combo });
        }
    }

    pub(crate) fn miss_note(
        &self,
        state: &mut JudgmentState,
        lane: u8,
        events: &mut Vec<JudgmentEvent>,
    ) {
        state.last_offset_ms = None;
        if state.shield_charges > 0 {
            state.shield_charges -= 1;
            state.last_judgement = Some(Judgement::Shielded);
            events.push(JudgmentEvent::Shielded { lane });
            return;
        }

        state.missed_notes += 1;
        state.combo = 0;
        state.multiplier = 1;
        state.last_judgement = Some(Judgement::Miss);
        events.push(JudgmentEvent::Miss { lane });
    }

    /// Applies a collected power-up. A new timed bonus replaces the running one.
    pub(crate) fn collect_bonus(
        &self,
        state: &mut JudgmentState,
        bonus: BonusType,
        now_ms: i64,
        events: &mut Vec<JudgmentEvent>,
    ) {
        state.bonuses_collected += 1;
        log::debug!("LOGIC: {} collected at {} ms", bonus.label(), now_ms);

        if let Some(duration) = bonus.duration_ms() {
            state.clear_timed_effects();
            state.active_bonus = Some(ActiveBonus {
                kind: bonus,
                expires_at_ms: now_ms + duration,
            });
        }

        match bonus {
            BonusType::LightningLane => {
                state.lightning_lane = Some(state.rng.random_range(0..NUM_LANES) as u8);
            }
            BonusType::Shield => state.shield_charges = SHIELD_CHARGES,
            BonusType::DoublePoints => state.double_points_active = true,
            BonusType::MultiplierBoost => {
                state.multiplier = MAX_MULTIPLIER;
                state.peak_multiplier = MAX_MULTIPLIER;
                state.combo = state.combo.max(MULTIPLIER_MILESTONES[2].0);
                state.max_combo = state.max_combo.max(state.combo);
            }
            BonusType::NoteMagnet => state.note_magnet_active = true,
        }
        events.push(JudgmentEvent::BonusCollected { bonus });
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::chart;
    use super::*;
    use crate::models::chart::ChartNote;

    fn engine() -> JudgmentEngine {
        JudgmentEngine::new(chart(vec![ChartNote::tap(1_000, 0)]))
    }

    #[test]
    fn test_multiplier_follows_combo_milestones() {
        let engine = engine();
        let mut state = engine.new_state();
        let mut events = Vec::new();

        let mut multipliers = Vec::new();
        for _ in 0..40 {
            engine.resolve_hit(&mut state, 0, true, &mut events);
            multipliers.push(state.multiplier);
        }

        let mut expected = vec![1; 9];
        expected.extend([2; 10]);
        expected.extend([3; 10]);
        expected.extend([4; 11]);
        assert_eq!(multipliers, expected);
        assert_eq!(state.peak_multiplier, 4);
    }

    #[test]
    fn test_points_use_multiplier_before_milestone() {
        let engine = engine();
        let mut state = engine.new_state();
        let mut events = Vec::new();
        for _ in 0..10 {
            engine.resolve_hit(&mut state, 0, false, &mut events);
        }
        assert_eq!(state.score, 500);
        engine.resolve_hit(&mut state, 0, false, &mut events);
        assert_eq!(state.score, 600);
        assert_eq!(state.good_hits, 11);
    }

    #[test]
    fn test_celebrations_keep_multiplier() {
        let engine = engine();
        let mut state = engine.new_state();
        let mut events = Vec::new();
        for _ in 0..100 {
            engine.resolve_hit(&mut state, 0, true, &mut events);
        }
        let milestones: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                JudgmentEvent::Milestone { combo } => Some(*combo),
                _ => None,
            })
            .collect();
        assert_eq!(milestones, vec![50, 100]);
        assert_eq!(state.multiplier, 4);
        assert_eq!(state.max_combo, 100);
    }

    #[test]
    fn test_shield_absorbs_one_miss_per_charge() {
        let engine = engine();
        let mut state = engine.new_state();
        let mut events = Vec::new();
        for _ in 0..12 {
            engine.resolve_hit(&mut state, 0, true, &mut events);
        }
        state.shield_charges = 1;

        engine.miss_note(&mut state, 3, &mut events);
        assert_eq!(state.missed_notes, 0);
        assert_eq!(state.combo, 12);
        assert_eq!(state.multiplier, 2);
        assert_eq!(state.shield_charges, 0);
        assert_eq!(state.last_judgement, Some(Judgement::Shielded));
        assert_eq!(events.last(), Some(&JudgmentEvent::Shielded { lane: 3 }));

        engine.miss_note(&mut state, 3, &mut events);
        assert_eq!(state.missed_notes, 1);
        assert_eq!(state.combo, 0);
        assert_eq!(state.multiplier, 1);
        assert_eq!(state.max_combo, 12);
    }

    #[test]
    fn test_shield_does_not_stack() {
        let engine = engine();
        let mut state = engine.new_state();
        let mut events = Vec::new();
        engine.collect_bonus(&mut state, BonusType::Shield, 0, &mut events);
        engine.collect_bonus(&mut state, BonusType::Shield, 10, &mut events);
        assert_eq!(state.shield_charges, 2);
        assert_eq!(state.bonuses_collected, 2);
        assert_eq!(state.active_bonus, None);
    }

    #[test]
    fn test_double_points() {
        let engine = engine();
        let mut state = engine.new_state();
        let mut events = Vec::new();
        engine.collect_bonus(&mut state, BonusType::DoublePoints, 0, &mut events);
        engine.resolve_hit(&mut state, 0, true, &mut events);
        assert_eq!(state.score, 100);
    }

    #[test]
    fn test_multiplier_boost_is_consistent() {
        let engine = engine();
        let mut state = engine.new_state();
        let mut events = Vec::new();
        for _ in 0..5 {
            engine.resolve_hit(&mut state, 0, true, &mut events);
        }
        engine.collect_bonus(&mut state, BonusType::MultiplierBoost, 0, &mut events);
        assert_eq!(state.multiplier, 4);
        assert_eq!(state.combo, 30);
        assert_eq!(state.max_combo, 30);
        assert_eq!(state.active_bonus, None);

        engine.resolve_hit(&mut state, 0, true, &mut events);
        assert_eq!(state.multiplier, 4);

        engine.miss_note(&mut state, 0, &mut events);
        assert_eq!(state.multiplier, 1);
    }

    #[test]
    fn test_new_timed_bonus_replaces_old_one() {
        let engine = engine();
        let mut state = engine.new_state();
        let mut events = Vec::new();
        engine.collect_bonus(&mut state, BonusType::DoublePoints, 0, &mut events);
        engine.collect_bonus(&mut state, BonusType::NoteMagnet, 1_000, &mut events);

        assert!(!state.double_points_active);
        assert!(state.note_magnet_active);
        assert_eq!(
            state.active_bonus,
            Some(ActiveBonus {
                kind: BonusType::NoteMagnet,
                expires_at_ms: 4_000
            })
        );
    }
}
