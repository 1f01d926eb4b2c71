//! Lane assignment for detected onsets.
//!
//! Brightness picks a preferred lane (dull sounds left, bright sounds right).
//! A lane stays blocked for one hit window after each note so that every note
//! can be hit on its own; blocked onsets move to the nearest free lane, or are
//! dropped when all five are busy.

use crate::models::engine::constants::NUM_LANES;

pub struct LaneAssigner {
    spacing_ms: i64,
    last_in_lane: [Option<i64>; NUM_LANES],
}

impl LaneAssigner {
    pub fn new(spacing_ms: i64) -> Self {
        Self {
            spacing_ms,
            last_in_lane: [None; NUM_LANES],
        }
    }

    pub fn preferred_lane(brightness: f32) -> usize {
        let scaled = (brightness.clamp(0.0, 1.0) * NUM_LANES as f32) as usize;
        scaled.min(NUM_LANES - 1)
    }

    /// Claims a lane for an event. Events must arrive in ascending time order.
    pub fn assign(&mut self, timestamp_ms: i64, brightness: f32) -> Option<u8> {
        let preferred = Self::preferred_lane(brightness) as i64;

        for distance in 0..NUM_LANES as i64 {
            for candidate in [preferred - distance, preferred + distance] {
                if candidate < 0 || candidate >= NUM_LANES as i64 {
                    continue;
                }
                let lane = candidate as usize;
                if self.is_free(lane, timestamp_ms) {
                    self.last_in_lane[lane] = Some(timestamp_ms);
                    return Some(lane as u8);
                }
            }
        }

        log::trace!("CHART: No free lane at {} ms, dropping event", timestamp_ms);
        None
    }

    fn is_free(&self, lane: usize, timestamp_ms: i64) -> bool {
        self.last_in_lane[lane].is_none_or(|last| timestamp_ms - last >= self.spacing_ms)
    }
}
