//! Judgement labels, accuracy and letter grades.

use std::fmt;

/// Feedback label of a resolved note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Judgement {
    /// Inside the perfect window.
    Perfect,
    /// Inside the hit window.
    Good,
    /// Note left the hit window without a tap.
    Miss,
    /// Miss absorbed by a shield charge (combo kept).
    Shielded,
}

impl Judgement {
    pub fn label(self) -> &'static str {
        match self {
            Judgement::Perfect => "PERFECT",
            Judgement::Good => "GOOD",
            Judgement::Miss => "MISS",
            Judgement::Shielded => "SHIELDED",
        }
    }
}

/// End-of-run letter grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum Grade {
    S,
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Maps an accuracy percentage (0-100) to a grade.
    pub fn from_accuracy(accuracy: f64) -> Self {
        if accuracy >= 95.0 {
            Grade::S
        } else if accuracy >= 90.0 {
            Grade::A
        } else if accuracy >= 80.0 {
            Grade::B
        } else if accuracy >= 70.0 {
            Grade::C
        } else if accuracy >= 60.0 {
            Grade::D
        } else {
            Grade::F
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Grade::S => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        write!(f, "{letter}")
    }
}

/// Percentage of notes hit (perfect or good). Zero for an empty chart.
pub fn calculate_accuracy(hits: u32, total_notes: u32) -> f64 {
    if total_notes == 0 {
        return 0.0;
    }
    hits as f64 / total_notes as f64 * 100.0
}
