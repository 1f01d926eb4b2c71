pub mod catalog;
pub mod chart;
pub mod engine;
pub mod progress;
pub mod settings;
pub mod stats;
