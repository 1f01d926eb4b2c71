//! Engine configuration loaded from `lanebeat.toml`.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "lanebeat.toml";

/// Tuning of the onset analysis and bonus placement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Length of one analysis frame.
    pub analysis_frame_ms: u32,
    /// Multiplier applied to the local mean flux; higher means fewer onsets.
    pub onset_sensitivity: f32,
    /// Minimum gap between two detected onsets.
    pub min_onset_gap_ms: i64,
    /// Notes between two bonus candidates.
    pub bonus_interval: usize,
    /// Chance that a candidate actually becomes a bonus note.
    pub bonus_chance: f64,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            analysis_frame_ms: 10,
            onset_sensitivity: 1.5,
            min_onset_gap_ms: 90,
            bonus_interval: 24,
            bonus_chance: 0.5,
        }
    }
}

/// Asymmetric smoothing of the cosmetic lane bands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpectrumSettings {
    pub attack: f32,
    pub decay: f32,
}

impl Default for SpectrumSettings {
    fn default() -> Self {
        Self {
            attack: 0.6,
            decay: 0.12,
        }
    }
}

/// Keyboard mapping of the headless player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KeySettings {
    /// One key per lane, left to right.
    pub lanes: [char; 5],
    pub pause: char,
    pub resume: char,
    pub quit: char,
}

impl Default for KeySettings {
    fn default() -> Self {
        Self {
            lanes: ['d', 'f', 'g', 'j', 'k'],
            pause: 'p',
            resume: 'r',
            quit: 'q',
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub database_path: PathBuf,
    pub catalog_path: PathBuf,
    /// Tracks longer than this are refused before analysis.
    pub max_duration_ms: i64,
    pub tick_rate_hz: u32,
    pub master_volume: f32,
    pub generator: GeneratorSettings,
    pub spectrum: SpectrumSettings,
    pub keys: KeySettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/charts.db"),
            catalog_path: PathBuf::from("data/catalog.json"),
            max_duration_ms: 10 * 60 * 1000,
            tick_rate_hz: 60,
            master_volume: 0.8,
            generator: GeneratorSettings::default(),
            spectrum: SpectrumSettings::default(),
            keys: KeySettings::default(),
        }
    }
}

impl EngineConfig {
    /// Loads the config, falling back to defaults when the file is missing or broken.
    ///
    /// A missing file is created with the default values.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            let config = Self::default();
            if let Err(e) = config.save(path) {
                log::warn!("CONFIG: Could not write defaults to {:?}: {}", path, e);
            }
            return config;
        }

        match Self::read(path) {
            Ok(mut config) => {
                config.sanitize();
                config
            }
            Err(e) => {
                log::error!("CONFIG: Failed to load {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Puts out-of-range values back to their defaults.
    pub fn sanitize(&mut self) {
        let defaults = Self::default();

        let s = self.spectrum;
        let in_range = |v: f32| v > 0.0 && v <= 1.0;
        if !(in_range(s.attack) && in_range(s.decay) && s.attack > s.decay) {
            log::warn!(
                "CONFIG: spectrum attack {} / decay {} invalid, using defaults",
                s.attack,
                s.decay
            );
            self.spectrum = defaults.spectrum;
        }

        if self.tick_rate_hz == 0 {
            log::warn!("CONFIG: tick_rate_hz must be positive");
            self.tick_rate_hz = defaults.tick_rate_hz;
        }
        if self.max_duration_ms <= 0 {
            log::warn!("CONFIG: max_duration_ms must be positive");
            self.max_duration_ms = defaults.max_duration_ms;
        }
        if self.generator.analysis_frame_ms == 0 {
            self.generator.analysis_frame_ms = defaults.generator.analysis_frame_ms;
        }
        if self.generator.bonus_interval == 0 {
            self.generator.bonus_interval = defaults.generator.bonus_interval;
        }
        self.generator.bonus_chance = self.generator.bonus_chance.clamp(0.0, 1.0);
        self.master_volume = self.master_volume.clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("lanebeat.toml");

        let config = EngineConfig::load(&path);
        assert_eq!(config, EngineConfig::default());
        assert!(path.exists());
        assert_eq!(EngineConfig::read(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lanebeat.toml");
        fs::write(&path, "max_duration_ms = 120000\n[spectrum]\nattack = 0.9\n").unwrap();

        let config = EngineConfig::load(&path);
        assert_eq!(config.max_duration_ms, 120_000);
        assert_eq!(config.spectrum.attack, 0.9);
        assert_eq!(config.spectrum.decay, SpectrumSettings::default().decay);
        assert_eq!(config.tick_rate_hz, 60);
    }

    #[test]
    fn test_inverted_smoothing_is_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lanebeat.toml");
        fs::write(&path, "[spectrum]\nattack = 0.1\ndecay = 0.5\n").unwrap();

        let config = EngineConfig::load(&path);
        assert_eq!(config.spectrum, SpectrumSettings::default());
    }

    #[test]
    fn test_broken_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lanebeat.toml");
        fs::write(&path, "max_duration_ms = \"soon\"").unwrap();

        assert_eq!(EngineConfig::load(&path), EngineConfig::default());
    }
}
