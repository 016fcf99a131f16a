//! Configuration for read-aloud playback

use crate::engine::{PlaybackParams, PITCH_RANGE, RATE_RANGE};
use crate::error::SpeechError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Reader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Speech provider backend
    pub provider: ProviderKind,

    /// Playback rate (0.5-3.0, default 1.0)
    pub rate: f32,

    /// Pitch (0.0-2.0, default 1.0)
    pub pitch: f32,

    /// Voice id or name; provider default when unset
    pub voice: Option<String>,

    /// Continue with the next chapter when one finishes
    pub auto_advance: bool,

    /// espeak-ng settings
    pub espeak: EspeakConfig,

    /// Simulated provider settings
    pub silent: SilentConfig,
}

/// Provider backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// espeak-ng via command line
    Espeak,
    /// Timer-driven simulation, no audio
    Silent,
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "espeak" | "espeak-ng" => Ok(ProviderKind::Espeak),
            "silent" => Ok(ProviderKind::Silent),
            other => Err(format!("Unknown provider '{}' (expected espeak or silent)", other)),
        }
    }
}

/// espeak-ng configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EspeakConfig {
    /// Executable name or path
    pub program: String,

    /// Words per minute at rate 1.0 (80-450)
    pub words_per_minute: u32,

    /// Amplitude (0.0-1.0, default 0.8)
    pub volume: f32,
}

/// Simulated provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SilentConfig {
    /// Words per minute at rate 1.0
    pub words_per_minute: u32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Espeak,
            rate: 1.0,
            pitch: 1.0,
            voice: None,
            auto_advance: true,
            espeak: EspeakConfig::default(),
            silent: SilentConfig::default(),
        }
    }
}

impl Default for EspeakConfig {
    fn default() -> Self {
        Self {
            program: "espeak-ng".to_string(),
            words_per_minute: 175,
            volume: 0.8,
        }
    }
}

impl Default for SilentConfig {
    fn default() -> Self {
        Self {
            words_per_minute: 180,
        }
    }
}

impl EspeakConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.program.is_empty() {
            return Err("espeak program cannot be empty".to_string());
        }

        if self.program.chars().any(|c| c == '\0' || c.is_control()) {
            return Err("espeak program contains invalid characters".to_string());
        }

        if !(80..=450).contains(&self.words_per_minute) {
            return Err("espeak words per minute must be between 80 and 450".to_string());
        }

        if !(0.0..=1.0).contains(&self.volume) {
            return Err("Volume must be between 0.0 and 1.0".to_string());
        }

        Ok(())
    }
}

impl ReaderConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !RATE_RANGE.contains(&self.rate) {
            return Err(format!(
                "Rate must be between {} and {}",
                RATE_RANGE.start(),
                RATE_RANGE.end()
            ));
        }

        if !PITCH_RANGE.contains(&self.pitch) {
            return Err(format!(
                "Pitch must be between {} and {}",
                PITCH_RANGE.start(),
                PITCH_RANGE.end()
            ));
        }

        if let Some(ref voice) = self.voice {
            if voice.is_empty() {
                return Err("Voice cannot be empty if provided".to_string());
            }

            if voice.len() > 256 {
                return Err("Voice name too long (max 256 chars)".to_string());
            }

            if voice.chars().any(|c| c == '\0' || c.is_control()) {
                return Err("Voice name contains invalid characters".to_string());
            }
        }

        self.espeak.validate()?;

        if self.silent.words_per_minute == 0 || self.silent.words_per_minute > 1000 {
            return Err("Silent words per minute must be between 1 and 1000".to_string());
        }

        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, SpeechError> {
        let config: ReaderConfig = toml::from_str(source)?;
        config.validate().map_err(SpeechError::Config)?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SpeechError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn playback_params(&self) -> PlaybackParams {
        PlaybackParams {
            rate: self.rate,
            pitch: self.pitch,
        }
    }
}
