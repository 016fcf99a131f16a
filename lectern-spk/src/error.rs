//! Error types for lectern-spk

use thiserror::Error;

/// Speech playback errors
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Speech synthesis unsupported: {0}")]
    Unsupported(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Chapter {index} out of range ({total} chapters)")]
    ChapterOutOfRange { index: usize, total: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SpeechError>;
