//! lectern-spk: Sentence-level read-aloud playback
//!
//! Provides:
//! - Punctuation-based sentence segmentation
//! - A playback engine driving an injected speech provider one sentence at a time
//! - Voice catalog with change notifications
//! - Chapter sequencing with auto-advance
//! - espeak-ng and simulated providers

pub mod error;
pub mod config;
pub mod events;
pub mod segmenter;
pub mod voices;
pub mod providers;
pub mod engine;
pub mod sequencer;

pub use error::SpeechError;
pub use config::{ReaderConfig, EspeakConfig, SilentConfig, ProviderKind};
pub use events::{Listeners, PlaybackEvent, SubscriptionId};
pub use segmenter::segment;
pub use voices::{Voice, VoiceCatalog};
pub use providers::{ProviderEvent, SpeechProvider, Utterance, UtteranceId};
pub use engine::{EngineState, PlaybackEngine, PlaybackParams, Position};
pub use sequencer::{Chapter, ChapterChange, ChapterSequencer};
