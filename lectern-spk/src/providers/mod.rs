//! Speech synthesis providers

pub mod native;
pub mod silent;

use crate::error::SpeechError;
use crate::voices::Voice;
use serde::Serialize;
use tokio::sync::mpsc;

/// Identifies one submission of a sentence to a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UtteranceId(pub u64);

impl std::fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single sentence submitted for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    /// Playback rate, 1.0 is normal speed
    pub rate: f32,
    /// Pitch, 1.0 is the voice's natural pitch
    pub pitch: f32,
    /// `None` means the provider's default voice
    pub voice: Option<Voice>,
}

/// Lifecycle callback from a provider
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    Started { utterance: UtteranceId },
    Boundary {
        utterance: UtteranceId,
        char_index: usize,
        char_length: usize,
    },
    Ended { utterance: UtteranceId },
    Failed { utterance: UtteranceId, reason: String },
    Cancelled { utterance: UtteranceId },
    VoicesChanged,
}

impl ProviderEvent {
    /// Utterance the event refers to, if any
    pub fn utterance(&self) -> Option<UtteranceId> {
        match self {
            ProviderEvent::Started { utterance }
            | ProviderEvent::Boundary { utterance, .. }
            | ProviderEvent::Ended { utterance }
            | ProviderEvent::Failed { utterance, .. }
            | ProviderEvent::Cancelled { utterance } => Some(*utterance),
            ProviderEvent::VoicesChanged => None,
        }
    }
}

/// Channel a provider reports lifecycle events on
pub type ProviderEventSender = mpsc::UnboundedSender<ProviderEvent>;
pub type ProviderEventReceiver = mpsc::UnboundedReceiver<ProviderEvent>;

pub fn event_channel() -> (ProviderEventSender, ProviderEventReceiver) {
    mpsc::unbounded_channel()
}

/// Capability the playback engine drives.
///
/// Calls are fire-and-forget: outcomes arrive later as `ProviderEvent`s on
/// the channel the provider was built with.
pub trait SpeechProvider {
    /// Whether synthesis is possible at all in this environment
    fn is_available(&self) -> bool;

    /// Start rendering `utterance`. Only one utterance is in flight at a time.
    fn speak(&mut self, utterance: Utterance) -> Result<(), SpeechError>;

    fn cancel_current(&mut self);

    fn pause(&mut self);

    fn resume(&mut self);

    fn list_voices(&self) -> Vec<Voice>;

    fn name(&self) -> &str;
}

impl<P: SpeechProvider + ?Sized> SpeechProvider for Box<P> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn speak(&mut self, utterance: Utterance) -> Result<(), SpeechError> {
        (**self).speak(utterance)
    }

    fn cancel_current(&mut self) {
        (**self).cancel_current()
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn resume(&mut self) {
        (**self).resume()
    }

    fn list_voices(&self) -> Vec<Voice> {
        (**self).list_voices()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Word spans (char offset, char length) of `text`, split on whitespace
pub(crate) fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    let mut count = 0;

    for (i, c) in text.chars().enumerate() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                spans.push((s, i - s));
            }
        } else if start.is_none() {
            start = Some(i);
        }
        count = i + 1;
    }
    if let Some(s) = start {
        spans.push((s, count - s));
    }

    spans
}
