//! Voice catalog

use crate::events::{Listeners, SubscriptionId};
use crate::providers::SpeechProvider;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A synthesis voice as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub id: String,
    pub name: String,
    /// BCP 47 style tag, e.g. "en-US"
    pub language: String,
}

impl Voice {
    pub fn new(id: impl Into<String>, name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            language: language.into(),
        }
    }

    /// A selection key matches either the id or the display name
    pub fn matches(&self, key: &str) -> bool {
        self.id == key || self.name.eq_ignore_ascii_case(key)
    }
}

/// Voices currently offered by the provider.
///
/// Providers may load voices lazily, so `list()` can be empty until the
/// first change notification.
#[derive(Default)]
pub struct VoiceCatalog {
    voices: Vec<Voice>,
    listeners: Listeners<Vec<Voice>>,
}

impl VoiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> &[Voice] {
        &self.voices
    }

    pub fn find(&self, key: &str) -> Option<&Voice> {
        self.voices.iter().find(|voice| voice.matches(key))
    }

    /// Re-query the provider; notifies subscribers if the list changed
    pub fn refresh_from<P: SpeechProvider + ?Sized>(&mut self, provider: &P) -> bool {
        self.replace(provider.list_voices())
    }

    /// Returns true if the list changed
    pub fn replace(&mut self, voices: Vec<Voice>) -> bool {
        if voices == self.voices {
            return false;
        }
        debug!("Voice catalog changed: {} -> {} voices", self.voices.len(), voices.len());
        self.voices = voices;
        self.listeners.emit(&self.voices);
        true
    }

    pub fn on_change<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&Vec<Voice>) + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn off_change(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }
}
