//! Sentence-level playback engine
//!
//! Owns the sentence queue and drives a `SpeechProvider` one sentence at a
//! time. Provider callbacks come back through `handle_provider_event`, tagged
//! with the utterance they belong to. Only the utterance currently in flight
//! is authoritative: anything else is either an expected cancellation
//! (triggered by `load`/`stop`/navigation) or a stale callback, and is
//! dropped.

use crate::events::{Listeners, PlaybackEvent, SubscriptionId};
use crate::providers::{ProviderEvent, SpeechProvider, Utterance, UtteranceId};
use crate::segmenter::segment;
use crate::voices::{Voice, VoiceCatalog};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::ops::RangeInclusive;
use tracing::{debug, info, warn};

pub const RATE_RANGE: RangeInclusive<f32> = 0.5..=3.0;
pub const PITCH_RANGE: RangeInclusive<f32> = 0.0..=2.0;

// Self-cancelled utterances whose `Cancelled` callback may still arrive
const MAX_PENDING_CANCELS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Idle,
    Playing,
    Paused,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EngineState::Idle => "idle",
            EngineState::Playing => "playing",
            EngineState::Paused => "paused",
        };
        f.write_str(name)
    }
}

/// Where the listener currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Position {
    pub sentence_index: usize,
    pub total_sentences: usize,
    /// Char offset of the last boundary within the current sentence
    pub char_index: usize,
}

/// Rate and pitch applied to the next submitted utterance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackParams {
    pub rate: f32,
    pub pitch: f32,
}

impl Default for PlaybackParams {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
        }
    }
}

impl PlaybackParams {
    /// Clamps into range; non-finite values are ignored
    pub fn set_rate(&mut self, rate: f32) -> f32 {
        if rate.is_finite() {
            self.rate = rate.clamp(*RATE_RANGE.start(), *RATE_RANGE.end());
        }
        self.rate
    }

    /// Clamps into range; non-finite values are ignored
    pub fn set_pitch(&mut self, pitch: f32) -> f32 {
        if pitch.is_finite() {
            self.pitch = pitch.clamp(*PITCH_RANGE.start(), *PITCH_RANGE.end());
        }
        self.pitch
    }
}

pub struct PlaybackEngine<P: SpeechProvider> {
    provider: P,
    voices: VoiceCatalog,
    listeners: Listeners<PlaybackEvent>,
    sentences: Vec<String>,
    state: EngineState,
    sentence_index: usize,
    char_index: usize,
    params: PlaybackParams,
    selected_voice: Option<String>,
    in_flight: Option<UtteranceId>,
    /// The current sentence finished while paused; `resume` moves past it
    current_finished: bool,
    cancelled: VecDeque<UtteranceId>,
    next_utterance: u64,
    unsupported_reported: bool,
}

impl<P: SpeechProvider> PlaybackEngine<P> {
    pub fn new(provider: P) -> Self {
        Self::with_params(provider, PlaybackParams::default(), None)
    }

    pub fn with_params(provider: P, params: PlaybackParams, voice: Option<String>) -> Self {
        let mut voices = VoiceCatalog::new();
        voices.refresh_from(&provider);

        let mut clamped = PlaybackParams::default();
        clamped.set_rate(params.rate);
        clamped.set_pitch(params.pitch);

        Self {
            provider,
            voices,
            listeners: Listeners::new(),
            sentences: Vec::new(),
            state: EngineState::Idle,
            sentence_index: 0,
            char_index: 0,
            params: clamped,
            selected_voice: voice,
            in_flight: None,
            current_finished: false,
            cancelled: VecDeque::new(),
            next_utterance: 0,
            unsupported_reported: false,
        }
    }

    /// Replace the queue with the sentences of `text` and start at the first
    pub fn load(&mut self, text: &str) {
        if !self.provider.is_available() {
            if !self.unsupported_reported {
                self.unsupported_reported = true;
                warn!("Speech provider '{}' is not available", self.provider.name());
                self.emit(PlaybackEvent::Error {
                    reason: format!("speech synthesis unavailable ({})", self.provider.name()),
                });
            }
            return;
        }

        self.cancel_in_flight();
        self.sentences = segment(text);
        self.sentence_index = 0;
        self.char_index = 0;
        self.current_finished = false;

        if self.sentences.is_empty() {
            debug!("Loaded text has no sentences, staying idle");
            self.state = EngineState::Idle;
            return;
        }

        info!("Loaded {} sentences", self.sentences.len());
        self.state = EngineState::Playing;
        self.submit_current();
    }

    pub fn pause(&mut self) {
        if self.state != EngineState::Playing {
            return;
        }
        if self.in_flight.is_some() {
            self.provider.pause();
        }
        self.state = EngineState::Paused;
        self.emit(PlaybackEvent::Pause);
    }

    pub fn resume(&mut self) {
        if self.state != EngineState::Paused {
            return;
        }
        self.state = EngineState::Playing;
        self.emit(PlaybackEvent::Resume);

        if self.in_flight.is_some() {
            self.provider.resume();
        } else if self.current_finished {
            self.current_finished = false;
            self.advance();
        } else if self.sentence_index < self.sentences.len() {
            // Nothing in flight after a provider error
            self.submit_current();
        } else {
            self.finish();
        }
    }

    pub fn stop(&mut self) {
        self.cancel_in_flight();
        if self.state != EngineState::Idle || !self.sentences.is_empty() {
            debug!("Stopping playback ({})", self.state);
        }
        self.sentences.clear();
        self.sentence_index = 0;
        self.char_index = 0;
        self.current_finished = false;
        self.state = EngineState::Idle;
    }

    pub fn next_sentence(&mut self) -> bool {
        match self.sentence_index.checked_add(1) {
            Some(target) => self.seek(target),
            None => false,
        }
    }

    pub fn previous_sentence(&mut self) -> bool {
        match self.sentence_index.checked_sub(1) {
            Some(target) => self.seek(target),
            None => false,
        }
    }

    /// Jump to `index` without changing Playing/Paused. Returns false, and
    /// does nothing, when idle or out of range.
    pub fn seek(&mut self, index: usize) -> bool {
        if self.state == EngineState::Idle || index >= self.sentences.len() {
            return false;
        }

        self.cancel_in_flight();
        self.sentence_index = index;
        self.submit_current();

        if self.state == EngineState::Paused && self.in_flight.is_some() {
            self.provider.pause();
        }
        true
    }

    pub fn set_rate(&mut self, rate: f32) -> f32 {
        self.params.set_rate(rate)
    }

    pub fn set_pitch(&mut self, pitch: f32) -> f32 {
        self.params.set_pitch(pitch)
    }

    /// Select a voice by id or name; `None` falls back to the provider default
    pub fn set_voice(&mut self, voice: Option<String>) {
        if let Some(ref key) = voice {
            if !self.voices.list().is_empty() && self.voices.find(key).is_none() {
                warn!("Voice '{}' not in catalog, provider default will be used", key);
            }
        }
        self.selected_voice = voice;
    }

    /// Entry point for every provider callback
    pub fn handle_provider_event(&mut self, event: ProviderEvent) {
        let id = match event.utterance() {
            Some(id) => id,
            None => {
                self.voices.refresh_from(&self.provider);
                return;
            }
        };

        if self.in_flight != Some(id) {
            if let ProviderEvent::Cancelled { .. } = event {
                if let Some(pos) = self.cancelled.iter().position(|c| *c == id) {
                    self.cancelled.remove(pos);
                    debug!("Expected cancellation of utterance {}", id);
                    return;
                }
            }
            debug!("Ignoring stale provider event for utterance {}", id);
            return;
        }

        match event {
            ProviderEvent::Started { .. } => {
                let sentence_index = self.sentence_index;
                self.emit(PlaybackEvent::Start { sentence_index });
                self.emit(PlaybackEvent::SentenceChange { sentence_index });
            }
            ProviderEvent::Boundary {
                char_index,
                char_length,
                ..
            } => {
                self.char_index = char_index;
                let word = self
                    .current_sentence()
                    .map(|s| word_at(s, char_index, char_length))
                    .unwrap_or_default();
                self.emit(PlaybackEvent::Boundary {
                    char_index,
                    char_length,
                    word,
                });
            }
            ProviderEvent::Ended { .. } => self.utterance_ended(),
            ProviderEvent::Failed { reason, .. } => self.utterance_failed(reason),
            ProviderEvent::Cancelled { .. } => {
                self.utterance_failed("utterance cancelled by provider".to_string())
            }
            ProviderEvent::VoicesChanged => {}
        }
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&PlaybackEvent) + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn position(&self) -> Position {
        Position {
            sentence_index: self.sentence_index,
            total_sentences: self.sentences.len(),
            char_index: self.char_index,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == EngineState::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.state == EngineState::Paused
    }

    pub fn rate(&self) -> f32 {
        self.params.rate
    }

    pub fn pitch(&self) -> f32 {
        self.params.pitch
    }

    pub fn params(&self) -> PlaybackParams {
        self.params
    }

    pub fn selected_voice(&self) -> Option<&str> {
        self.selected_voice.as_deref()
    }

    /// Voice the next utterance will use, `None` for the provider default
    pub fn effective_voice(&self) -> Option<&Voice> {
        self.selected_voice
            .as_deref()
            .and_then(|key| self.voices.find(key))
    }

    pub fn sentences(&self) -> &[String] {
        &self.sentences
    }

    pub fn current_sentence(&self) -> Option<&str> {
        self.sentences.get(self.sentence_index).map(String::as_str)
    }

    pub fn current_utterance(&self) -> Option<UtteranceId> {
        self.in_flight
    }

    pub fn voices(&self) -> &VoiceCatalog {
        &self.voices
    }

    pub fn voices_mut(&mut self) -> &mut VoiceCatalog {
        &mut self.voices
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    fn submit_current(&mut self) {
        let text = match self.sentences.get(self.sentence_index) {
            Some(text) => text.clone(),
            None => return,
        };

        self.next_utterance += 1;
        let id = UtteranceId(self.next_utterance);
        let utterance = Utterance {
            id,
            text,
            rate: self.params.rate,
            pitch: self.params.pitch,
            voice: self.effective_voice().cloned(),
        };

        debug!(
            "Submitting sentence {}/{} as utterance {}",
            self.sentence_index + 1,
            self.sentences.len(),
            id
        );
        self.char_index = 0;
        self.current_finished = false;
        self.in_flight = Some(id);

        if let Err(e) = self.provider.speak(utterance) {
            self.utterance_failed(e.to_string());
        }
    }

    fn cancel_in_flight(&mut self) {
        if let Some(id) = self.in_flight.take() {
            self.provider.cancel_current();
            if self.cancelled.len() == MAX_PENDING_CANCELS {
                self.cancelled.pop_front();
            }
            self.cancelled.push_back(id);
        }
    }

    fn utterance_ended(&mut self) {
        self.in_flight = None;

        match self.state {
            EngineState::Playing => self.advance(),
            EngineState::Paused => {
                // Position stays on the finished sentence until `resume`
                debug!("Sentence {} finished while paused", self.sentence_index + 1);
                self.current_finished = true;
            }
            EngineState::Idle => {}
        }
    }

    /// Submit the sentence after the current one, or finish the text
    fn advance(&mut self) {
        let next = self.sentence_index + 1;
        if next < self.sentences.len() {
            self.sentence_index = next;
            self.submit_current();
        } else {
            self.finish();
        }
    }

    fn utterance_failed(&mut self, reason: String) {
        warn!("Utterance failed at sentence {}: {}", self.sentence_index, reason);
        self.in_flight = None;
        let was_playing = self.state == EngineState::Playing;
        if was_playing {
            self.state = EngineState::Paused;
        }
        self.emit(PlaybackEvent::Error { reason });
        if was_playing {
            self.emit(PlaybackEvent::Pause);
        }
    }

    fn finish(&mut self) {
        info!("Reached end of text");
        self.sentence_index = self.sentences.len();
        self.char_index = 0;
        self.current_finished = false;
        self.state = EngineState::Idle;
        self.emit(PlaybackEvent::End);
    }

    fn emit(&mut self, event: PlaybackEvent) {
        self.listeners.emit(&event);
    }
}

/// Word at a char range of `sentence`; a zero length runs to the next space
fn word_at(sentence: &str, char_index: usize, char_length: usize) -> String {
    let rest = sentence.chars().skip(char_index);
    if char_length > 0 {
        rest.take(char_length).collect()
    } else {
        rest.take_while(|c| !c.is_whitespace()).collect()
    }
}
