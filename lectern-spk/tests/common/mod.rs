//! Shared fixtures: a provider that records calls instead of speaking

#![allow(dead_code)]

use lectern_spk::error::SpeechError;
use lectern_spk::{
    PlaybackEngine, PlaybackEvent, ProviderEvent, SpeechProvider, Utterance, UtteranceId, Voice,
};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Default)]
pub struct ProviderLog {
    pub spoken: Vec<Utterance>,
    pub cancels: usize,
    pub pauses: usize,
    pub resumes: usize,
}

impl ProviderLog {
    pub fn last(&self) -> &Utterance {
        self.spoken.last().expect("nothing spoken yet")
    }

    pub fn last_id(&self) -> UtteranceId {
        self.last().id
    }
}

pub struct RecordingProvider {
    log: Rc<RefCell<ProviderLog>>,
    available: bool,
    voices: Vec<Voice>,
    fail_speak: Option<String>,
}

impl RecordingProvider {
    pub fn new() -> (Self, Rc<RefCell<ProviderLog>>) {
        let log = Rc::new(RefCell::new(ProviderLog::default()));
        let provider = Self {
            log: log.clone(),
            available: true,
            voices: Vec::new(),
            fail_speak: None,
        };
        (provider, log)
    }

    pub fn unavailable() -> (Self, Rc<RefCell<ProviderLog>>) {
        let (mut provider, log) = Self::new();
        provider.available = false;
        (provider, log)
    }

    pub fn with_voices(mut self, voices: Vec<Voice>) -> Self {
        self.voices = voices;
        self
    }

    pub fn set_voices(&mut self, voices: Vec<Voice>) {
        self.voices = voices;
    }

    /// Make every `speak` call fail with `reason`
    pub fn fail_speak(&mut self, reason: Option<&str>) {
        self.fail_speak = reason.map(str::to_string);
    }
}

impl SpeechProvider for RecordingProvider {
    fn is_available(&self) -> bool {
        self.available
    }

    fn speak(&mut self, utterance: Utterance) -> Result<(), SpeechError> {
        if let Some(ref reason) = self.fail_speak {
            return Err(SpeechError::Provider(reason.clone()));
        }
        self.log.borrow_mut().spoken.push(utterance);
        Ok(())
    }

    fn cancel_current(&mut self) {
        self.log.borrow_mut().cancels += 1;
    }

    fn pause(&mut self) {
        self.log.borrow_mut().pauses += 1;
    }

    fn resume(&mut self) {
        self.log.borrow_mut().resumes += 1;
    }

    fn list_voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Subscribe a collector to the engine
pub fn collect_events<P: SpeechProvider>(
    engine: &mut PlaybackEngine<P>,
) -> Rc<RefCell<Vec<PlaybackEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    engine.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    events
}

pub fn started(id: UtteranceId) -> ProviderEvent {
    ProviderEvent::Started { utterance: id }
}

pub fn ended(id: UtteranceId) -> ProviderEvent {
    ProviderEvent::Ended { utterance: id }
}

pub fn count_ends(events: &[PlaybackEvent]) -> usize {
    events.iter().filter(|e| **e == PlaybackEvent::End).count()
}

pub fn errors(events: &[PlaybackEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::Error { reason } => Some(reason.clone()),
            _ => None,
        })
        .collect()
}
