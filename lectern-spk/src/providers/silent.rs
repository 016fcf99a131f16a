//! Timer-driven provider that renders nothing audible.
//!
//! Each word takes `60 / (words_per_minute * rate)` seconds and is announced
//! with a boundary event. Useful for demos, CI machines without a speech
//! engine, and driving the engine under a paused tokio clock.

use crate::error::SpeechError;
use crate::providers::{
    word_spans, ProviderEvent, ProviderEventSender, SpeechProvider, Utterance,
};
use crate::voices::Voice;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Shared between the provider and its rendering task
#[derive(Default)]
struct Progress {
    /// `Started` has been sent for this utterance
    started: bool,
    /// Index of the next word to render
    word: usize,
}

struct Simulation {
    utterance: Utterance,
    progress: Arc<Mutex<Progress>>,
    /// `None` while paused
    task: Option<JoinHandle<()>>,
}

pub struct SilentProvider {
    words_per_minute: u32,
    voices: Vec<Voice>,
    events: ProviderEventSender,
    current: Option<Simulation>,
}

impl SilentProvider {
    pub fn new(words_per_minute: u32, events: ProviderEventSender) -> Self {
        Self {
            words_per_minute: words_per_minute.max(1),
            voices: vec![Voice::new("silent", "Silent", "und")],
            events,
            current: None,
        }
    }

    pub fn with_voices(mut self, voices: Vec<Voice>) -> Self {
        self.voices = voices;
        self
    }

    /// Swap the voice list and announce it
    pub fn set_voices(&mut self, voices: Vec<Voice>) {
        self.voices = voices;
        let _ = self.events.send(ProviderEvent::VoicesChanged);
    }

    fn word_duration(&self, rate: f32) -> Duration {
        let words_per_second = self.words_per_minute as f64 * rate.max(0.1) as f64 / 60.0;
        Duration::from_secs_f64(1.0 / words_per_second)
    }

    fn spawn(&self, utterance: &Utterance, progress: Arc<Mutex<Progress>>) -> JoinHandle<()> {
        let id = utterance.id;
        let spans = word_spans(&utterance.text);
        let per_word = self.word_duration(utterance.rate);
        let events = self.events.clone();

        tokio::spawn(async move {
            let announce = !std::mem::replace(&mut progress.lock().started, true);
            if announce {
                let _ = events.send(ProviderEvent::Started { utterance: id });
            }

            loop {
                let next = progress.lock().word;
                let (char_index, char_length) = match spans.get(next) {
                    Some(span) => *span,
                    None => break,
                };
                let _ = events.send(ProviderEvent::Boundary {
                    utterance: id,
                    char_index,
                    char_length,
                });
                tokio::time::sleep(per_word).await;
                progress.lock().word += 1;
            }

            let _ = events.send(ProviderEvent::Ended { utterance: id });
        })
    }
}

impl SpeechProvider for SilentProvider {
    fn is_available(&self) -> bool {
        true
    }

    fn speak(&mut self, utterance: Utterance) -> Result<(), SpeechError> {
        if let Some(previous) = self.current.take() {
            if let Some(task) = previous.task {
                task.abort();
            }
        }

        let progress = Arc::new(Mutex::new(Progress::default()));
        let task = self.spawn(&utterance, progress.clone());
        self.current = Some(Simulation {
            utterance,
            progress,
            task: Some(task),
        });
        Ok(())
    }

    fn cancel_current(&mut self) {
        if let Some(simulation) = self.current.take() {
            let finished = match simulation.task {
                Some(task) => {
                    let finished = task.is_finished();
                    task.abort();
                    finished
                }
                None => false,
            };
            if !finished {
                let _ = self.events.send(ProviderEvent::Cancelled {
                    utterance: simulation.utterance.id,
                });
            }
        }
    }

    fn pause(&mut self) {
        if let Some(task) = self.current.as_mut().and_then(|s| s.task.take()) {
            task.abort();
        }
    }

    fn resume(&mut self) {
        let (utterance, progress) = match self.current.as_ref() {
            Some(simulation) if simulation.task.is_none() => {
                (simulation.utterance.clone(), simulation.progress.clone())
            }
            _ => return,
        };
        let task = self.spawn(&utterance, progress);
        if let Some(simulation) = self.current.as_mut() {
            simulation.task = Some(task);
        }
    }

    fn list_voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn name(&self) -> &str {
        "silent"
    }
}
