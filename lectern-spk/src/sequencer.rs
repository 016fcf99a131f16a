//! Chapter sequencing on top of the playback engine

use crate::engine::PlaybackEngine;
use crate::error::{Result, SpeechError};
use crate::events::{Listeners, PlaybackEvent, SubscriptionId};
use crate::providers::{ProviderEvent, SpeechProvider};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;
use tracing::info;

/// Chapter text supplied by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub text: String,
}

impl Chapter {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }
}

/// Notification that the sequencer switched chapters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterChange {
    pub index: usize,
    pub title: String,
    /// True when triggered by auto-advance rather than the host
    pub automatic: bool,
}

/// Owns the engine and moves through the host's chapter list.
///
/// The end-of-text subscription only raises a flag; the next chapter is
/// loaded once the provider event that caused it has been fully handled.
pub struct ChapterSequencer<P: SpeechProvider> {
    engine: PlaybackEngine<P>,
    chapters: Vec<Chapter>,
    current: usize,
    auto_advance: bool,
    finished: bool,
    end_pending: Rc<Cell<bool>>,
    end_subscription: SubscriptionId,
    listeners: Listeners<ChapterChange>,
}

impl<P: SpeechProvider> ChapterSequencer<P> {
    pub fn new(mut engine: PlaybackEngine<P>, chapters: Vec<Chapter>, auto_advance: bool) -> Self {
        let end_pending = Rc::new(Cell::new(false));
        let flag = end_pending.clone();
        let end_subscription = engine.subscribe(move |event| {
            if *event == PlaybackEvent::End {
                flag.set(true);
            }
        });

        Self {
            engine,
            chapters,
            current: 0,
            auto_advance,
            finished: false,
            end_pending,
            end_subscription,
            listeners: Listeners::new(),
        }
    }

    /// Host-initiated switch: stops the engine before loading `index`
    pub fn play_chapter(&mut self, index: usize) -> Result<()> {
        if index >= self.chapters.len() {
            return Err(SpeechError::ChapterOutOfRange {
                index,
                total: self.chapters.len(),
            });
        }
        self.engine.stop();
        // An end-of-text from the chapter being left no longer applies
        self.end_pending.set(false);
        self.switch_to(index, false);
        Ok(())
    }

    pub fn next_chapter(&mut self) -> Result<()> {
        self.play_chapter(self.current + 1)
    }

    pub fn previous_chapter(&mut self) -> Result<()> {
        match self.current.checked_sub(1) {
            Some(index) => self.play_chapter(index),
            None => Err(SpeechError::ChapterOutOfRange {
                index: 0,
                total: self.chapters.len(),
            }),
        }
    }

    /// Forward a provider callback to the engine, then act on end-of-text
    pub fn handle_provider_event(&mut self, event: ProviderEvent) {
        self.engine.handle_provider_event(event);
        if self.end_pending.replace(false) {
            self.chapter_ended();
        }
    }

    pub fn pause(&mut self) {
        self.engine.pause();
    }

    /// Resume the engine; a chapter whose last sentence already finished
    /// while paused ends here and advances like any other end.
    pub fn resume(&mut self) {
        self.engine.resume();
        self.poll();
    }

    /// Act on an end-of-text raised by a direct engine call made through
    /// `engine_mut()`.
    pub fn poll(&mut self) {
        if self.end_pending.replace(false) {
            self.chapter_ended();
        }
    }

    pub fn set_auto_advance(&mut self, enabled: bool) {
        self.auto_advance = enabled;
    }

    pub fn auto_advance(&self) -> bool {
        self.auto_advance
    }

    pub fn current_chapter(&self) -> usize {
        self.current
    }

    pub fn total_chapters(&self) -> usize {
        self.chapters.len()
    }

    pub fn chapter(&self, index: usize) -> Option<&Chapter> {
        self.chapters.get(index)
    }

    /// True once a chapter ended with nothing further to play
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn engine(&self) -> &PlaybackEngine<P> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut PlaybackEngine<P> {
        &mut self.engine
    }

    pub fn on_chapter_change<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&ChapterChange) + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn off_chapter_change(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Give the engine back, dropping the end-of-text subscription
    pub fn into_engine(mut self) -> PlaybackEngine<P> {
        self.engine.unsubscribe(self.end_subscription);
        self.engine
    }

    fn chapter_ended(&mut self) {
        let next = self.current + 1;
        if self.auto_advance && next < self.chapters.len() {
            info!("Auto-advancing to chapter {}", next + 1);
            self.switch_to(next, true);
        } else {
            info!("Playback finished at chapter {}", self.current + 1);
            self.finished = true;
        }
    }

    fn switch_to(&mut self, index: usize, automatic: bool) {
        self.current = index;
        self.finished = false;

        let chapter = &self.chapters[index];
        self.listeners.emit(&ChapterChange {
            index,
            title: chapter.title.clone(),
            automatic,
        });
        self.engine.load(&chapter.text);

        // Nothing to speak in this chapter: move straight on
        if automatic && self.engine.sentences().is_empty() {
            self.chapter_ended();
        }
    }
}
