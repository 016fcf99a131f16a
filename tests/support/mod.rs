//! Scripted provider shared by the cross-crate tests

#![allow(dead_code)]

use lectern_spk::error::SpeechError;
use lectern_spk::{SpeechProvider, Utterance, UtteranceId, Voice};
use std::cell::RefCell;
use std::rc::Rc;

/// Remembers what it was asked to speak; never calls back on its own
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    pub spoken: Rc<RefCell<Vec<Utterance>>>,
}

impl ScriptedProvider {
    pub fn last_id(&self) -> Option<UtteranceId> {
        self.spoken.borrow().last().map(|u| u.id)
    }
}

impl SpeechProvider for ScriptedProvider {
    fn is_available(&self) -> bool {
        true
    }

    fn speak(&mut self, utterance: Utterance) -> Result<(), SpeechError> {
        self.spoken.borrow_mut().push(utterance);
        Ok(())
    }

    fn cancel_current(&mut self) {}

    fn pause(&mut self) {}

    fn resume(&mut self) {}

    fn list_voices(&self) -> Vec<Voice> {
        vec![Voice::new("test", "Test Voice", "en")]
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
