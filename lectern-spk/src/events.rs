//! Playback events and the listener registry they are delivered through

use serde::Serialize;

/// Event emitted by the playback engine
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlaybackEvent {
    /// Provider began rendering the sentence at `sentence_index`
    Start { sentence_index: usize },
    /// The sentence being rendered changed
    SentenceChange { sentence_index: usize },
    Pause,
    Resume,
    /// Natural end of the loaded text
    End,
    /// Provider failure or unexpected cancellation; followed by `Pause`
    /// when it interrupted playback
    Error { reason: String },
    /// Provider reached a word inside the current sentence
    Boundary {
        char_index: usize,
        char_length: usize,
        word: String,
    },
}

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Ordered observer registry.
///
/// Listeners are invoked in subscription order. Not thread-safe: everything
/// runs on the host's event thread.
pub struct Listeners<E> {
    next_id: u64,
    entries: Vec<(SubscriptionId, Box<dyn FnMut(&E)>)>,
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&E) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(listener)));
        id
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub fn emit(&mut self, event: &E) {
        for (_, listener) in self.entries.iter_mut() {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_emit_in_subscription_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut listeners: Listeners<u32> = Listeners::new();

        let a = seen.clone();
        listeners.subscribe(move |e| a.borrow_mut().push(("a", *e)));
        let b = seen.clone();
        listeners.subscribe(move |e| b.borrow_mut().push(("b", *e)));

        listeners.emit(&7);
        assert_eq!(*seen.borrow(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn test_unsubscribe() {
        let count = Rc::new(RefCell::new(0));
        let mut listeners: Listeners<()> = Listeners::new();

        let c = count.clone();
        let id = listeners.subscribe(move |_| *c.borrow_mut() += 1);
        listeners.emit(&());
        assert!(listeners.unsubscribe(id));
        assert!(!listeners.unsubscribe(id));
        listeners.emit(&());

        assert_eq!(*count.borrow(), 1);
        assert!(listeners.is_empty());
    }
}
