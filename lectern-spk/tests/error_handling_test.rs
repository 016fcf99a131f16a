//! Tests for provider errors, cancellations and stale callbacks

mod common;

use common::*;
use lectern_spk::{EngineState, PlaybackEngine, PlaybackEvent, ProviderEvent, UtteranceId};

const THREE: &str = "One. Two. Three.";

#[test]
fn test_expected_cancellations_are_swallowed() {
    let (provider, log) = RecordingProvider::new();
    let mut engine = PlaybackEngine::new(provider);
    let events = collect_events(&mut engine);

    engine.load(THREE);
    let first = log.borrow().last_id();
    engine.next_sentence();
    let second = log.borrow().last_id();
    engine.stop();

    engine.handle_provider_event(ProviderEvent::Cancelled { utterance: first });
    engine.handle_provider_event(ProviderEvent::Cancelled { utterance: second });

    assert!(errors(&events.borrow()).is_empty());
    assert_eq!(engine.state(), EngineState::Idle);
}

#[test]
fn test_stale_callbacks_are_ignored() {
    let (provider, log) = RecordingProvider::new();
    let mut engine = PlaybackEngine::new(provider);
    let events = collect_events(&mut engine);

    engine.load(THREE);
    let old = log.borrow().last_id();
    engine.seek(2);

    // Late callbacks from the utterance that was skipped
    engine.handle_provider_event(started(old));
    engine.handle_provider_event(ProviderEvent::Boundary {
        utterance: old,
        char_index: 0,
        char_length: 3,
    });
    engine.handle_provider_event(ended(old));
    engine.handle_provider_event(ProviderEvent::Failed {
        utterance: old,
        reason: "late".to_string(),
    });
    engine.handle_provider_event(ended(UtteranceId(999)));

    assert!(events.borrow().is_empty());
    assert_eq!(engine.position().sentence_index, 2);
    assert!(engine.is_playing());
}

#[test]
fn test_provider_failure_preserves_position() {
    let (provider, log) = RecordingProvider::new();
    let mut engine = PlaybackEngine::new(provider);
    let events = collect_events(&mut engine);

    engine.load(THREE);
    let id = log.borrow().last_id();
    engine.handle_provider_event(ended(id));

    let id = log.borrow().last_id();
    engine.handle_provider_event(ProviderEvent::Failed {
        utterance: id,
        reason: "voice unavailable".to_string(),
    });

    assert_eq!(errors(&events.borrow()), vec!["voice unavailable".to_string()]);
    // The move to Paused is announced after the error
    assert_eq!(
        *events.borrow(),
        vec![
            PlaybackEvent::Error { reason: "voice unavailable".to_string() },
            PlaybackEvent::Pause,
        ]
    );
    assert_eq!(engine.position().sentence_index, 1);
    assert_eq!(engine.position().total_sentences, 3);
    assert!(engine.is_paused());
    assert!(engine.current_utterance().is_none());

    // No automatic retry
    assert_eq!(log.borrow().spoken.len(), 2);

    // Manual retry resubmits the same sentence
    engine.resume();
    assert!(engine.is_playing());
    assert_eq!(log.borrow().spoken.len(), 3);
    assert_eq!(log.borrow().last().text, "Two.");
    assert_eq!(log.borrow().resumes, 0);
}

#[test]
fn test_failure_then_next_sentence() {
    let (provider, log) = RecordingProvider::new();
    let mut engine = PlaybackEngine::new(provider);

    engine.load(THREE);
    let id = log.borrow().last_id();
    engine.handle_provider_event(ProviderEvent::Failed {
        utterance: id,
        reason: "synthesis failed".to_string(),
    });
    let cancels = log.borrow().cancels;

    assert!(engine.next_sentence());
    assert_eq!(engine.position().sentence_index, 1);
    assert_eq!(log.borrow().last().text, "Two.");
    // Nothing was in flight, so nothing to cancel
    assert_eq!(log.borrow().cancels, cancels);
    assert!(engine.is_paused());
}

#[test]
fn test_unexpected_cancellation_is_an_error() {
    let (provider, log) = RecordingProvider::new();
    let mut engine = PlaybackEngine::new(provider);
    let events = collect_events(&mut engine);

    engine.load(THREE);
    let id = log.borrow().last_id();
    engine.handle_provider_event(ProviderEvent::Cancelled { utterance: id });

    assert_eq!(errors(&events.borrow()).len(), 1);
    assert!(engine.is_paused());
    assert_eq!(engine.position().sentence_index, 0);
}

#[test]
fn test_unsupported_environment_reported_once() {
    let (provider, log) = RecordingProvider::unavailable();
    let mut engine = PlaybackEngine::new(provider);
    let events = collect_events(&mut engine);

    engine.load(THREE);
    engine.load(THREE);

    assert_eq!(errors(&events.borrow()).len(), 1);
    assert!(errors(&events.borrow())[0].contains("unavailable"));
    assert_eq!(engine.state(), EngineState::Idle);
    assert!(log.borrow().spoken.is_empty());
}

#[test]
fn test_speak_rejection_is_reported() {
    let (mut provider, _log) = RecordingProvider::new();
    provider.fail_speak(Some("engine busy"));
    let mut engine = PlaybackEngine::new(provider);
    let events = collect_events(&mut engine);

    engine.load(THREE);

    let reported = errors(&events.borrow());
    assert_eq!(reported.len(), 1);
    assert!(reported[0].contains("engine busy"));
    assert!(engine.is_paused());
    assert_eq!(engine.position().total_sentences, 3);

    engine.provider_mut().fail_speak(None);
    engine.resume();
    assert!(engine.is_playing());
    assert!(engine.current_utterance().is_some());
}

#[test]
fn test_end_while_paused_continues_on_resume() {
    let (provider, log) = RecordingProvider::new();
    let mut engine = PlaybackEngine::new(provider);
    let events = collect_events(&mut engine);

    engine.load(THREE);
    let id = log.borrow().last_id();
    engine.pause();
    engine.handle_provider_event(ended(id));

    // Position stays on the sentence that was heard
    assert!(engine.is_paused());
    assert_eq!(engine.position().sentence_index, 0);
    assert_eq!(engine.current_sentence(), Some("One."));
    assert_eq!(log.borrow().spoken.len(), 1);

    engine.resume();
    assert_eq!(engine.position().sentence_index, 1);
    assert_eq!(log.borrow().last().text, "Two.");
    assert_eq!(count_ends(&events.borrow()), 0);
}

#[test]
fn test_next_after_end_while_paused_goes_to_the_following_sentence() {
    let (provider, log) = RecordingProvider::new();
    let mut engine = PlaybackEngine::new(provider);

    engine.load(THREE);
    let id = log.borrow().last_id();
    engine.pause();
    engine.handle_provider_event(ended(id));

    assert!(engine.next_sentence());
    assert!(engine.is_paused());
    assert_eq!(engine.position().sentence_index, 1);
    assert_eq!(log.borrow().last().text, "Two.");

    engine.resume();
    assert!(engine.is_playing());
    assert_eq!(log.borrow().spoken.len(), 2);
    assert_eq!(log.borrow().resumes, 1);
}

#[test]
fn test_previous_after_end_while_paused_replays_the_sentence_before() {
    let (provider, log) = RecordingProvider::new();
    let mut engine = PlaybackEngine::new(provider);

    engine.load(THREE);
    let id = log.borrow().last_id();
    engine.handle_provider_event(ended(id));
    let id = log.borrow().last_id();
    engine.pause();
    engine.handle_provider_event(ended(id));

    assert_eq!(engine.position().sentence_index, 1);
    assert!(engine.previous_sentence());
    assert_eq!(engine.position().sentence_index, 0);
    assert_eq!(log.borrow().last().text, "One.");
}

#[test]
fn test_end_while_paused_on_last_sentence() {
    let (provider, log) = RecordingProvider::new();
    let mut engine = PlaybackEngine::new(provider);
    let events = collect_events(&mut engine);

    engine.load("Just this.");
    let id = log.borrow().last_id();
    engine.pause();
    engine.handle_provider_event(ended(id));
    assert_eq!(count_ends(&events.borrow()), 0);

    engine.resume();
    assert_eq!(engine.state(), EngineState::Idle);
    assert_eq!(count_ends(&events.borrow()), 1);
    assert_eq!(
        events.borrow().last(),
        Some(&PlaybackEvent::End)
    );
}

#[test]
fn test_errors_never_corrupt_bookkeeping() {
    let (provider, log) = RecordingProvider::new();
    let mut engine = PlaybackEngine::new(provider);

    engine.load(THREE);
    for _ in 0..5 {
        let id = log.borrow().last_id();
        engine.handle_provider_event(ProviderEvent::Failed {
            utterance: id,
            reason: "flaky".to_string(),
        });
        engine.resume();
    }

    let position = engine.position();
    assert_eq!(position.sentence_index, 0);
    assert_eq!(position.total_sentences, 3);
    assert!(engine.is_playing());
}
