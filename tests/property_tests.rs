mod support;

use lectern_spk::{segment, EngineState, PlaybackEngine, PlaybackEvent, ProviderEvent, UtteranceId};
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;
use support::ScriptedProvider;

#[derive(Debug, Clone)]
enum Op {
    Load(String),
    Pause,
    Resume,
    Stop,
    Next,
    Previous,
    Seek(usize),
    EndCurrent,
    FailCurrent,
    StaleEnd(u64),
    SetRate(f32),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        "[A-Za-z ,.!?\n]{0,60}".prop_map(Op::Load),
        Just(Op::Pause),
        Just(Op::Resume),
        Just(Op::Stop),
        Just(Op::Next),
        Just(Op::Previous),
        (0usize..8).prop_map(Op::Seek),
        Just(Op::EndCurrent),
        Just(Op::EndCurrent),
        Just(Op::FailCurrent),
        (1000u64..2000).prop_map(Op::StaleEnd),
        (-1.0f32..5.0).prop_map(Op::SetRate),
    ]
}

proptest! {
    #[test]
    fn test_segments_are_trimmed_and_non_empty(text in "[A-Za-z0-9 ,.!?\t\n]{0,200}") {
        for sentence in segment(&text) {
            assert!(!sentence.is_empty());
            assert_eq!(sentence.trim(), sentence);
        }
    }

    #[test]
    fn test_segmentation_preserves_content(text in "[A-Za-zé ,.!?\n]{0,200}") {
        let strip = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
        let joined: String = segment(&text).iter().map(|s| strip(s)).collect();
        assert_eq!(joined, strip(&text));
    }

    #[test]
    fn test_every_sentence_but_last_is_terminated(text in "[A-Za-z .!?\n]{0,200}") {
        let sentences = segment(&text);
        if let Some((_, init)) = sentences.split_last() {
            for sentence in init {
                let last = sentence.chars().last().unwrap();
                assert!(matches!(last, '.' | '!' | '?'), "unterminated: {:?}", sentence);
            }
        }
    }

    #[test]
    fn test_blank_input_has_no_sentences(text in "[ \t\n\r]{0,40}") {
        assert!(segment(&text).is_empty());
    }

    #[test]
    fn test_load_matches_segmenter(text in "[A-Za-z ,.!?\n]{0,120}") {
        let mut engine = PlaybackEngine::new(ScriptedProvider::default());
        engine.load(&text);

        let expected = segment(&text).len();
        let position = engine.position();
        assert_eq!(position.total_sentences, expected);
        assert_eq!(position.sentence_index, 0);
        assert_eq!(engine.is_playing(), expected > 0);
    }

    #[test]
    fn test_command_sequences_keep_invariants(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let provider = ScriptedProvider::default();
        let spoken = provider.spoken.clone();
        let mut engine = PlaybackEngine::new(provider);

        let ends = Rc::new(RefCell::new(0usize));
        let sink = ends.clone();
        engine.subscribe(move |event| {
            if *event == PlaybackEvent::End {
                *sink.borrow_mut() += 1;
            }
        });

        let mut expected_total = 0;
        let mut loads = 0;

        for op in ops {
            let current = engine.current_utterance();
            match op {
                Op::Load(text) => {
                    expected_total = segment(&text).len();
                    loads += 1;
                    engine.load(&text);
                }
                Op::Pause => engine.pause(),
                Op::Resume => engine.resume(),
                Op::Stop => {
                    expected_total = 0;
                    engine.stop();
                }
                Op::Next => {
                    engine.next_sentence();
                }
                Op::Previous => {
                    engine.previous_sentence();
                }
                Op::Seek(index) => {
                    engine.seek(index);
                }
                Op::EndCurrent => {
                    if let Some(id) = current {
                        engine.handle_provider_event(ProviderEvent::Ended { utterance: id });
                    }
                }
                Op::FailCurrent => {
                    if let Some(id) = current {
                        engine.handle_provider_event(ProviderEvent::Failed {
                            utterance: id,
                            reason: "synthetic".to_string(),
                        });
                    }
                }
                Op::StaleEnd(id) => {
                    let before = engine.position();
                    let state = engine.state();
                    engine.handle_provider_event(ProviderEvent::Ended { utterance: UtteranceId(id) });
                    assert_eq!(engine.position(), before);
                    assert_eq!(engine.state(), state);
                }
                Op::SetRate(rate) => {
                    let applied = engine.set_rate(rate);
                    assert!((0.5..=3.0).contains(&applied));
                }
            }

            let position = engine.position();
            assert_eq!(position.total_sentences, expected_total);
            assert!(position.sentence_index <= position.total_sentences);
            // Only an idle engine sits past the last sentence
            if engine.state() != EngineState::Idle {
                assert!(position.sentence_index < position.total_sentences);
            }
            if engine.is_playing() {
                assert!(engine.current_utterance().is_some());
            }
            if let Some(id) = engine.current_utterance() {
                assert_eq!(spoken.borrow().last().map(|u| u.id), Some(id));
            }
            assert!(*ends.borrow() <= loads);
        }
    }
}
