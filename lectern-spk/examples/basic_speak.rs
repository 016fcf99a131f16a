//! Basic read-aloud example
//!
//! Reads a short passage with espeak-ng, or silently when espeak-ng is not
//! installed.

use lectern_spk::providers::native::EspeakProvider;
use lectern_spk::providers::silent::SilentProvider;
use lectern_spk::providers::event_channel;
use lectern_spk::{EspeakConfig, PlaybackEngine, PlaybackEvent, SpeechProvider};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let (tx, mut rx) = event_channel();
    let espeak = EspeakProvider::new(EspeakConfig::default(), tx.clone());
    let provider: Box<dyn SpeechProvider> = if espeak.is_available() {
        Box::new(espeak)
    } else {
        println!("espeak-ng not found, reading silently");
        Box::new(SilentProvider::new(180, tx))
    };

    let mut engine = PlaybackEngine::new(provider);
    engine.subscribe(|event| match event {
        PlaybackEvent::SentenceChange { sentence_index } => {
            println!("-> sentence {}", sentence_index + 1)
        }
        PlaybackEvent::Boundary { word, .. } => println!("   {}", word),
        PlaybackEvent::Error { reason } => eprintln!("error: {}", reason),
        PlaybackEvent::End => println!("Done."),
        _ => {}
    });

    let text = "Hello, I am a reader. I speak one sentence at a time! Can you hear me?";
    engine.load(text);
    println!("Loaded {} sentences", engine.position().total_sentences);

    while engine.is_playing() {
        match rx.recv().await {
            Some(event) => engine.handle_provider_event(event),
            None => break,
        }
    }

    Ok(())
}
