// Lectern Command Line Interface
// Reads chapter files aloud, one sentence at a time

mod console;

use anyhow::{bail, Context};
use clap::Parser;
use console::{CommandResult, Console};
use lectern_spk::providers::native::EspeakProvider;
use lectern_spk::providers::silent::SilentProvider;
use lectern_spk::providers::{event_channel, ProviderEventSender};
use lectern_spk::{
    Chapter, ChapterSequencer, PlaybackEngine, ProviderKind, ReaderConfig, SpeechProvider,
};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lectern")]
#[command(about = "Lectern - read text aloud sentence by sentence", long_about = None)]
#[command(version)]
struct Cli {
    /// Chapter text files, played in order
    #[arg(required_unless_present = "list_voices")]
    chapters: Vec<PathBuf>,

    /// Configuration file path (TOML)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Speech provider (espeak, silent)
    #[arg(long)]
    provider: Option<ProviderKind>,

    /// Playback rate (0.5-3.0)
    #[arg(long)]
    rate: Option<f32>,

    /// Pitch (0.0-2.0)
    #[arg(long)]
    pitch: Option<f32>,

    /// Voice id or name
    #[arg(long)]
    voice: Option<String>,

    /// Stop at the end of each chapter
    #[arg(long)]
    no_auto_advance: bool,

    /// Chapter to start from (1-based)
    #[arg(long, default_value = "1")]
    start_chapter: usize,

    /// List the provider's voices and exit
    #[arg(long)]
    list_voices: bool,

    /// Print playback events as JSON lines
    #[arg(long)]
    json: bool,

    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbosity flag
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;
    let (events_tx, mut events_rx) = event_channel();
    let provider = build_provider(&config, events_tx);

    if cli.list_voices {
        list_voices(provider.as_ref());
        return Ok(());
    }

    let chapters = read_chapters(&cli.chapters)?;
    let start = match cli.start_chapter.checked_sub(1) {
        Some(index) if index < chapters.len() => index,
        _ => bail!(
            "--start-chapter must be between 1 and {}",
            chapters.len()
        ),
    };

    info!(
        "Reading {} chapter(s) with provider '{}'",
        chapters.len(),
        provider.name()
    );

    let engine = PlaybackEngine::with_params(provider, config.playback_params(), config.voice.clone());
    let sequencer = ChapterSequencer::new(engine, chapters, config.auto_advance);
    let mut console = Console::new(sequencer, cli.json);

    if !cli.json {
        print_banner(&console);
    }
    console.start(start)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut interactive = true;

    loop {
        tokio::select! {
            event = events_rx.recv() => match event {
                Some(event) => console.handle_provider_event(event),
                None => break,
            },
            line = lines.next_line(), if interactive => match line? {
                Some(line) => match console.execute_line(&line) {
                    CommandResult::Exit => break,
                    CommandResult::Continue => {}
                    CommandResult::Success(msg) => println!("✅ {}", msg),
                    CommandResult::Error(msg) => println!("❌ Error: {}", msg),
                    CommandResult::Output(output) => println!("{}", output),
                },
                None => {
                    debug!("stdin closed, playing to the end");
                    interactive = false;
                }
            },
        }

        if !interactive && console.is_done() {
            break;
        }
    }

    console.shutdown();
    Ok(())
}

/// File config first, then command-line overrides
fn load_config(cli: &Cli) -> anyhow::Result<ReaderConfig> {
    let mut config = match cli.config {
        Some(ref path) => ReaderConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ReaderConfig::default(),
    };

    if let Some(provider) = cli.provider {
        config.provider = provider;
    }
    if let Some(rate) = cli.rate {
        config.rate = rate;
    }
    if let Some(pitch) = cli.pitch {
        config.pitch = pitch;
    }
    if let Some(ref voice) = cli.voice {
        config.voice = Some(voice.clone());
    }
    if cli.no_auto_advance {
        config.auto_advance = false;
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    Ok(config)
}

fn build_provider(config: &ReaderConfig, events: ProviderEventSender) -> Box<dyn SpeechProvider> {
    match config.provider {
        ProviderKind::Espeak => Box::new(EspeakProvider::new(config.espeak.clone(), events)),
        ProviderKind::Silent => {
            Box::new(SilentProvider::new(config.silent.words_per_minute, events))
        }
    }
}

fn read_chapters(paths: &[PathBuf]) -> anyhow::Result<Vec<Chapter>> {
    paths
        .iter()
        .map(|path| {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read chapter {}", path.display()))?;
            Ok(Chapter::new(chapter_title(path), text))
        })
        .collect()
}

fn chapter_title(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn list_voices(provider: &dyn SpeechProvider) {
    if !provider.is_available() {
        println!("❌ Provider '{}' is not available", provider.name());
        return;
    }
    let voices = provider.list_voices();
    println!("{} voice(s) from '{}':", voices.len(), provider.name());
    for voice in voices {
        println!("  {:<16} {:<28} {}", voice.id, voice.name, voice.language);
    }
}

fn print_banner<P: SpeechProvider>(console: &Console<P>) {
    let sequencer = console.sequencer();
    println!();
    println!("Lectern - {} chapter(s), provider '{}'", sequencer.total_chapters(), sequencer.engine().provider().name());
    println!("Type 'help' for available commands, 'quit' to exit");
    println!();
}
