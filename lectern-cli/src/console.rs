// Lectern interactive console
// Line-oriented playback controls for the read-aloud engine

use lectern_spk::{
    ChapterChange, ChapterSequencer, EngineState, PlaybackEvent, ProviderEvent, SpeechProvider,
};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

/// A parsed console command. Sentence and chapter numbers are 0-based here;
/// users type them 1-based.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Resume,
    Stop,
    Next,
    Previous,
    Seek(usize),
    Chapter(usize),
    NextChapter,
    PreviousChapter,
    Rate(f32),
    Pitch(f32),
    Voice(Option<String>),
    Voices,
    Position,
    Auto(bool),
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let command = match parts.first() {
            Some(command) => command.to_lowercase(),
            None => return Err("Empty command".to_string()),
        };
        let arg = parts.get(1).copied();

        match command.as_str() {
            "play" | "p" => Ok(Command::Play),
            "pause" => Ok(Command::Pause),
            "resume" | "r" => Ok(Command::Resume),
            "stop" | "s" => Ok(Command::Stop),
            "next" | "n" => Ok(Command::Next),
            "prev" | "previous" => Ok(Command::Previous),
            "seek" => parse_number(arg, "seek <sentence>").map(Command::Seek),
            "chapter" | "ch" => parse_number(arg, "chapter <number>").map(Command::Chapter),
            "nextch" => Ok(Command::NextChapter),
            "prevch" => Ok(Command::PreviousChapter),
            "rate" => parse_float(arg, "rate <0.5-3.0>").map(Command::Rate),
            "pitch" => parse_float(arg, "pitch <0.0-2.0>").map(Command::Pitch),
            "voice" => match parts.get(1..) {
                Some(rest) if !rest.is_empty() => {
                    let key = rest.join(" ");
                    if key.eq_ignore_ascii_case("default") {
                        Ok(Command::Voice(None))
                    } else {
                        Ok(Command::Voice(Some(key)))
                    }
                }
                _ => Err("Usage: voice <id|name|default>".to_string()),
            },
            "voices" => Ok(Command::Voices),
            "pos" | "position" | "status" => Ok(Command::Position),
            "auto" => match arg.map(str::to_lowercase).as_deref() {
                Some("on") => Ok(Command::Auto(true)),
                Some("off") => Ok(Command::Auto(false)),
                _ => Err("Usage: auto <on|off>".to_string()),
            },
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(format!(
                "Unknown command: {}. Type 'help' for available commands.",
                other
            )),
        }
    }
}

fn parse_number(arg: Option<&str>, usage: &str) -> Result<usize, String> {
    match arg.and_then(|a| a.parse::<usize>().ok()) {
        Some(n) if n > 0 => Ok(n - 1),
        _ => Err(format!("Usage: {} (numbers start at 1)", usage)),
    }
}

fn parse_float(arg: Option<&str>, usage: &str) -> Result<f32, String> {
    arg.and_then(|a| a.parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("Usage: {}", usage))
}

pub enum CommandResult {
    Continue,
    Exit,
    Success(String),
    Error(String),
    Output(String),
}

#[derive(Serialize)]
struct Status<'a> {
    state: EngineState,
    chapter: usize,
    total_chapters: usize,
    sentence: usize,
    total_sentences: usize,
    rate: f32,
    pitch: f32,
    voice: Option<&'a str>,
    auto_advance: bool,
}

/// Wraps the sequencer and prints what the engine reports.
///
/// Listeners only queue events; they are printed after each provider event
/// or command, when the sequencer can be queried for context.
pub struct Console<P: SpeechProvider> {
    sequencer: ChapterSequencer<P>,
    pending: Rc<RefCell<Vec<PlaybackEvent>>>,
    chapter_changes: Rc<RefCell<Vec<ChapterChange>>>,
    json: bool,
    finish_reported: bool,
}

impl<P: SpeechProvider> Console<P> {
    pub fn new(mut sequencer: ChapterSequencer<P>, json: bool) -> Self {
        let pending = Rc::new(RefCell::new(Vec::new()));
        let sink = pending.clone();
        sequencer
            .engine_mut()
            .subscribe(move |event| sink.borrow_mut().push(event.clone()));

        let chapter_changes = Rc::new(RefCell::new(Vec::new()));
        let sink = chapter_changes.clone();
        sequencer.on_chapter_change(move |change| sink.borrow_mut().push(change.clone()));

        Self {
            sequencer,
            pending,
            chapter_changes,
            json,
            finish_reported: false,
        }
    }

    pub fn sequencer(&self) -> &ChapterSequencer<P> {
        &self.sequencer
    }

    pub fn start(&mut self, chapter: usize) -> anyhow::Result<()> {
        self.sequencer.play_chapter(chapter)?;
        self.flush();
        Ok(())
    }

    pub fn handle_provider_event(&mut self, event: ProviderEvent) {
        self.sequencer.handle_provider_event(event);
        self.flush();
    }

    /// Cancel whatever the provider is rendering
    pub fn shutdown(&mut self) {
        self.sequencer.engine_mut().stop();
    }

    /// Nothing is playing and nothing will start without a command
    pub fn is_done(&self) -> bool {
        self.sequencer.engine().state() != EngineState::Playing
    }

    pub fn execute_line(&mut self, line: &str) -> CommandResult {
        let line = line.trim();
        if line.is_empty() {
            return CommandResult::Continue;
        }
        let result = match line.parse::<Command>() {
            Ok(command) => self.execute(command),
            Err(e) => CommandResult::Error(e),
        };
        self.sequencer.poll();
        self.flush();
        result
    }

    pub fn execute(&mut self, command: Command) -> CommandResult {
        match command {
            Command::Play => {
                match self.sequencer.engine().state() {
                    EngineState::Paused => {
                        self.sequencer.resume();
                        CommandResult::Continue
                    }
                    EngineState::Playing => CommandResult::Continue,
                    EngineState::Idle => {
                        self.finish_reported = false;
                        let chapter = self.sequencer.current_chapter();
                        chapter_result(self.sequencer.play_chapter(chapter))
                    }
                }
            }
            Command::Pause => {
                self.sequencer.pause();
                CommandResult::Continue
            }
            Command::Resume => {
                self.sequencer.resume();
                CommandResult::Continue
            }
            Command::Stop => {
                self.sequencer.engine_mut().stop();
                CommandResult::Success("Stopped".to_string())
            }
            Command::Next => navigation_result(self.sequencer.engine_mut().next_sentence()),
            Command::Previous => {
                navigation_result(self.sequencer.engine_mut().previous_sentence())
            }
            Command::Seek(index) => navigation_result(self.sequencer.engine_mut().seek(index)),
            Command::Chapter(index) => {
                self.finish_reported = false;
                chapter_result(self.sequencer.play_chapter(index))
            }
            Command::NextChapter => {
                self.finish_reported = false;
                chapter_result(self.sequencer.next_chapter())
            }
            Command::PreviousChapter => {
                self.finish_reported = false;
                chapter_result(self.sequencer.previous_chapter())
            }
            Command::Rate(rate) => {
                let applied = self.sequencer.engine_mut().set_rate(rate);
                CommandResult::Success(format!("Rate {:.2} (from next sentence)", applied))
            }
            Command::Pitch(pitch) => {
                let applied = self.sequencer.engine_mut().set_pitch(pitch);
                CommandResult::Success(format!("Pitch {:.2} (from next sentence)", applied))
            }
            Command::Voice(voice) => {
                let engine = self.sequencer.engine_mut();
                engine.set_voice(voice);
                match (engine.selected_voice(), engine.effective_voice()) {
                    (None, _) => CommandResult::Success("Using provider default voice".to_string()),
                    (Some(_), Some(v)) => {
                        CommandResult::Success(format!("Voice set to {} ({})", v.name, v.id))
                    }
                    (Some(key), None) => CommandResult::Error(format!(
                        "Voice '{}' not found, provider default will be used",
                        key
                    )),
                }
            }
            Command::Voices => CommandResult::Output(self.format_voices()),
            Command::Position => CommandResult::Output(self.format_status()),
            Command::Auto(enabled) => {
                self.sequencer.set_auto_advance(enabled);
                CommandResult::Success(format!(
                    "Auto-advance {}",
                    if enabled { "on" } else { "off" }
                ))
            }
            Command::Help => CommandResult::Output(help_text()),
            Command::Quit => CommandResult::Exit,
        }
    }

    fn format_voices(&self) -> String {
        let engine = self.sequencer.engine();
        let voices = engine.voices().list();
        if voices.is_empty() {
            return "No voices reported by the provider".to_string();
        }
        let selected = engine.effective_voice().map(|v| v.id.as_str());
        let mut out = format!("{} voices:", voices.len());
        for voice in voices {
            let marker = if Some(voice.id.as_str()) == selected { "*" } else { " " };
            out.push_str(&format!(
                "\n {} {:<16} {:<28} {}",
                marker, voice.id, voice.name, voice.language
            ));
        }
        out
    }

    fn format_status(&self) -> String {
        let engine = self.sequencer.engine();
        let position = engine.position();
        let status = Status {
            state: engine.state(),
            chapter: self.sequencer.current_chapter() + 1,
            total_chapters: self.sequencer.total_chapters(),
            sentence: (position.sentence_index + 1).min(position.total_sentences),
            total_sentences: position.total_sentences,
            rate: engine.rate(),
            pitch: engine.pitch(),
            voice: engine.selected_voice(),
            auto_advance: self.sequencer.auto_advance(),
        };

        if self.json {
            return serde_json::to_string(&status).unwrap_or_default();
        }
        format!(
            "{} | chapter {}/{} | sentence {}/{} | rate {:.2} | pitch {:.2} | voice {} | auto-advance {}",
            status.state,
            status.chapter,
            status.total_chapters,
            status.sentence,
            status.total_sentences,
            status.rate,
            status.pitch,
            status.voice.unwrap_or("default"),
            if status.auto_advance { "on" } else { "off" }
        )
    }

    /// Print queued chapter changes and playback events
    fn flush(&mut self) {
        let changes: Vec<ChapterChange> = self.chapter_changes.borrow_mut().drain(..).collect();
        for change in changes {
            if self.json {
                println!("{}", serde_json::json!({ "type": "chapter_change", "chapter": change }));
            } else {
                let how = if change.automatic { " (auto)" } else { "" };
                println!("== {}{} ==", change.title, how);
            }
        }

        let events: Vec<PlaybackEvent> = self.pending.borrow_mut().drain(..).collect();
        for event in events {
            if self.json {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => tracing::warn!("Failed to encode event: {}", e),
                }
                continue;
            }
            match event {
                PlaybackEvent::SentenceChange { sentence_index } => {
                    let engine = self.sequencer.engine();
                    let text = engine.sentences().get(sentence_index).cloned().unwrap_or_default();
                    println!("[{}/{}] {}", sentence_index + 1, engine.sentences().len(), text);
                }
                PlaybackEvent::Pause => println!("⏸  Paused"),
                PlaybackEvent::Resume => println!("▶  Resumed"),
                PlaybackEvent::End => println!("End of chapter"),
                PlaybackEvent::Error { reason } => println!("❌ Error: {}", reason),
                PlaybackEvent::Start { .. } | PlaybackEvent::Boundary { .. } => {}
            }
        }

        if self.sequencer.is_finished() && !self.finish_reported {
            self.finish_reported = true;
            if !self.json {
                println!("Finished.");
            }
        }
    }
}

fn navigation_result(moved: bool) -> CommandResult {
    if moved {
        CommandResult::Continue
    } else {
        CommandResult::Error("No such sentence, or nothing loaded".to_string())
    }
}

fn chapter_result(result: lectern_spk::error::Result<()>) -> CommandResult {
    match result {
        Ok(()) => CommandResult::Continue,
        Err(e) => CommandResult::Error(e.to_string()),
    }
}

pub fn help_text() -> String {
    [
        "Available Commands:",
        "  play, p           - Start the current chapter, or resume",
        "  pause             - Pause playback",
        "  resume, r         - Resume playback",
        "  stop, s           - Stop and clear the queue",
        "  next, n / prev    - Next or previous sentence",
        "  seek <n>          - Jump to sentence n",
        "  chapter <n>       - Play chapter n",
        "  nextch / prevch   - Next or previous chapter",
        "  rate <x>          - Playback rate (0.5-3.0)",
        "  pitch <x>         - Pitch (0.0-2.0)",
        "  voice <name>      - Select a voice by id or name ('default' to reset)",
        "  voices            - List available voices",
        "  pos               - Show playback position",
        "  auto <on|off>     - Toggle chapter auto-advance",
        "  help, ?           - Show this help message",
        "  quit, q           - Exit",
    ]
    .join("\n")
}
