//! espeak-ng provider
//!
//! One child process per utterance. Text is fed on stdin so it is never
//! parsed as command-line options. espeak-ng cannot suspend mid-sentence, so
//! pause kills the child and resume renders the sentence again from its start.

use crate::config::EspeakConfig;
use crate::error::SpeechError;
use crate::providers::{ProviderEvent, ProviderEventSender, SpeechProvider, Utterance};
use crate::voices::Voice;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

const MAX_UTTERANCE_CHARS: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Cancel,
    Pause,
}

struct Rendering {
    utterance: Utterance,
    /// `None` while paused (no child running)
    stop: Option<oneshot::Sender<StopReason>>,
}

pub struct EspeakProvider {
    config: EspeakConfig,
    available: bool,
    voices: Vec<Voice>,
    events: ProviderEventSender,
    current: Option<Rendering>,
}

impl EspeakProvider {
    pub fn new(config: EspeakConfig, events: ProviderEventSender) -> Self {
        let available = std::process::Command::new(&config.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false);

        let voices = if available {
            info!("espeak-ng provider initialized ({})", config.program);
            query_voices(&config.program)
        } else {
            warn!("espeak-ng not found at '{}'", config.program);
            Vec::new()
        };

        Self {
            config,
            available,
            voices,
            events,
            current: None,
        }
    }

    /// Re-read the installed voices and announce the change
    pub fn refresh_voices(&mut self) {
        if !self.available {
            return;
        }
        let voices = query_voices(&self.config.program);
        if voices != self.voices {
            self.voices = voices;
            let _ = self.events.send(ProviderEvent::VoicesChanged);
        }
    }

    fn spawn(&self, utterance: &Utterance, announce: bool) -> oneshot::Sender<StopReason> {
        let (stop_tx, stop_rx) = oneshot::channel();

        let mut cmd = Command::new(&self.config.program);
        cmd.args(espeak_args(&self.config, utterance))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let id = utterance.id;
        let text = sanitize(&utterance.text);
        let events = self.events.clone();

        tokio::spawn(async move {
            let mut child = match cmd.spawn() {
                Ok(child) => child,
                Err(e) => {
                    let _ = events.send(ProviderEvent::Failed {
                        utterance: id,
                        reason: format!("Failed to run espeak-ng: {}", e),
                    });
                    return;
                }
            };

            if announce {
                let _ = events.send(ProviderEvent::Started { utterance: id });
            }

            if let Some(mut stdin) = child.stdin.take() {
                if let Err(e) = stdin.write_all(text.as_bytes()).await {
                    debug!("Failed to write utterance {} to espeak-ng: {}", id, e);
                }
            }

            tokio::select! {
                status = child.wait() => {
                    let event = match status {
                        Ok(status) if status.success() => ProviderEvent::Ended { utterance: id },
                        Ok(status) => ProviderEvent::Failed {
                            utterance: id,
                            reason: format!("espeak-ng exited with {}", status),
                        },
                        Err(e) => ProviderEvent::Failed {
                            utterance: id,
                            reason: format!("espeak-ng wait failed: {}", e),
                        },
                    };
                    let _ = events.send(event);
                }
                reason = stop_rx => {
                    let _ = child.kill().await;
                    // A dropped sender means the provider moved on without notice
                    if let Ok(StopReason::Cancel) = reason {
                        let _ = events.send(ProviderEvent::Cancelled { utterance: id });
                    }
                }
            }
        });

        stop_tx
    }
}

impl SpeechProvider for EspeakProvider {
    fn is_available(&self) -> bool {
        self.available
    }

    fn speak(&mut self, utterance: Utterance) -> Result<(), SpeechError> {
        if !self.available {
            return Err(SpeechError::Unsupported("espeak-ng not available".to_string()));
        }
        if utterance.text.chars().count() > MAX_UTTERANCE_CHARS {
            return Err(SpeechError::Provider(format!(
                "Utterance too long (max {} chars)",
                MAX_UTTERANCE_CHARS
            )));
        }

        // Replacing `current` drops any previous stop sender, which kills
        // that child without a cancellation event
        let stop = self.spawn(&utterance, true);
        self.current = Some(Rendering {
            utterance,
            stop: Some(stop),
        });
        Ok(())
    }

    fn cancel_current(&mut self) {
        if let Some(rendering) = self.current.take() {
            match rendering.stop {
                Some(stop) => {
                    let _ = stop.send(StopReason::Cancel);
                }
                None => {
                    let _ = self.events.send(ProviderEvent::Cancelled {
                        utterance: rendering.utterance.id,
                    });
                }
            }
        }
    }

    fn pause(&mut self) {
        if let Some(stop) = self.current.as_mut().and_then(|r| r.stop.take()) {
            let _ = stop.send(StopReason::Pause);
        }
    }

    fn resume(&mut self) {
        let utterance = match self.current.as_ref() {
            Some(rendering) if rendering.stop.is_none() => rendering.utterance.clone(),
            _ => return,
        };
        let stop = self.spawn(&utterance, false);
        if let Some(rendering) = self.current.as_mut() {
            rendering.stop = Some(stop);
        }
    }

    fn list_voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn name(&self) -> &str {
        "espeak-ng"
    }
}

/// Command-line arguments for one utterance
fn espeak_args(config: &EspeakConfig, utterance: &Utterance) -> Vec<String> {
    // Speed in words per minute, scaled by the playback rate
    let speed = ((config.words_per_minute as f32) * utterance.rate).round() as u32;
    let speed = speed.clamp(80, 900);

    // Amplitude 0-200, where 100 is normal
    let amplitude = ((config.volume * 200.0).round() as u32).min(200);

    // Pitch 0-99, where 50 is normal: 0.0 -> 0, 1.0 -> 50, 2.0 -> 99
    let pitch = ((utterance.pitch * 49.5).round() as u32).min(99);

    let mut args = vec![
        "-s".to_string(),
        speed.to_string(),
        "-a".to_string(),
        amplitude.to_string(),
        "-p".to_string(),
        pitch.to_string(),
    ];
    if let Some(ref voice) = utterance.voice {
        args.push("-v".to_string());
        args.push(voice.id.clone());
    }
    args
}

/// Strip control characters; newlines become spaces
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if c == '\n' || c == '\r' || c == '\t' { ' ' } else { c })
        .filter(|c| !c.is_control())
        .take(MAX_UTTERANCE_CHARS)
        .collect()
}

fn query_voices(program: &str) -> Vec<Voice> {
    match std::process::Command::new(program).arg("--voices").output() {
        Ok(output) if output.status.success() => {
            parse_voices(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(_) => Vec::new(),
        Err(e) => {
            warn!("Failed to list espeak-ng voices: {}", e);
            Vec::new()
        }
    }
}

/// Parse `espeak-ng --voices`:
/// `Pty Language Age/Gender VoiceName File Other Languages`
fn parse_voices(listing: &str) -> Vec<Voice> {
    listing
        .lines()
        .skip(1) // header
        .filter_map(|line| {
            let columns: Vec<&str> = line.split_whitespace().collect();
            if columns.len() < 4 {
                return None;
            }
            let language = columns[1];
            let name = columns[3].replace('_', " ");
            if language.chars().any(|c| c.is_control()) || language.len() > 32 {
                warn!("Skipping malformed voice entry: {}", line);
                return None;
            }
            Some(Voice::new(language, name, language))
        })
        .take(1000)
        .collect()
}
