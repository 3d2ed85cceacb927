//! Audio sink that records what would have been spoken.
//!
//! Used headless (the CLI prints the events) and by tests. There is no real playback, so an
//! utterance stays `Speaking` until it is paused, stopped, replaced, or `finish`ed.

use pagevoice_core::{AudioOut, PlaybackState};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum AudioEvent {
    Speak { text: String },
    Pause,
    Resume,
    Stop,
}

#[derive(Debug, Default)]
struct Inner {
    events: Vec<AudioEvent>,
    state: PlaybackState,
}

#[derive(Debug, Default)]
pub struct RecordingAudio {
    inner: Mutex<Inner>,
}

impl RecordingAudio {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut g = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut g)
    }

    /// Everything recorded so far.
    pub fn events(&self) -> Vec<AudioEvent> {
        self.with(|i| i.events.clone())
    }

    /// Take the recorded events, leaving the log empty.
    pub fn drain(&self) -> Vec<AudioEvent> {
        self.with(|i| std::mem::take(&mut i.events))
    }

    /// Only the spoken texts, in order.
    pub fn spoken(&self) -> Vec<String> {
        self.with(|i| {
            i.events
                .iter()
                .filter_map(|e| match e {
                    AudioEvent::Speak { text } => Some(text.clone()),
                    _ => None,
                })
                .collect()
        })
    }

    /// The current utterance ran to completion.
    pub fn finish(&self) {
        self.with(|i| i.state = PlaybackState::Idle);
    }
}

impl AudioOut for RecordingAudio {
    fn speak(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        self.with(|i| {
            i.events.push(AudioEvent::Speak {
                text: text.to_string(),
            });
            i.state = PlaybackState::Speaking;
        });
    }

    fn pause(&self) {
        self.with(|i| {
            if i.state == PlaybackState::Speaking {
                i.events.push(AudioEvent::Pause);
                i.state = PlaybackState::Paused;
            }
        });
    }

    fn resume(&self) {
        self.with(|i| {
            if i.state == PlaybackState::Paused {
                i.events.push(AudioEvent::Resume);
                i.state = PlaybackState::Speaking;
            }
        });
    }

    fn stop(&self) {
        self.with(|i| {
            i.events.push(AudioEvent::Stop);
            i.state = PlaybackState::Idle;
        });
    }

    fn state(&self) -> PlaybackState {
        self.with(|i| i.state)
    }
}
