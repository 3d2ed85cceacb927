//! Session state and the reader controller that drives audio from it.
//!
//! `SessionState` is owned by one `Reader`. Every mutation happens under a brief lock that
//! is never held across an `.await`; async work is ordered only by the speak generation.
//! A speak request bumps the generation before it suspends and applies its result only if
//! the generation is still the one it captured. Stale results run to completion and are
//! dropped.

use crate::command::Command;
use crate::gateway::SummaryGateway;
use crate::query::{self, QueryMatch};
use crate::textprep;
use pagevoice_core::{
    AudioOut, NodeId, PlaybackState, Priority, Section, SpeechInput, TextAugmenter, Transcript,
};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

/// Preview body limit, in characters.
pub const PREVIEW_CHARS: usize = 260;
/// Combined page text shorter than this is not summarized.
pub const MIN_PAGE_TEXT_CHARS: usize = 20;

pub const HEADING_PARAGRAPH: &str = "Paragraph summary";
pub const HEADING_PAGE: &str = "Page summary";
pub const HEADING_PRIORITY_PAGE: &str = "Priority page summary";
pub const HEADING_CONTROL: &str = "Control";

pub const MSG_LISTENING: &str = "Listening.";
pub const MSG_NOT_CAUGHT: &str = "I did not catch that.";
pub const MSG_NOTHING_HEARD: &str = "I did not hear anything.";
pub const MSG_VOICE_ERROR: &str = "Sorry, there was an error with voice recognition.";
pub const MSG_VOICE_UNAVAILABLE: &str = "Voice control is not available.";
pub const MSG_NO_MATCH: &str =
    "I could not find a specific section for that. Here is a summary of the page.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    pub heading: String,
    pub body: String,
}

impl Preview {
    fn new(heading: &str, text: &str) -> Self {
        Self {
            heading: heading.to_string(),
            body: textprep::preview(text, PREVIEW_CHARS),
        }
    }
}

/// Mutable per-document state.
#[derive(Debug, Default)]
pub struct SessionState {
    /// Replaced wholesale by `load_sections`.
    pub sections: Vec<Section>,
    /// Node being read; resolves priority keys back to a section.
    pub active_node: Option<NodeId>,
    /// Bumped at the start of every speak request.
    pub speak_generation: u64,
    /// Whole-page text, used when there are no sections.
    pub page_text: String,
    pub preview: Option<Preview>,
    listening: bool,
    voice_unavailable: bool,
}

impl SessionState {
    pub fn section_for_node(&self, node: NodeId) -> Option<usize> {
        self.sections.iter().position(|s| s.owns(node))
    }

    fn begin_speak(&mut self) -> u64 {
        self.speak_generation += 1;
        self.speak_generation
    }

    fn page_text_for_summary(&self, priority_only: bool) -> String {
        if self.sections.is_empty() {
            return textprep::clean(&self.page_text);
        }
        self.sections
            .iter()
            .filter_map(|s| {
                let text = if textprep::has_any_text(&s.body_text) {
                    s.body_text.trim()
                } else {
                    s.summary_text.as_deref().unwrap_or("").trim()
                };
                if text.is_empty() {
                    return None;
                }
                let lower = text.to_lowercase();
                if lower.contains("sponsored") || lower.contains("advertisement") {
                    return None;
                }
                if priority_only && s.priority == Priority::Low {
                    return None;
                }
                Some(text)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SpeakOutcome {
    /// Handed to audio.
    Spoken(String),
    /// A newer request superseded this one while it was suspended.
    Discarded,
    Paused,
    Resumed,
    Stopped,
    /// Silent no-op, with the reason.
    Nothing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum QueryOutcome {
    Matched {
        #[serde(rename = "match")]
        hit: QueryMatch,
        outcome: SpeakOutcome,
    },
    /// Nothing acceptable; the page summary was read instead.
    NoMatch { outcome: SpeakOutcome },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "voice", rename_all = "snake_case")]
pub enum VoiceOutcome {
    /// No speech input registered.
    Unavailable,
    /// Toggled off, or the listen was cancelled by a second toggle.
    Cancelled,
    NotCaught,
    NothingHeard,
    Failed,
    Query { transcript: String, outcome: QueryOutcome },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    Speak(SpeakOutcome),
    Query(QueryOutcome),
    Voice(VoiceOutcome),
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub sections: Vec<Section>,
    pub active_node: Option<NodeId>,
    pub speak_generation: u64,
    pub ai_enabled: bool,
    pub listening: bool,
    pub playback: PlaybackState,
    pub preview: Option<Preview>,
}

pub struct Reader {
    state: Mutex<SessionState>,
    gateway: SummaryGateway,
    audio: Arc<dyn AudioOut>,
    speech: Option<Arc<dyn SpeechInput>>,
    augmenter: Option<Arc<dyn TextAugmenter>>,
}

impl Reader {
    pub fn new(gateway: SummaryGateway, audio: Arc<dyn AudioOut>) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            gateway,
            audio,
            speech: None,
            augmenter: None,
        }
    }

    pub fn with_speech_input(mut self, speech: Arc<dyn SpeechInput>) -> Self {
        self.speech = Some(speech);
        self
    }

    pub fn with_augmenter(mut self, augmenter: Arc<dyn TextAugmenter>) -> Self {
        self.augmenter = Some(augmenter);
        self
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn gateway(&self) -> &SummaryGateway {
        &self.gateway
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let st = self.lock();
        SessionSnapshot {
            sections: st.sections.clone(),
            active_node: st.active_node,
            speak_generation: st.speak_generation,
            ai_enabled: self.gateway.is_enabled(),
            listening: st.listening,
            playback: self.audio.state(),
            preview: st.preview.clone(),
        }
    }

    /// Replace the section list (re-scan). Clears the active node.
    pub fn load_sections(&self, sections: Vec<Section>, page_text: impl Into<String>) {
        let mut st = self.lock();
        st.sections = sections
            .into_iter()
            .enumerate()
            .map(|(i, mut s)| {
                s.index = i;
                if s.search_text.is_empty() {
                    s.search_text = textprep::search_key(&s.body_text);
                }
                s
            })
            .collect();
        st.page_text = page_text.into();
        st.active_node = None;
        tracing::debug!(sections = st.sections.len(), "sections loaded");
    }

    /// Summarize and speak the section that owns `node`.
    pub async fn speak_node(&self, node: NodeId) -> SpeakOutcome {
        let (generation, raw) = {
            let mut st = self.lock();
            let generation = st.begin_speak();
            st.active_node = Some(node);
            let Some(i) = st.section_for_node(node) else {
                tracing::debug!(%node, "node belongs to no section");
                return SpeakOutcome::Nothing("node belongs to no section");
            };
            (generation, st.sections[i].body_text.clone())
        };

        let mut raw = raw;
        if let Some(aug) = &self.augmenter {
            match aug.augment(node, &raw).await {
                Ok(t) => raw = t,
                Err(e) => tracing::warn!(%node, error = %e, "text augmentation failed"),
            }
        }
        let raw = raw.trim().to_string();
        if raw.is_empty() {
            return SpeakOutcome::Nothing("no text");
        }

        {
            let mut st = self.lock();
            if st.speak_generation == generation {
                st.preview = Some(Preview::new(HEADING_PARAGRAPH, &raw));
            }
        }

        let summary = self.gateway.summarize(&raw).await;
        let text = if textprep::has_any_text(&summary) {
            summary.trim().to_string()
        } else {
            raw
        };

        let mut st = self.lock();
        if st.speak_generation != generation {
            tracing::debug!(%node, generation, current = st.speak_generation, "discarding stale summary");
            return SpeakOutcome::Discarded;
        }
        if let Some(i) = st.section_for_node(node) {
            st.sections[i].summary_text = Some(text.clone());
        }
        st.preview = Some(Preview::new(HEADING_PARAGRAPH, &text));
        self.audio.speak(&text);
        SpeakOutcome::Spoken(text)
    }

    pub async fn speak_section(&self, index: usize) -> SpeakOutcome {
        let node = self.lock().sections.get(index).and_then(Section::first_node);
        match node {
            Some(n) => self.speak_node(n).await,
            None => SpeakOutcome::Nothing("no such section"),
        }
    }

    /// Summarize the whole page. Sections that mention sponsorship or advertising are left
    /// out; `priority_only` also leaves out low-priority sections.
    pub async fn page_summary(&self, priority_only: bool) -> SpeakOutcome {
        self.summarize_page(priority_only, true).await
    }

    async fn summarize_page(&self, priority_only: bool, interrupt: bool) -> SpeakOutcome {
        let (generation, all) = {
            let mut st = self.lock();
            (st.begin_speak(), st.page_text_for_summary(priority_only))
        };
        if interrupt {
            self.audio.stop();
        }
        let all = all.trim().to_string();
        if textprep::char_len(&all) < MIN_PAGE_TEXT_CHARS {
            tracing::warn!(chars = textprep::char_len(&all), "page summary: not enough text");
            return SpeakOutcome::Nothing("not enough text");
        }

        let summary = self.gateway.summarize(&all).await;
        let text = if textprep::has_any_text(&summary) {
            summary.trim().to_string()
        } else {
            all
        };

        let mut st = self.lock();
        if st.speak_generation != generation {
            tracing::debug!(generation, "discarding stale page summary");
            return SpeakOutcome::Discarded;
        }
        let heading = if priority_only {
            HEADING_PRIORITY_PAGE
        } else {
            HEADING_PAGE
        };
        st.preview = Some(Preview::new(heading, &text));
        self.audio.speak(&text);
        SpeakOutcome::Spoken(text)
    }

    /// Resume if paused, pause if speaking, otherwise read the active node again.
    pub async fn play_pause(&self) -> SpeakOutcome {
        match self.audio.state() {
            PlaybackState::Paused => {
                self.audio.resume();
                SpeakOutcome::Resumed
            }
            PlaybackState::Speaking => {
                self.audio.pause();
                SpeakOutcome::Paused
            }
            PlaybackState::Idle => self.resummarize_current().await,
        }
    }

    /// Silence now. Pending summaries are dropped when they arrive.
    pub fn stop(&self) -> SpeakOutcome {
        self.lock().begin_speak();
        self.audio.stop();
        SpeakOutcome::Stopped
    }

    pub async fn resummarize_current(&self) -> SpeakOutcome {
        let node = self.lock().active_node;
        match node {
            Some(n) => self.speak_node(n).await,
            None => SpeakOutcome::Nothing("no active node"),
        }
    }

    /// Tag the active node's section.
    pub fn set_priority(&self, priority: Priority) -> SpeakOutcome {
        let msg = {
            let mut st = self.lock();
            let Some(node) = st.active_node else {
                return SpeakOutcome::Nothing("no active node");
            };
            let Some(i) = st.section_for_node(node) else {
                return SpeakOutcome::Nothing("active node belongs to no section");
            };
            st.sections[i].priority = priority;
            tracing::debug!(section = i, %priority, "priority set");
            format!("Marked section as {priority} priority.")
        };
        self.audio.speak(&msg);
        SpeakOutcome::Spoken(msg)
    }

    /// Hovered control: speak only its label, and keep pending paragraph summaries from
    /// talking over it.
    pub fn announce_control(&self, label: &str) -> SpeakOutcome {
        let label = textprep::clean(label);
        if label.is_empty() {
            return SpeakOutcome::Nothing("control has no label");
        }
        {
            let mut st = self.lock();
            st.begin_speak();
            st.preview = Some(Preview::new(HEADING_CONTROL, &label));
        }
        self.audio.stop();
        self.audio.speak(&label);
        SpeakOutcome::Spoken(label)
    }

    pub async fn voice_query(&self, q: &str) -> QueryOutcome {
        let found = {
            let st = self.lock();
            let hit = query::match_query(&st.sections, q);
            hit.and_then(|m| Some((m, st.sections.get(m.index)?.first_node()?)))
        };
        match found {
            Some((hit, node)) => {
                tracing::debug!(query = q, section = hit.index, "query matched");
                self.audio.stop();
                if let Some(intro) = hit.intro() {
                    self.audio.speak(intro);
                }
                let outcome = self.speak_node(node).await;
                QueryOutcome::Matched { hit, outcome }
            }
            None => {
                tracing::debug!(query = q, "no section matched; reading page summary");
                self.audio.speak(MSG_NO_MATCH);
                let outcome = self.summarize_page(false, false).await;
                QueryOutcome::NoMatch { outcome }
            }
        }
    }

    /// Start listening, or cancel an outstanding listen.
    pub async fn toggle_listen(&self) -> VoiceOutcome {
        let Some(speech) = self.speech.clone() else {
            let first = {
                let mut st = self.lock();
                !std::mem::replace(&mut st.voice_unavailable, true)
            };
            if first {
                self.audio.speak(MSG_VOICE_UNAVAILABLE);
            }
            return VoiceOutcome::Unavailable;
        };

        let was_listening = {
            let mut st = self.lock();
            let was = st.listening;
            st.listening = !was;
            was
        };
        if was_listening {
            speech.cancel();
            return VoiceOutcome::Cancelled;
        }

        self.audio.speak(MSG_LISTENING);
        let heard = speech.listen().await;

        let still_listening = std::mem::replace(&mut self.lock().listening, false);
        if !still_listening {
            return VoiceOutcome::Cancelled;
        }

        match heard {
            Ok(Transcript::NoMatch) => {
                self.audio.speak(MSG_NOT_CAUGHT);
                VoiceOutcome::NotCaught
            }
            Ok(Transcript::Heard(t)) if !textprep::has_any_text(&t) => {
                self.audio.speak(MSG_NOTHING_HEARD);
                VoiceOutcome::NothingHeard
            }
            Ok(Transcript::Heard(t)) => {
                let transcript = t.trim().to_string();
                let outcome = self.voice_query(&transcript).await;
                VoiceOutcome::Query {
                    transcript,
                    outcome,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "speech recognition failed");
                self.audio.speak(MSG_VOICE_ERROR);
                VoiceOutcome::Failed
            }
        }
    }

    pub async fn dispatch(&self, cmd: Command) -> DispatchOutcome {
        tracing::debug!(command = %cmd, "dispatch");
        match cmd {
            Command::PageSummary => DispatchOutcome::Speak(self.page_summary(false).await),
            Command::PriorityPageSummary => DispatchOutcome::Speak(self.page_summary(true).await),
            Command::PlayPause => DispatchOutcome::Speak(self.play_pause().await),
            Command::Stop => DispatchOutcome::Speak(self.stop()),
            Command::Resummarize => DispatchOutcome::Speak(self.resummarize_current().await),
            Command::SetPriority(p) => DispatchOutcome::Speak(self.set_priority(p)),
            Command::ToggleListen => DispatchOutcome::Voice(self.toggle_listen().await),
            Command::Query(q) => DispatchOutcome::Query(self.voice_query(&q).await),
            Command::Hover(i) => DispatchOutcome::Speak(self.speak_section(i).await),
            Command::AnnounceControl(label) => {
                DispatchOutcome::Speak(self.announce_control(&label))
            }
        }
    }
}
