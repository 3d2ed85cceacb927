//! Remote summarization behind a one-way circuit breaker.
//!
//! The gateway starts `Enabled` when a backend is configured. The first transport failure,
//! or an answer carrying a quota / rate-limit code, moves it to `Disabled` for the rest
//! of the session. `summarize` never fails: every unusable remote outcome resolves to the
//! local extractive summary of the same text.

use crate::config::GatewayConfig;
use crate::openai_compat::OpenAiCompatClient;
use crate::{summarize, textprep};
use pagevoice_core::{Error, RemoteReply, SummaryBackend, SummaryRequest};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const SYSTEM_INSTRUCTION: &str = "You are an accessibility summarizer for visually impaired users. \
Summarize the provided webpage text in 2–4 short, simple sentences. \
Ignore ads, prices, and promotions.";

/// Remote input budget, in characters.
pub const MAX_INPUT_CHARS: usize = 4000;
/// Trimmed text shorter than this is returned as-is.
pub const MIN_INPUT_CHARS: usize = 10;
/// Error codes that trip the breaker.
pub const TRIP_CODES: &[&str] = &["insufficient_quota", "rate_limit_exceeded"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayState {
    Enabled,
    Disabled,
}

pub struct SummaryGateway {
    backend: Option<Arc<dyn SummaryBackend>>,
    enabled: AtomicBool,
    forced_offline: bool,
    max_sentences: usize,
}

impl std::fmt::Debug for SummaryGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryGateway")
            .field("backend", &self.backend_name())
            .field("state", &self.state())
            .field("forced_offline", &self.forced_offline)
            .finish()
    }
}

impl SummaryGateway {
    pub fn new(backend: Arc<dyn SummaryBackend>) -> Self {
        Self {
            backend: Some(backend),
            enabled: AtomicBool::new(true),
            forced_offline: false,
            max_sentences: summarize::DEFAULT_MAX_SENTENCES,
        }
    }

    /// Forced-offline: permanently local.
    pub fn offline() -> Self {
        Self {
            backend: None,
            enabled: AtomicBool::new(false),
            forced_offline: true,
            max_sentences: summarize::DEFAULT_MAX_SENTENCES,
        }
    }

    /// No usable backend (missing key, bad URL): starts `Disabled`.
    fn unconfigured() -> Self {
        Self {
            forced_offline: false,
            ..Self::offline()
        }
    }

    pub fn from_config(cfg: &GatewayConfig) -> Self {
        if cfg.offline {
            tracing::info!("forced offline; summaries are local only");
            return Self::offline();
        }
        match OpenAiCompatClient::from_config(cfg) {
            Ok(c) => {
                tracing::debug!(base_url = %c.base_url(), model = %c.model(), "remote summarizer configured");
                Self::new(Arc::new(c))
            }
            Err(e) => {
                tracing::warn!(error = %e, "remote summarizer unavailable; summaries are local only");
                Self::unconfigured()
            }
        }
    }

    pub fn with_max_sentences(mut self, n: usize) -> Self {
        self.max_sentences = n.max(1);
        self
    }

    pub fn state(&self) -> GatewayState {
        if self.is_enabled() {
            GatewayState::Enabled
        } else {
            GatewayState::Disabled
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn is_forced_offline(&self) -> bool {
        self.forced_offline
    }

    pub fn backend_name(&self) -> Option<&'static str> {
        self.backend.as_ref().map(|b| b.name())
    }

    pub fn local(&self, text: &str) -> String {
        summarize::summarize(text, self.max_sentences)
    }

    fn trip(&self, reason: &str) {
        if self.enabled.swap(false, Ordering::SeqCst) {
            tracing::info!(reason, "remote summarizer disabled for this session");
        }
    }

    pub async fn summarize(&self, text: &str) -> String {
        let trimmed = text.trim();
        if textprep::char_len(trimmed) < MIN_INPUT_CHARS {
            return trimmed.to_string();
        }
        let backend = match &self.backend {
            Some(b) if self.is_enabled() => b,
            _ => return self.local(trimmed),
        };

        let (input, clipped) = textprep::truncate_chars(trimmed, MAX_INPUT_CHARS);
        if clipped {
            tracing::debug!(max = MAX_INPUT_CHARS, "remote input truncated");
        }
        let req = SummaryRequest {
            instruction: SYSTEM_INSTRUCTION.to_string(),
            text: input,
        };

        match backend.summarize(&req).await {
            Ok(RemoteReply::Completed(Some(s))) if textprep::has_any_text(&s) => s.trim().to_string(),
            Ok(RemoteReply::Completed(_)) => {
                tracing::debug!(backend = backend.name(), "remote reply had no summary");
                self.local(trimmed)
            }
            Ok(RemoteReply::Rejected { status, code }) => {
                match code.as_deref() {
                    Some(c) if TRIP_CODES.contains(&c) => self.trip(c),
                    _ => tracing::warn!(status, code = ?code, "remote summarizer rejected request"),
                }
                self.local(trimmed)
            }
            Err(Error::Transport(e)) => {
                tracing::warn!(error = %e, "remote summarizer unreachable");
                self.trip("transport");
                self.local(trimmed)
            }
            Err(e) => {
                tracing::warn!(error = %e, "remote summarizer failed");
                self.local(trimmed)
            }
        }
    }
}
