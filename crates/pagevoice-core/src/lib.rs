use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("transport failed: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Handle to one rendered element of a [`Document`].
///
/// Handles are only meaningful for the document that produced them. A handle that no
/// longer resolves (e.g. after a re-scan) simply matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

impl FromStr for Viewport {
    type Err = Error;

    /// Parses `WIDTHxHEIGHT`, e.g. `1280x800`.
    fn from_str(s: &str) -> Result<Self> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| Error::InvalidInput(format!("viewport must be WxH, got {s:?}")))?;
        let width = w
            .trim()
            .parse::<f64>()
            .map_err(|e| Error::InvalidInput(format!("viewport width: {e}")))?;
        let height = h
            .trim()
            .parse::<f64>()
            .map_err(|e| Error::InvalidInput(format!("viewport height: {e}")))?;
        if width <= 0.0 || height <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "viewport must be positive, got {s:?}"
            )));
        }
        Ok(Self { width, height })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
    Sticky,
}

impl Position {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "relative" => Self::Relative,
            "absolute" => Self::Absolute,
            "fixed" => Self::Fixed,
            "sticky" => Self::Sticky,
            _ => Self::Static,
        }
    }

    /// Fixed or absolute: taken out of the normal flow.
    pub fn is_out_of_flow(self) -> bool {
        matches!(self, Self::Fixed | Self::Absolute)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedStyle {
    pub position: Position,
    /// `None` for `auto` or an unparseable stack order.
    pub z_index: Option<i64>,
    pub display: String,
    pub visibility: String,
    pub opacity: f64,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            position: Position::Static,
            z_index: None,
            display: "block".to_string(),
            visibility: "visible".to_string(),
            opacity: 1.0,
        }
    }
}

/// The rendered-element capability the core consumes.
///
/// Selector arguments are CSS selectors; an invalid selector matches nothing.
/// Query results are always in document order.
pub trait Document {
    fn viewport(&self) -> Viewport;
    /// All elements in the document matching `selector`.
    fn select(&self, selector: &str) -> Vec<NodeId>;
    /// Descendants of `scope` (excluding `scope` itself) matching `selector`.
    fn query_all(&self, scope: NodeId, selector: &str) -> Vec<NodeId>;
    fn matches(&self, node: NodeId, selector: &str) -> bool;
    /// `node` itself or its nearest ancestor matching `selector`.
    fn closest(&self, node: NodeId, selector: &str) -> Option<NodeId>;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn tag_name(&self, node: NodeId) -> String;
    fn attr(&self, node: NodeId, name: &str) -> Option<String>;
    fn is_visible(&self, node: NodeId) -> bool;
    fn bounding_box(&self, node: NodeId) -> BoundingBox;
    fn computed_style(&self, node: NodeId) -> ComputedStyle;
    /// Rendered text, not whitespace-normalized.
    fn text(&self, node: NodeId) -> String;
    /// Outer markup of the element.
    fn markup(&self, node: NodeId) -> String;
    /// Whether `pattern` matches inside the element's outer markup.
    ///
    /// Implementations may test tags and text runs separately, so a match has to fall
    /// within one start tag or one text run.
    fn markup_matches(&self, node: NodeId, pattern: &Regex) -> bool {
        pattern.is_match(&self.markup(node))
    }
    /// Suppress the element for the rest of the session.
    fn hide(&mut self, node: NodeId);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "1" => Ok(Self::High),
            "medium" | "2" => Ok(Self::Medium),
            "low" | "3" => Ok(Self::Low),
            other => Err(Error::InvalidInput(format!("unknown priority: {other:?}"))),
        }
    }
}

/// Verdict of the block classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockClass {
    Content,
    Ad,
    Donation,
}

/// A navigable, speakable unit of extracted content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Position in the section list of the scan that produced it.
    pub index: usize,
    /// Never empty.
    pub heading_text: String,
    pub body_text: String,
    /// Filled lazily, the first time the section is spoken.
    pub summary_text: Option<String>,
    /// Lower-cased, whitespace-normalized text of the owned nodes.
    pub search_text: String,
    /// One or more nodes; a node belongs to at most one section.
    pub owned_nodes: Vec<NodeId>,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

impl Section {
    pub fn owns(&self, node: NodeId) -> bool {
        self.owned_nodes.contains(&node)
    }

    pub fn first_node(&self) -> Option<NodeId> {
        self.owned_nodes.first().copied()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Idle,
    Speaking,
    Paused,
}

/// Speech output. `speak` replaces whatever is currently being spoken.
pub trait AudioOut: Send + Sync {
    fn speak(&self, text: &str);
    fn pause(&self);
    fn resume(&self);
    fn stop(&self);
    fn state(&self) -> PlaybackState;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transcript {
    Heard(String),
    NoMatch,
}

#[async_trait::async_trait]
pub trait SpeechInput: Send + Sync {
    /// Listen for one utterance.
    async fn listen(&self) -> Result<Transcript>;

    /// Abort an outstanding `listen`. Implementations without abort support may ignore it.
    fn cancel(&self) {}
}

/// Optional enrichment of a node's text before it is summarized (e.g. OCR on images).
#[async_trait::async_trait]
pub trait TextAugmenter: Send + Sync {
    async fn augment(&self, node: NodeId, text: &str) -> Result<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRequest {
    /// Fixed system instruction.
    pub instruction: String,
    /// Input text, already truncated to the gateway's budget.
    pub text: String,
}

/// What a remote summarizer answered.
///
/// Transport failures are reported as `Err(Error::Transport)`, not as a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RemoteReply {
    /// Well-formed success; `None` when it carried no usable summary.
    Completed(Option<String>),
    /// The endpoint answered with an error payload.
    Rejected { status: u16, code: Option<String> },
}

#[async_trait::async_trait]
pub trait SummaryBackend: Send + Sync {
    fn name(&self) -> &'static str;
    async fn summarize(&self, req: &SummaryRequest) -> Result<RemoteReply>;
}
