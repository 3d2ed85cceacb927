//! Keyboard / voice command surface.

use pagevoice_core::{Error, Priority, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "arg", rename_all = "kebab-case")]
pub enum Command {
    PageSummary,
    PriorityPageSummary,
    PlayPause,
    Stop,
    Resummarize,
    SetPriority(Priority),
    ToggleListen,
    Query(String),
    /// Pointer entered the section at this index.
    Hover(usize),
    /// Pointer entered an interactive control with this label.
    AnnounceControl(String),
}

/// One key event as the host reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPress {
    /// `key` as reported by the host: `"p"`, `"P"`, `" "`, `"Escape"`, ...
    pub key: String,
    pub ctrl: bool,
    pub shift: bool,
    /// Alt chords belong to the host; none of them map to a command.
    pub alt: bool,
    /// Focus is in a text-entry context (input, textarea, editable content).
    pub typing: bool,
}

impl KeyPress {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn typing(mut self) -> Self {
        self.typing = true;
        self
    }
}

impl FromStr for KeyPress {
    type Err = Error;

    /// `Ctrl+Shift+A`, `Shift+P`, `Space`, `Escape`, `1`, ...
    fn from_str(s: &str) -> Result<Self> {
        let mut out = KeyPress::default();
        let parts = s.trim().split('+').map(str::trim).collect::<Vec<_>>();
        let (key, mods) = parts
            .split_last()
            .ok_or_else(|| Error::InvalidInput("empty key".to_string()))?;
        for m in mods {
            match m.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => out.ctrl = true,
                "shift" => out.shift = true,
                "alt" => out.alt = true,
                other => return Err(Error::InvalidInput(format!("unknown modifier {other:?}"))),
            }
        }
        out.key = match key.to_ascii_lowercase().as_str() {
            "" => return Err(Error::InvalidInput(format!("missing key in {s:?}"))),
            "space" => " ".to_string(),
            "esc" | "escape" => "Escape".to_string(),
            _ => key.to_string(),
        };
        Ok(out)
    }
}

impl Command {
    /// Map a key event. `None` means the key is not ours (or is suppressed while typing).
    pub fn from_key(k: &KeyPress) -> Option<Self> {
        if k.key == "Escape" {
            return Some(Self::Stop);
        }
        if k.typing || k.alt {
            return None;
        }
        match k.key.as_str() {
            "p" | "P" if k.shift => Some(Self::PriorityPageSummary),
            "p" | "P" => Some(Self::PageSummary),
            "a" | "A" if k.ctrl && k.shift => Some(Self::Resummarize),
            " " | "Space" | "Spacebar" => Some(Self::PlayPause),
            "1" => Some(Self::SetPriority(Priority::High)),
            "2" => Some(Self::SetPriority(Priority::Medium)),
            "3" => Some(Self::SetPriority(Priority::Low)),
            "v" | "V" => Some(Self::ToggleListen),
            _ => None,
        }
    }
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (head, arg) = match s.split_once(':') {
            Some((h, a)) => (h.trim(), Some(a)),
            None => (s, None),
        };
        let need = |what: &str| {
            arg.map(str::trim)
                .filter(|a| !a.is_empty())
                .ok_or_else(|| Error::InvalidInput(format!("{head}: missing {what}")))
        };
        match head.to_ascii_lowercase().as_str() {
            "page-summary" => Ok(Self::PageSummary),
            "priority-page-summary" => Ok(Self::PriorityPageSummary),
            "play-pause" => Ok(Self::PlayPause),
            "stop" => Ok(Self::Stop),
            "resummarize" => Ok(Self::Resummarize),
            "toggle-listen" => Ok(Self::ToggleListen),
            "priority" => Ok(Self::SetPriority(need("priority")?.parse()?)),
            "query" => Ok(Self::Query(need("query text")?.to_string())),
            "hover" => {
                let i = need("section index")?;
                i.parse::<usize>()
                    .map(Self::Hover)
                    .map_err(|e| Error::InvalidInput(format!("hover index {i:?}: {e}")))
            }
            "control" => Ok(Self::AnnounceControl(need("label")?.to_string())),
            "key" => {
                let k = need("key")?.parse::<KeyPress>()?;
                Self::from_key(&k)
                    .ok_or_else(|| Error::InvalidInput(format!("key {k:?} maps to no command")))
            }
            other => Err(Error::InvalidInput(format!("unknown command {other:?}"))),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageSummary => f.write_str("page-summary"),
            Self::PriorityPageSummary => f.write_str("priority-page-summary"),
            Self::PlayPause => f.write_str("play-pause"),
            Self::Stop => f.write_str("stop"),
            Self::Resummarize => f.write_str("resummarize"),
            Self::SetPriority(p) => write!(f, "priority:{p}"),
            Self::ToggleListen => f.write_str("toggle-listen"),
            Self::Query(q) => write!(f, "query:{q}"),
            Self::Hover(i) => write!(f, "hover:{i}"),
            Self::AnnounceControl(l) => write!(f, "control:{l}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_map() {
        let cases = [
            (KeyPress::new("p"), Some(Command::PageSummary)),
            (KeyPress::new("P").shift(), Some(Command::PriorityPageSummary)),
            (KeyPress::new("A").ctrl().shift(), Some(Command::Resummarize)),
            (KeyPress::new("a").ctrl(), None),
            (KeyPress::new(" "), Some(Command::PlayPause)),
            (KeyPress::new("Escape"), Some(Command::Stop)),
            (KeyPress::new("1"), Some(Command::SetPriority(Priority::High))),
            (KeyPress::new("2"), Some(Command::SetPriority(Priority::Medium))),
            (KeyPress::new("3"), Some(Command::SetPriority(Priority::Low))),
            (KeyPress::new("v"), Some(Command::ToggleListen)),
            (KeyPress::new("x"), None),
        ];
        for (k, want) in cases {
            assert_eq!(Command::from_key(&k), want, "key={k:?}");
        }
    }

    #[test]
    fn alt_chords_are_left_to_the_host() {
        assert_eq!(Command::from_key(&KeyPress::new("p").alt()), None);
        assert_eq!(Command::from_key(&KeyPress::new("1").alt()), None);
        assert_eq!(
            Command::from_key(&KeyPress::new("Escape").alt()),
            Some(Command::Stop)
        );
        let k = "Alt+P".parse::<KeyPress>().unwrap();
        assert!(k.alt);
        assert_eq!(Command::from_key(&k), None);
        assert!("key:Alt+P".parse::<Command>().is_err());
    }

    #[test]
    fn typing_context_suppresses_everything_but_escape() {
        assert_eq!(Command::from_key(&KeyPress::new("p").typing()), None);
        assert_eq!(Command::from_key(&KeyPress::new(" ").typing()), None);
        assert_eq!(Command::from_key(&KeyPress::new("1").typing()), None);
        assert_eq!(
            Command::from_key(&KeyPress::new("Escape").typing()),
            Some(Command::Stop)
        );
    }

    #[test]
    fn key_combos_parse() {
        let k: KeyPress = "Ctrl+Shift+A".parse().unwrap();
        assert!(k.ctrl && k.shift);
        assert_eq!(k.key, "A");
        assert_eq!("space".parse::<KeyPress>().unwrap().key, " ");
        assert!("Hyper+X".parse::<KeyPress>().is_err());
        assert!("Shift+".parse::<KeyPress>().is_err());
    }

    #[test]
    fn command_strings_round_trip() {
        for s in [
            "page-summary",
            "priority-page-summary",
            "play-pause",
            "stop",
            "resummarize",
            "priority:low",
            "toggle-listen",
            "query:cheapest laptop",
            "hover:3",
            "control:Add to basket",
        ] {
            let c: Command = s.parse().unwrap();
            assert_eq!(c.to_string(), s);
        }
        assert_eq!("key:Shift+P".parse::<Command>().unwrap(), Command::PriorityPageSummary);
        assert_eq!("query: a: b ".parse::<Command>().unwrap(), Command::Query("a: b".to_string()));
    }

    #[test]
    fn bad_commands_are_invalid_input() {
        for s in ["", "dance", "priority:urgent", "hover:x", "query:", "key:x"] {
            assert!(
                matches!(s.parse::<Command>(), Err(Error::InvalidInput(_))),
                "input={s:?}"
            );
        }
    }
}
