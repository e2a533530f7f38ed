//! The four chat personas and their fixed traits.
//!
//! Prompt text and session wiring live in the app crate; this module only
//! carries the per-persona constants that command parsing and defaults
//! depend on.

use std::fmt;
use std::str::FromStr;

use crate::error::ChatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Persona {
    /// Retrieval-augmented Go-to-Market strategy assistant.
    Gtm,
    /// Spanish (Mexican) tutor.
    Spanish,
    /// Task-management assistant.
    Tasks,
    /// Therapy-session assistant.
    Therapy,
}

impl Persona {
    pub const ALL: [Persona; 4] = [
        Persona::Gtm,
        Persona::Spanish,
        Persona::Tasks,
        Persona::Therapy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Persona::Gtm => "gtm",
            Persona::Spanish => "spanish",
            Persona::Tasks => "tasks",
            Persona::Therapy => "therapy",
        }
    }

    /// Reserved inputs that end the session (matched case-insensitively).
    pub fn quit_words(&self) -> &'static [&'static str] {
        match self {
            Persona::Gtm => &["quit"],
            Persona::Spanish | Persona::Therapy => &["cmd quit"],
            Persona::Tasks => &["quit", "exit", "bye"],
        }
    }

    /// Whether terminating the session writes a transcript.
    pub fn saves_transcript(&self) -> bool {
        matches!(self, Persona::Spanish | Persona::Therapy)
    }

    /// Whether `add task:` / `complete task:` / `delete task:` are commands.
    pub fn handles_tasks(&self) -> bool {
        matches!(self, Persona::Tasks)
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Persona::Therapy => "hf.co/PixelPanda1/WellMinded_Therapy_Engine-gguf",
            _ => "mistral",
        }
    }

    pub fn default_history_window(&self) -> usize {
        match self {
            Persona::Therapy => 25,
            _ => 5,
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Persona {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Persona::ALL
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ChatError::InvalidArgument(format!(
                    "unknown persona '{}'; expected one of: gtm, spanish, tasks, therapy",
                    s
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names() {
        for p in Persona::ALL {
            assert_eq!(p.name().parse::<Persona>().unwrap(), p);
        }
        assert_eq!("GTM".parse::<Persona>().unwrap(), Persona::Gtm);
        assert!("lawyer".parse::<Persona>().is_err());
    }

    #[test]
    fn therapy_defaults() {
        assert_eq!(Persona::Therapy.default_history_window(), 25);
        assert_eq!(Persona::Spanish.default_history_window(), 5);
        assert!(Persona::Therapy.saves_transcript());
        assert!(!Persona::Gtm.saves_transcript());
    }
}
