//! Phase vocabulary for the two session variants.

use serde::{Deserialize, Serialize};

/// Named state within a round-cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    // Online variant
    TopicSelection,
    HelloCheckin,
    Listening,
    Transition,
    Completion,
    Reflection,
    // In-person variant
    Waiting,
    Round,
    ScribeFeedback,
    RoundComplete,
    // Shared
    FreeDialogue,
    Completed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::TopicSelection => "topic-selection",
            Phase::HelloCheckin => "hello-checkin",
            Phase::Listening => "listening",
            Phase::Transition => "transition",
            Phase::Completion => "completion",
            Phase::Reflection => "reflection",
            Phase::Waiting => "waiting",
            Phase::Round => "round",
            Phase::ScribeFeedback => "scribe-feedback",
            Phase::RoundComplete => "round-complete",
            Phase::FreeDialogue => "free-dialogue",
            Phase::Completed => "completed",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Phase::TopicSelection => "Topic Selection",
            Phase::HelloCheckin => "Hello Check-in",
            Phase::Listening => "Listening",
            Phase::Transition => "Transition",
            Phase::Completion => "Cycle Complete",
            Phase::Reflection => "Reflection",
            Phase::Waiting => "Waiting",
            Phase::Round => "Round",
            Phase::ScribeFeedback => "Scribe Feedback",
            Phase::RoundComplete => "Round Complete",
            Phase::FreeDialogue => "Free Dialogue",
            Phase::Completed => "Completed",
        }
    }

    /// Before the host has started anything.
    pub fn is_lobby(&self) -> bool {
        matches!(self, Phase::TopicSelection | Phase::Waiting)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let phase = match s.trim().to_lowercase().replace('_', "-").as_str() {
            "topic-selection" => Phase::TopicSelection,
            "hello-checkin" => Phase::HelloCheckin,
            "listening" => Phase::Listening,
            "transition" => Phase::Transition,
            "completion" => Phase::Completion,
            "reflection" => Phase::Reflection,
            "waiting" => Phase::Waiting,
            "round" => Phase::Round,
            "scribe-feedback" => Phase::ScribeFeedback,
            "round-complete" => Phase::RoundComplete,
            "free-dialogue" => Phase::FreeDialogue,
            "completed" => Phase::Completed,
            other => return Err(format!("Unknown phase: {}", other)),
        };
        Ok(phase)
    }
}

/// Which phase vocabulary a session runs with
///
/// - `Online`: `topic-selection → hello-checkin → listening ⇄ transition →
///   completion → {free-dialogue | reflection} → completed`
/// - `InPerson`: `waiting → round ⇄ scribe-feedback → round-complete →
///   {round | free-dialogue | completed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionVariant {
    #[default]
    Online,
    InPerson,
}

impl SessionVariant {
    pub fn lobby(&self) -> Phase {
        match self {
            SessionVariant::Online => Phase::TopicSelection,
            SessionVariant::InPerson => Phase::Waiting,
        }
    }

    /// Phase entered by "start"; online sessions check in first.
    pub fn opening(&self) -> Phase {
        match self {
            SessionVariant::Online => Phase::HelloCheckin,
            SessionVariant::InPerson => Phase::Round,
        }
    }

    /// The phase in which a round is actually practiced.
    pub fn active_round(&self) -> Phase {
        match self {
            SessionVariant::Online => Phase::Listening,
            SessionVariant::InPerson => Phase::Round,
        }
    }

    /// Between two rounds, after roles have rotated.
    pub fn between_rounds(&self) -> Phase {
        match self {
            SessionVariant::Online => Phase::Transition,
            SessionVariant::InPerson => Phase::ScribeFeedback,
        }
    }

    /// All rounds of the cycle are done.
    pub fn cycle_complete(&self) -> Phase {
        match self {
            SessionVariant::Online => Phase::Completion,
            SessionVariant::InPerson => Phase::RoundComplete,
        }
    }

    /// Where "end session" lands.
    pub fn closing(&self) -> Phase {
        match self {
            SessionVariant::Online => Phase::Reflection,
            SessionVariant::InPerson => Phase::Completed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionVariant::Online => "online",
            SessionVariant::InPerson => "in-person",
        }
    }
}

impl std::fmt::Display for SessionVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "online" | "remote" => Ok(SessionVariant::Online),
            "in-person" | "inperson" => Ok(SessionVariant::InPerson),
            other => Err(format!("Unknown session variant: {}", other)),
        }
    }
}
