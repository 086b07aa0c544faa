//! Participant entity and its role/status value objects

use crate::core::ids::ParticipantId;
use serde::{Deserialize, Serialize};

/// Role a participant holds during a round.
///
/// Closed set: every branch on role goes through an exhaustive `match`, so a
/// new role is a compile-time change everywhere it matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// No role yet (serialized as the empty string)
    #[default]
    #[serde(rename = "")]
    Unassigned,
    Speaker,
    Listener,
    Scribe,
    Observer,
    /// Observer seat inside a rotating 4-person group
    ObserverTemporary,
    /// Never rotates; watches the whole session
    ObserverPermanent,
}

impl Role {
    /// Canonical role table, in assignment and rotation order.
    pub const CANONICAL: [Role; 4] = [Role::Speaker, Role::Listener, Role::Scribe, Role::Observer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Unassigned => "",
            Role::Speaker => "speaker",
            Role::Listener => "listener",
            Role::Scribe => "scribe",
            Role::Observer => "observer",
            Role::ObserverTemporary => "observer-temporary",
            Role::ObserverPermanent => "observer-permanent",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Unassigned => "Unassigned",
            Role::Speaker => "Speaker",
            Role::Listener => "Listener",
            Role::Scribe => "Scribe",
            Role::Observer => "Observer",
            Role::ObserverTemporary => "Observer (this round)",
            Role::ObserverPermanent => "Observer (whole session)",
        }
    }

    /// Speaker, listener or scribe.
    pub fn is_active(&self) -> bool {
        match self {
            Role::Speaker | Role::Listener | Role::Scribe => true,
            Role::Unassigned
            | Role::Observer
            | Role::ObserverTemporary
            | Role::ObserverPermanent => false,
        }
    }

    pub fn is_observer(&self) -> bool {
        match self {
            Role::Observer | Role::ObserverTemporary | Role::ObserverPermanent => true,
            Role::Unassigned | Role::Speaker | Role::Listener | Role::Scribe => false,
        }
    }

    /// Whether a participant holding this role takes part in rotation.
    pub fn rotates(&self) -> bool {
        match self {
            Role::Speaker | Role::Listener | Role::Scribe | Role::Observer | Role::ObserverTemporary => {
                true
            }
            Role::Unassigned | Role::ObserverPermanent => false,
        }
    }

    /// Position in [`Role::CANONICAL`]; rotating observer seats share the observer slot.
    pub fn canonical_index(&self) -> Option<usize> {
        match self {
            Role::Speaker => Some(0),
            Role::Listener => Some(1),
            Role::Scribe => Some(2),
            Role::Observer | Role::ObserverTemporary => Some(3),
            Role::Unassigned | Role::ObserverPermanent => None,
        }
    }

    pub fn is_assigned(&self) -> bool {
        !matches!(self, Role::Unassigned)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Unassigned => f.write_str("unassigned"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "unassigned" | "none" => Ok(Role::Unassigned),
            "speaker" => Ok(Role::Speaker),
            "listener" => Ok(Role::Listener),
            "scribe" => Ok(Role::Scribe),
            "observer" => Ok(Role::Observer),
            "observer-temporary" => Ok(Role::ObserverTemporary),
            "observer-permanent" => Ok(Role::ObserverPermanent),
            other => Err(format!(
                "Unknown role: {}. Valid: speaker, listener, scribe, observer, observer-temporary, observer-permanent",
                other
            )),
        }
    }
}

/// Readiness of a participant in the lobby
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParticipantStatus {
    Ready,
    #[default]
    NotReady,
    Connecting,
}

impl ParticipantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantStatus::Ready => "ready",
            ParticipantStatus::NotReady => "not-ready",
            ParticipantStatus::Connecting => "connecting",
        }
    }
}

impl std::fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A person taking part in a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub status: ParticipantStatus,
    #[serde(default)]
    pub hand_raised: bool,
}

impl Participant {
    pub fn new(id: impl Into<ParticipantId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: Role::Unassigned,
            status: ParticipantStatus::NotReady,
            hand_raised: false,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_status(mut self, status: ParticipantStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_ready(&self) -> bool {
        self.status == ParticipantStatus::Ready
    }
}
