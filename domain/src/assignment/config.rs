//! Group configuration value objects

use serde::{Deserialize, Serialize};

/// Preferred group size: `3`, `4` or `"mixed"` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "GroupSizeRepr", into = "GroupSizeRepr")]
pub enum GroupSize {
    Three,
    #[default]
    Four,
    Mixed,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum GroupSizeRepr {
    Number(u8),
    Text(String),
}

impl TryFrom<GroupSizeRepr> for GroupSize {
    type Error = String;

    fn try_from(repr: GroupSizeRepr) -> Result<Self, Self::Error> {
        match repr {
            GroupSizeRepr::Number(3) => Ok(GroupSize::Three),
            GroupSizeRepr::Number(4) => Ok(GroupSize::Four),
            GroupSizeRepr::Number(n) => Err(format!("group size must be 3, 4 or \"mixed\", got {}", n)),
            GroupSizeRepr::Text(text) => text.parse(),
        }
    }
}

impl From<GroupSize> for GroupSizeRepr {
    fn from(size: GroupSize) -> Self {
        match size {
            GroupSize::Three => GroupSizeRepr::Number(3),
            GroupSize::Four => GroupSizeRepr::Number(4),
            GroupSize::Mixed => GroupSizeRepr::Text("mixed".to_string()),
        }
    }
}

impl std::str::FromStr for GroupSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "3" | "three" => Ok(GroupSize::Three),
            "4" | "four" => Ok(GroupSize::Four),
            "mixed" => Ok(GroupSize::Mixed),
            other => Err(format!("group size must be 3, 4 or \"mixed\", got {}", other)),
        }
    }
}

impl std::fmt::Display for GroupSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupSize::Three => write!(f, "3"),
            GroupSize::Four => write!(f, "4"),
            GroupSize::Mixed => write!(f, "mixed"),
        }
    }
}

/// How participants are moved between groups on reshuffle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupRotation {
    #[default]
    Random,
    Balanced,
    /// The host arranges groups by hand; shuffling is refused
    Manual,
}

impl std::str::FromStr for GroupRotation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "random" => Ok(GroupRotation::Random),
            "balanced" => Ok(GroupRotation::Balanced),
            "manual" => Ok(GroupRotation::Manual),
            other => Err(format!("Unknown group rotation: {}", other)),
        }
    }
}

/// Where observers end up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObserverStrategy {
    /// Every group keeps its own observer seats
    #[default]
    Distribute,
    /// The first group keeps its observers; its other members are reseated
    /// as speaker, listener and scribe
    Central,
}

impl std::str::FromStr for ObserverStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "distribute" => Ok(ObserverStrategy::Distribute),
            "central" => Ok(ObserverStrategy::Central),
            other => Err(format!("Unknown observer strategy: {}", other)),
        }
    }
}

/// What to do with exactly five participants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FivePersonChoice {
    /// A pair and a trio
    #[default]
    Split,
    /// One group with two observers
    Together,
}

impl std::str::FromStr for FivePersonChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "split" => Ok(FivePersonChoice::Split),
            "together" => Ok(FivePersonChoice::Together),
            other => Err(format!("Unknown five-person choice: {}", other)),
        }
    }
}

/// Settings for partitioning a roster into groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupConfiguration {
    #[serde(default)]
    pub group_size: GroupSize,
    #[serde(default = "default_true")]
    pub auto_assign_roles: bool,
    #[serde(default)]
    pub group_rotation: GroupRotation,
    #[serde(default)]
    pub observer_strategy: ObserverStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_groups: Option<u32>,
}

fn default_true() -> bool {
    true
}

impl Default for GroupConfiguration {
    fn default() -> Self {
        Self {
            group_size: GroupSize::default(),
            auto_assign_roles: true,
            group_rotation: GroupRotation::default(),
            observer_strategy: ObserverStrategy::default(),
            max_groups: None,
        }
    }
}

impl GroupConfiguration {
    pub fn with_group_size(mut self, size: GroupSize) -> Self {
        self.group_size = size;
        self
    }

    pub fn with_auto_assign_roles(mut self, enabled: bool) -> Self {
        self.auto_assign_roles = enabled;
        self
    }

    pub fn with_group_rotation(mut self, rotation: GroupRotation) -> Self {
        self.group_rotation = rotation;
        self
    }

    pub fn with_observer_strategy(mut self, strategy: ObserverStrategy) -> Self {
        self.observer_strategy = strategy;
        self
    }

    pub fn with_max_groups(mut self, max: u32) -> Self {
        self.max_groups = Some(max);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_size_accepts_numbers_and_mixed() {
        let size: GroupSize = serde_json::from_str("3").unwrap();
        assert_eq!(size, GroupSize::Three);
        let size: GroupSize = serde_json::from_str("\"mixed\"").unwrap();
        assert_eq!(size, GroupSize::Mixed);
        assert!(serde_json::from_str::<GroupSize>("5").is_err());
        assert_eq!(serde_json::to_string(&GroupSize::Four).unwrap(), "4");
    }

    #[test]
    fn test_configuration_defaults_from_partial_json() {
        let config: GroupConfiguration =
            serde_json::from_str(r#"{"groupSize":"mixed","observerStrategy":"central"}"#).unwrap();
        assert_eq!(config.group_size, GroupSize::Mixed);
        assert!(config.auto_assign_roles);
        assert_eq!(config.group_rotation, GroupRotation::Random);
        assert_eq!(config.observer_strategy, ObserverStrategy::Central);
        assert_eq!(config.max_groups, None);
    }
}
