//! Identifier value objects.
//!
//! - [`SessionId`] - key of a session record in the document store
//! - [`GroupId`] - identifier of a group within a session (`group-1`, `group-2`, ...)
//! - [`ParticipantId`] - stable participant identity for the session lifetime

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Key of a session record.
    SessionId
);

string_id!(
    /// Identifier of a group inside one session.
    GroupId
);

string_id!(
    /// Stable participant identity.
    ParticipantId
);

impl GroupId {
    /// Positional group id, 1-based (`group-1`).
    pub fn numbered(position: usize) -> Self {
        Self(format!("group-{}", position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_group_id() {
        assert_eq!(GroupId::numbered(1).as_str(), "group-1");
        assert_eq!(GroupId::numbered(12).to_string(), "group-12");
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let id = ParticipantId::new("alice");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"alice\"");
    }
}
