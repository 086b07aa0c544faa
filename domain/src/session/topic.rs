//! Topic suggestions voted on in the lobby

use crate::core::ids::ParticipantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A topic proposed by a participant, with the set of voters
///
/// The suggester's own vote is counted from the start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSuggestion {
    pub id: String,
    pub topic: String,
    pub suggested_by: String,
    pub suggested_by_user_id: ParticipantId,
    pub suggested_at: DateTime<Utc>,
    #[serde(default)]
    pub voters: Vec<ParticipantId>,
}

impl TopicSuggestion {
    pub fn new(
        id: impl Into<String>,
        topic: impl AsRef<str>,
        suggested_by: impl Into<String>,
        suggested_by_user_id: ParticipantId,
        suggested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            topic: topic.as_ref().trim().to_string(),
            suggested_by: suggested_by.into(),
            voters: vec![suggested_by_user_id.clone()],
            suggested_by_user_id,
            suggested_at,
        }
    }

    pub fn votes(&self) -> usize {
        self.voters.len()
    }

    pub fn has_voted(&self, voter: &ParticipantId) -> bool {
        self.voters.contains(voter)
    }

    /// Add or withdraw `voter`'s vote. Returns `true` if the vote now counts.
    pub fn toggle_vote(&mut self, voter: &ParticipantId) -> bool {
        if let Some(index) = self.voters.iter().position(|v| v == voter) {
            self.voters.remove(index);
            false
        } else {
            self.voters.push(voter.clone());
            true
        }
    }
}

/// Up to `limit` suggestions, most votes first; ties keep suggestion order.
pub fn most_popular(suggestions: &[TopicSuggestion], limit: usize) -> Vec<&TopicSuggestion> {
    let mut ranked: Vec<&TopicSuggestion> = suggestions.iter().collect();
    ranked.sort_by(|a, b| b.votes().cmp(&a.votes()));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggestion(id: &str, by: &str) -> TopicSuggestion {
        TopicSuggestion::new(id, format!("  topic {}  ", id), by, ParticipantId::new(by), Utc::now())
    }

    #[test]
    fn test_suggester_votes_automatically() {
        let s = suggestion("t1", "ann");
        assert_eq!(s.votes(), 1);
        assert!(s.has_voted(&ParticipantId::new("ann")));
        assert_eq!(s.topic, "topic t1");
    }

    #[test]
    fn test_toggle_vote() {
        let mut s = suggestion("t1", "ann");
        let bob = ParticipantId::new("bob");
        assert!(s.toggle_vote(&bob));
        assert_eq!(s.votes(), 2);
        assert!(!s.toggle_vote(&bob));
        assert_eq!(s.votes(), 1);
    }

    #[test]
    fn test_most_popular_is_stable() {
        let mut a = suggestion("a", "ann");
        let b = suggestion("b", "bob");
        let c = suggestion("c", "cat");
        a.toggle_vote(&ParticipantId::new("dan"));
        let all = vec![b, a, c];

        let top: Vec<&str> = most_popular(&all, 2).iter().map(|s| s.id.as_str()).collect();
        assert_eq!(top, vec!["a", "b"]);
    }
}
