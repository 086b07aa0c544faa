//! Scribe notebook: the current round's notes plus the append-only transcript.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scribe notes for one dialogue (a single-mode session or one group).
///
/// `current` is what the scribe is typing this round. A flush appends it to
/// `accumulated` under a round marker and clears it. Flushes are keyed by
/// `(cycle, round)` so a retried host action never appends the same round
/// twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScribeNotebook {
    #[serde(default)]
    pub current: String,
    #[serde(default)]
    pub accumulated: String,
    /// Flushed notes of the running cycle, by round number
    #[serde(default)]
    pub rounds: BTreeMap<u32, String>,
    /// Number of completed repeat cycles
    #[serde(default)]
    pub cycle: u32,
    #[serde(default)]
    pub last_flushed: Option<(u32, u32)>,
}

impl ScribeNotebook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current round's notes.
    pub fn write(&mut self, text: impl Into<String>) {
        self.current = text.into();
    }

    /// Whether `round` of the running cycle has already been flushed.
    pub fn is_flushed(&self, round: u32) -> bool {
        self.last_flushed == Some((self.cycle, round))
    }

    /// Append the current notes for `round` to the transcript.
    ///
    /// Returns `true` when text was appended. Blank notes are dropped but the
    /// round still counts as flushed.
    pub fn flush(&mut self, round: u32) -> bool {
        if self.is_flushed(round) {
            return false;
        }
        self.last_flushed = Some((self.cycle, round));

        let notes = std::mem::take(&mut self.current);
        if notes.trim().is_empty() {
            return false;
        }

        let entry = format!("--- Round {} ---\n{}", round, notes);
        if self.accumulated.is_empty() {
            self.accumulated = entry;
        } else {
            self.accumulated.push_str("\n\n");
            self.accumulated.push_str(&entry);
        }
        self.rounds.insert(round, notes);
        true
    }

    /// Start a fresh round-cycle. The transcript is kept.
    pub fn start_cycle(&mut self) {
        self.cycle += 1;
        self.rounds.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.current.trim().is_empty() && self.accumulated.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_appends_with_round_marker() {
        let mut notebook = ScribeNotebook::new();
        notebook.write("first thoughts");
        assert!(notebook.flush(1));
        notebook.write("second thoughts");
        assert!(notebook.flush(2));

        assert_eq!(
            notebook.accumulated,
            "--- Round 1 ---\nfirst thoughts\n\n--- Round 2 ---\nsecond thoughts"
        );
        assert!(notebook.current.is_empty());
        assert_eq!(notebook.rounds.get(&2).map(String::as_str), Some("second thoughts"));
    }

    #[test]
    fn test_flush_is_guarded_per_round() {
        let mut notebook = ScribeNotebook::new();
        notebook.write("notes");
        assert!(notebook.flush(1));
        notebook.write("typed after the flush");
        assert!(!notebook.flush(1));
        assert_eq!(notebook.accumulated, "--- Round 1 ---\nnotes");
        assert_eq!(notebook.current, "typed after the flush");
    }

    #[test]
    fn test_blank_notes_are_skipped() {
        let mut notebook = ScribeNotebook::new();
        notebook.write("   ");
        assert!(!notebook.flush(1));
        assert!(notebook.accumulated.is_empty());
        assert!(notebook.is_flushed(1));
    }

    #[test]
    fn test_new_cycle_reopens_round_numbers() {
        let mut notebook = ScribeNotebook::new();
        notebook.write("cycle one");
        notebook.flush(1);
        notebook.start_cycle();
        notebook.write("cycle two");
        assert!(notebook.flush(1));
        assert_eq!(
            notebook.accumulated,
            "--- Round 1 ---\ncycle one\n\n--- Round 1 ---\ncycle two"
        );
        assert_eq!(notebook.rounds.len(), 1);
    }
}
