// SPDX-License-Identifier: MIT

//! Per-state progress classification for the workflow diagram

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::workflow::history;
use crate::workflow::types::{StateHistoryEntry, Transition};

/// States whose label contains one of these are reached negatively
pub const NEGATIVE_KEYWORDS: [&str; 5] = ["cancel", "reject", "declined", "rejected", "cancelled"];

/// Progress marker for one workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    /// Reached, and the state is a positive outcome
    ReachedPositive,
    /// Reached, and the state is a cancellation or rejection
    ReachedNegative,
    /// Not reached, but one transition away from the latest state
    Reachable,
    #[default]
    None,
}

impl Indicator {
    pub fn glyph(&self) -> &'static str {
        match self {
            Indicator::ReachedPositive => "✓",
            Indicator::ReachedNegative => "✗",
            Indicator::Reachable => "?",
            Indicator::None => "",
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glyph())
    }
}

/// Whether a state label reads as a cancellation or rejection
pub fn is_negative_state(state: &str) -> bool {
    let lower = state.to_lowercase();
    NEGATIVE_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Classify `state` against the document's history and the declared transitions
pub fn classify(
    state: &str,
    history: &[StateHistoryEntry],
    transitions: &[Transition],
) -> Indicator {
    let latest = history::latest_state(history).to_lowercase();
    let wanted = state.trim().to_lowercase();

    let exists = history
        .iter()
        .any(|e| !e.state().is_empty() && e.state().trim().to_lowercase() == wanted);

    if exists {
        return if is_negative_state(state) {
            Indicator::ReachedNegative
        } else {
            Indicator::ReachedPositive
        };
    }

    let state_lower = state.to_lowercase();
    let next_possible = transitions.iter().any(|t| {
        !t.state.is_empty()
            && t.state.to_lowercase() == latest
            && t.next_state.to_lowercase() == state_lower
    });

    if next_possible {
        Indicator::Reachable
    } else {
        Indicator::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::types::Timestamp;

    fn t1() -> Timestamp {
        "2025-01-01 10:00:00".parse().unwrap()
    }

    fn t2() -> Timestamp {
        "2025-01-02 10:00:00".parse().unwrap()
    }

    #[test]
    fn test_rejected_state_reached_negatively() {
        let history = vec![StateHistoryEntry::new("Rejected", t1())];
        assert_eq!(classify("Rejected", &history, &[]), Indicator::ReachedNegative);
    }

    #[test]
    fn test_next_state_is_reachable() {
        let history = vec![StateHistoryEntry::new("Draft", t1())];
        let transitions = vec![Transition::new("Draft", "Approved", "Approve")];
        assert_eq!(
            classify("Approved", &history, &transitions),
            Indicator::Reachable
        );
    }

    #[test]
    fn test_no_history_no_transitions() {
        assert_eq!(classify("Approved", &[], &[]), Indicator::None);
    }

    #[test]
    fn test_reached_is_case_and_whitespace_insensitive() {
        let history = vec![StateHistoryEntry::new("  approved ", t1())];
        assert_eq!(classify("Approved", &history, &[]), Indicator::ReachedPositive);
    }

    #[test]
    fn test_reachable_only_from_latest_state() {
        let history = vec![
            StateHistoryEntry::new("Pending", t2()),
            StateHistoryEntry::new("Draft", t1()),
        ];
        let transitions = vec![
            Transition::new("Draft", "Cancelled", "Cancel"),
            Transition::new("pending", "APPROVED", "Approve"),
        ];
        assert_eq!(classify("Cancelled", &history, &transitions), Indicator::None);
        assert_eq!(classify("Approved", &history, &transitions), Indicator::Reachable);
    }

    #[test]
    fn test_reached_beats_reachable() {
        let history = vec![
            StateHistoryEntry::new("Draft", t1()),
            StateHistoryEntry::new("Cancelled", t2()),
        ];
        let transitions = vec![Transition::new("Cancelled", "Draft", "Reopen")];
        assert_eq!(classify("Draft", &history, &transitions), Indicator::ReachedPositive);
        assert_eq!(classify("Cancelled", &history, &transitions), Indicator::ReachedNegative);
    }

    #[test]
    fn test_malformed_entries_degrade() {
        let history = vec![StateHistoryEntry::default()];
        let transitions = vec![Transition::new("", "Draft", "Start")];
        assert_eq!(classify("Draft", &history, &transitions), Indicator::None);
    }

    #[test]
    fn test_glyphs() {
        assert_eq!(Indicator::ReachedPositive.to_string(), "✓");
        assert_eq!(Indicator::ReachedNegative.to_string(), "✗");
        assert_eq!(Indicator::Reachable.to_string(), "?");
        assert_eq!(Indicator::None.to_string(), "");
    }
}
