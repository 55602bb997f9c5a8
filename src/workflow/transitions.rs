// SPDX-License-Identifier: MIT

//! Gating transitions on their conditions

use serde_json::Value;
use std::collections::BTreeSet;

use super::condition;
use super::document::{DocumentRecord, STATE_CHANGE_FIELD};
use super::history::StateHistory;
use super::types::{StateHistoryEntry, Timestamp, Transition};
use crate::error::{Result, StateChangeError};

/// Transitions whose condition holds for `doc` (unconditioned ones always pass)
///
/// A condition that cannot be parsed removes only its own transition.
pub fn filter_transitions(transitions: &[Transition], doc: &DocumentRecord) -> Vec<Transition> {
    transitions
        .iter()
        .filter(|t| {
            let allowed = condition::holds(t.guard(), doc);
            if !allowed {
                log::debug!(
                    "Transition {} -> {} ({}) filtered out by condition {:?}",
                    t.state,
                    t.next_state,
                    t.action,
                    t.condition
                );
            }
            allowed
        })
        .cloned()
        .collect()
}

/// Roles that may act next: `allowed` of every transition leaving
/// `current_state` whose condition holds
pub fn next_roles(
    current_state: &str,
    transitions: &[Transition],
    doc: &DocumentRecord,
) -> BTreeSet<String> {
    let roles: BTreeSet<String> = transitions
        .iter()
        .filter(|t| t.state == current_state)
        .filter(|t| condition::holds(t.guard(), doc))
        .filter_map(|t| t.allowed.clone().filter(|r| !r.is_empty()))
        .collect();

    if roles.is_empty() {
        log::warn!("No valid next role found from state '{}'", current_state);
    }
    roles
}

/// Take the first transition labelled `action` that leaves the document's
/// current state and whose condition holds
///
/// The returned document is in the transition's `next_state`, with the change
/// recorded in its state history by `username` acting as `role`.
pub fn apply_transition(
    doc: &DocumentRecord,
    transitions: &[Transition],
    action: &str,
    username: &str,
    role: &str,
    at: Timestamp,
) -> Result<DocumentRecord> {
    let current = doc.current_state();
    let transition = transitions
        .iter()
        .filter(|t| t.state == current && t.action == action)
        .find(|t| condition::holds(t.guard(), doc))
        .ok_or_else(|| StateChangeError::TransitionNotAllowed {
            action: action.to_string(),
            state: current.clone(),
        })?;

    let mut history = StateHistory::from(doc.state_history());
    let entry = StateHistoryEntry::new(&transition.next_state, at).by(username, role);
    if !history.record(entry) {
        log::debug!("'{}' leaves the document in '{}'", action, current);
    }

    log::info!("{}: {} -> {}", action, current, transition.next_state);
    Ok(doc
        .clone()
        .with("workflow_state", Value::String(transition.next_state.clone()))
        .with(STATE_CHANGE_FIELD, serde_json::to_value(history.entries())?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Vec<Transition> {
        vec![
            Transition::new("Draft", "Pending", "Submit").with_allowed("Clerk"),
            Transition::new("Pending", "Approved", "Approve")
                .with_allowed("Manager")
                .with_condition("doc.grand_total <= 1000"),
            Transition::new("Pending", "Approved", "Approve")
                .with_allowed("Director")
                .with_condition("doc.grand_total > 1000"),
            Transition::new("Pending", "Rejected", "Reject").with_allowed("Manager"),
        ]
    }

    #[test]
    fn test_condition_below_threshold_filters_everything() {
        let transitions = vec![Transition::new("Draft", "Approved", "Approve")
            .with_condition("doc.amount > 100")];
        let doc = DocumentRecord::from_json(json!({"amount": 50}));
        assert!(filter_transitions(&transitions, &doc).is_empty());

        let doc = DocumentRecord::from_json(json!({"amount": 150}));
        assert_eq!(filter_transitions(&transitions, &doc).len(), 1);
    }

    #[test]
    fn test_filter_keeps_order_and_unconditioned() {
        let doc = DocumentRecord::from_json(json!({"grand_total": 5000}));
        let kept = filter_transitions(&sample(), &doc);
        let roles: Vec<_> = kept.iter().filter_map(|t| t.allowed.as_deref()).collect();
        assert_eq!(roles, vec!["Clerk", "Director", "Manager"]);
    }

    #[test]
    fn test_broken_condition_only_drops_its_transition() {
        let transitions = vec![
            Transition::new("Draft", "Pending", "Submit").with_condition("doc.x ==="),
            Transition::new("Draft", "Cancelled", "Cancel"),
        ];
        let kept = filter_transitions(&transitions, &DocumentRecord::empty());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].next_state, "Cancelled");
    }

    #[test]
    fn test_next_roles() {
        let small = DocumentRecord::from_json(json!({"grand_total": 200}));
        let roles = next_roles("Pending", &sample(), &small);
        assert_eq!(roles.into_iter().collect::<Vec<_>>(), vec!["Manager"]);

        let large = DocumentRecord::from_json(json!({"grand_total": 2000}));
        let roles = next_roles("Pending", &sample(), &large);
        assert_eq!(
            roles.into_iter().collect::<Vec<_>>(),
            vec!["Director", "Manager"]
        );

        assert!(next_roles("Approved", &sample(), &large).is_empty());
    }

    fn at(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    #[test]
    fn test_apply_transition_records_history() {
        let doc = DocumentRecord::from_json(json!({
            "grand_total": 5000,
            "workflow_state": "Pending",
            "state_change": [
                {"workflow_state": "Draft", "modification_time": "2025-06-01 09:00:00"},
                {"workflow_state": "Pending", "modification_time": "2025-06-01 10:00:00"}
            ]
        }));

        let moved = apply_transition(
            &doc,
            &sample(),
            "Approve",
            "director@example.com",
            "Director",
            at("2025-06-02 08:30:00"),
        )
        .unwrap();

        assert_eq!(moved.current_state(), "Approved");
        let history = moved.state_history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[2].state(), "Approved");
        assert_eq!(history[2].role.as_deref(), Some("Director"));
        assert_eq!(history[2].modification_time, Some(at("2025-06-02 08:30:00")));
        assert_eq!(moved.get("grand_total"), Some(&json!(5000)));
    }

    #[test]
    fn test_apply_transition_starts_history_from_draft() {
        let doc = DocumentRecord::empty();
        let at = at("2025-06-01");
        let moved = apply_transition(&doc, &sample(), "Submit", "clerk", "Clerk", at).unwrap();
        assert_eq!(moved.current_state(), "Pending");
        assert_eq!(moved.state_history().len(), 1);
    }

    #[test]
    fn test_apply_transition_rejects_unavailable_action() {
        let doc = DocumentRecord::from_json(json!({"workflow_state": "Draft"}));
        let err = apply_transition(&doc, &sample(), "Approve", "a", "Manager", at("2025-06-01"))
            .unwrap_err();
        assert!(matches!(
            err,
            StateChangeError::TransitionNotAllowed { ref state, .. } if state == "Draft"
        ));
        assert!(!err.is_fetch_failure());
    }

    #[test]
    fn test_apply_transition_respects_conditions() {
        let transitions = vec![Transition::new("Draft", "Approved", "Approve")
            .with_condition("doc.amount > 100")];
        let doc = DocumentRecord::from_json(json!({"amount": 50}));
        let result = apply_transition(&doc, &transitions, "Approve", "a", "r", at("2025-06-01"));
        assert!(result.is_err());
    }
}
