// SPDX-License-Identifier: MIT

//! Status-marker rows for progress bars and the role-level strip

use serde::{Deserialize, Serialize};

use crate::workflow::types::{StateHistoryEntry, WorkflowStateDef};

/// Marker text used by [`generate_status_indicators`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub completed_marker: String,
    pub current_marker: String,
    pub rejected_marker: String,
    pub empty_marker: String,
    /// Lowercase substrings marking a row's state as rejected
    pub rejected_keywords: Vec<String>,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            completed_marker: "✓".to_string(),
            current_marker: "?".to_string(),
            rejected_marker: "✗".to_string(),
            empty_marker: String::new(),
            rejected_keywords: vec![
                "reject".to_string(),
                "canceled".to_string(),
                "declined".to_string(),
            ],
        }
    }
}

impl MarkerConfig {
    fn is_rejected(&self, state: &str) -> bool {
        let lower = state.to_lowercase();
        self.rejected_keywords
            .iter()
            .any(|k| lower.contains(&k.to_lowercase()))
    }
}

/// One marker row per item, one marker per state in `ordered_states`
///
/// An item without a state gets the start-of-workflow row: first state
/// completed, second current, the rest empty (clamped to however many states
/// exist). An item whose state is not declared gets an all-empty row.
pub fn generate_status_indicators(
    items: &[StateHistoryEntry],
    ordered_states: &[String],
    config: &MarkerConfig,
) -> Vec<Vec<String>> {
    items
        .iter()
        .map(|item| row_markers(item.state(), ordered_states, config))
        .collect()
}

fn row_markers(state: &str, ordered_states: &[String], config: &MarkerConfig) -> Vec<String> {
    if state.is_empty() {
        return ordered_states
            .iter()
            .enumerate()
            .map(|(i, _)| match i {
                0 => config.completed_marker.clone(),
                1 => config.current_marker.clone(),
                _ => config.empty_marker.clone(),
            })
            .collect();
    }

    let lower = state.to_lowercase();
    let current = ordered_states
        .iter()
        .position(|s| s.to_lowercase() == lower);
    let rejected = config.is_rejected(state);

    ordered_states
        .iter()
        .enumerate()
        .map(|(i, _)| match current {
            Some(c) if i < c => config.completed_marker.clone(),
            Some(c) if i == c && rejected => config.rejected_marker.clone(),
            Some(c) if i == c => config.current_marker.clone(),
            _ => config.empty_marker.clone(),
        })
        .collect()
}

/// One box in the role strip: a distinct role, its position and its marker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleLevel {
    pub role: String,
    /// 1-based
    pub level: usize,
    pub marker: String,
}

/// Distinct roles in order of first appearance across `states`, each marked
/// from the first item's row at the role's first state
pub fn role_levels(
    states: &[WorkflowStateDef],
    items: &[StateHistoryEntry],
    config: &MarkerConfig,
) -> Vec<RoleLevel> {
    let ordered: Vec<String> = states.iter().map(|s| s.state.clone()).collect();
    let first_row = items
        .first()
        .map(|item| row_markers(item.state(), &ordered, config));

    let mut roles: Vec<&str> = Vec::new();
    for role in states.iter().filter_map(|s| s.roles.first()) {
        if !roles.contains(&role.as_str()) {
            roles.push(role);
        }
    }

    roles
        .into_iter()
        .enumerate()
        .map(|(index, role)| {
            let marker = states
                .iter()
                .position(|s| s.roles.iter().any(|r| r == role))
                .and_then(|i| first_row.as_ref().and_then(|row| row.get(i)))
                .cloned()
                .unwrap_or_default();
            RoleLevel {
                role: role.to_string(),
                level: index + 1,
                marker,
            }
        })
        .collect()
}
