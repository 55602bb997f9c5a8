// SPDX-License-Identifier: MIT

//! State history ordering, recording and the duration timeline

use chrono::Duration;
use serde::Serialize;
use std::collections::BTreeMap;

use super::types::{StateHistoryEntry, Timestamp};

/// Entries ordered by modification time; entries without a time come first
/// and ties keep their recorded order
pub fn sorted(history: &[StateHistoryEntry]) -> Vec<&StateHistoryEntry> {
    let mut entries: Vec<&StateHistoryEntry> = history.iter().collect();
    entries.sort_by_key(|e| e.modification_time);
    entries
}

/// State of the most recent entry, or the empty string for an empty history
pub fn latest_state(history: &[StateHistoryEntry]) -> &str {
    sorted(history).last().map(|e| e.state()).unwrap_or("")
}

/// A document's state history, appended to as the document moves
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StateHistory {
    entries: Vec<StateHistoryEntry>,
}

impl StateHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[StateHistoryEntry] {
        &self.entries
    }

    pub fn latest_state(&self) -> &str {
        latest_state(&self.entries)
    }

    /// Append `entry` unless the document is already in that state.
    /// Returns whether the entry was recorded.
    pub fn record(&mut self, entry: StateHistoryEntry) -> bool {
        if !self.entries.is_empty() && self.latest_state() == entry.state() {
            log::debug!("State '{}' unchanged, not recording", entry.state());
            return false;
        }
        self.entries.push(entry);
        true
    }
}

impl From<Vec<StateHistoryEntry>> for StateHistory {
    fn from(entries: Vec<StateHistoryEntry>) -> Self {
        Self { entries }
    }
}

/// One row of the timeline report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineRow {
    pub workflow_state: String,
    pub username: String,
    pub role: String,
    pub modification_time: Option<Timestamp>,
    /// Time since the previous change; `None` for the first row
    #[serde(skip)]
    pub since_previous: Option<Duration>,
    /// Rendered `since_previous`, `"0"` when there is none
    pub duration: String,
}

/// Per-document timeline of state changes with the average step duration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub rows: Vec<TimelineRow>,
    #[serde(skip)]
    pub average: Option<Duration>,
    /// Rendered `average`, `"0"` when there is none
    pub average_duration: String,
}

impl Timeline {
    /// Timeline over the whole history, each row measured from the one before
    pub fn build(history: &[StateHistoryEntry]) -> Self {
        let ordered = sorted(history);
        let mut rows = Vec::with_capacity(ordered.len());
        let mut previous: Option<Timestamp> = None;

        for entry in ordered {
            let since_previous = match (previous, entry.modification_time) {
                (Some(prev), Some(curr)) => Some(curr.as_naive() - prev.as_naive()),
                _ => None,
            };
            rows.push(row(entry, since_previous));
            previous = entry.modification_time;
        }

        Self::with_rows(rows)
    }

    /// Timeline of one user's changes, each measured from the latest change by
    /// anyone strictly before it
    pub fn for_user(history: &[StateHistoryEntry], username: &str) -> Self {
        let ordered = sorted(history);
        let rows = ordered
            .iter()
            .filter(|e| e.username.as_deref() == Some(username))
            .map(|entry| {
                let since_previous = entry.modification_time.and_then(|curr| {
                    ordered
                        .iter()
                        .rev()
                        .filter_map(|e| e.modification_time)
                        .find(|t| *t < curr)
                        .map(|prev| curr.as_naive() - prev.as_naive())
                });
                row(entry, since_previous)
            })
            .collect();

        Self::with_rows(rows)
    }

    fn with_rows(rows: Vec<TimelineRow>) -> Self {
        let deltas: Vec<Duration> = rows.iter().filter_map(|r| r.since_previous).collect();
        let average = mean(&deltas);
        Self {
            rows,
            average_duration: average.map(format_duration).unwrap_or_else(|| "0".into()),
            average,
        }
    }
}

/// One user's pace across every document of a doctype
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    pub username: String,
    #[serde(skip)]
    pub average: Option<Duration>,
    /// Rendered `average`, `"0"` when there is none
    pub average_duration: String,
    /// Number of measured gaps between the user's consecutive changes
    pub transition_count: usize,
}

/// Gaps between consecutive changes of each user within each document.
/// Each history is one document's; a user's gaps never span two documents.
fn user_gaps(histories: &[Vec<StateHistoryEntry>]) -> BTreeMap<String, Vec<Duration>> {
    let mut gaps: BTreeMap<String, Vec<Duration>> = BTreeMap::new();
    for history in histories {
        let mut last_seen: BTreeMap<&str, Timestamp> = BTreeMap::new();
        for entry in sorted(history) {
            let (Some(user), Some(time)) = (entry.username.as_deref(), entry.modification_time)
            else {
                continue;
            };
            let previous = last_seen.insert(user, time);
            let deltas = gaps.entry(user.to_string()).or_default();
            if let Some(prev) = previous {
                deltas.push(time.as_naive() - prev.as_naive());
            }
        }
    }
    gaps
}

fn summary(username: &str, deltas: &[Duration]) -> UserSummary {
    let average = mean(deltas);
    UserSummary {
        username: username.to_string(),
        average_duration: average.map(format_duration).unwrap_or_else(|| "0".into()),
        average,
        transition_count: deltas.len(),
    }
}

/// Summary of every user with at least one measured gap, ordered by name
pub fn user_summaries(histories: &[Vec<StateHistoryEntry>]) -> Vec<UserSummary> {
    user_gaps(histories)
        .iter()
        .filter(|(_, deltas)| !deltas.is_empty())
        .map(|(user, deltas)| summary(user, deltas))
        .collect()
}

/// Summary of `username`; a user with no measured gap still gets a row
pub fn user_summary(histories: &[Vec<StateHistoryEntry>], username: &str) -> UserSummary {
    let gaps = user_gaps(histories);
    let deltas = gaps.get(username).map(Vec::as_slice).unwrap_or_default();
    summary(username, deltas)
}

fn mean(deltas: &[Duration]) -> Option<Duration> {
    if deltas.is_empty() {
        return None;
    }
    let total: Duration = deltas.iter().fold(Duration::zero(), |acc, d| acc + *d);
    Some(total / deltas.len() as i32)
}

fn row(entry: &StateHistoryEntry, since_previous: Option<Duration>) -> TimelineRow {
    TimelineRow {
        workflow_state: entry.state().to_string(),
        username: entry.username.clone().unwrap_or_default(),
        role: entry.role.clone().unwrap_or_default(),
        modification_time: entry.modification_time,
        since_previous,
        duration: since_previous
            .map(format_duration)
            .unwrap_or_else(|| "0".into()),
    }
}

/// `"{d}d {h}h {m}m"`, dropping the day part when it is zero
pub fn format_duration(d: Duration) -> String {
    let total = d.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else {
        format!("{}h {}m", hours, minutes)
    }
}
