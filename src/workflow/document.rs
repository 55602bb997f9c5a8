// SPDX-License-Identifier: MIT

//! Read-only view of the business document a workflow renders for

use serde_json::{Map, Value};

use super::types::StateHistoryEntry;

/// Child table the host appends state changes to
pub const STATE_CHANGE_FIELD: &str = "state_change";
/// Line items carried by a State Change record
pub const ITEMS_FIELD: &str = "items";
/// State assumed when a document carries no state at all
pub const DEFAULT_STATE: &str = "Draft";

/// Field map of a host document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentRecord {
    fields: Map<String, Value>,
}

impl DocumentRecord {
    /// Create an empty DocumentRecord
    pub fn empty() -> Self {
        Self { fields: Map::new() }
    }

    /// Wrap a JSON value; anything other than an object yields an empty record
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::empty(),
        }
    }

    /// Builder-style field insertion, used when assembling records by hand
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Get a top-level field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Get a nested field value by path segments
    pub fn get_segments<S: AsRef<str>>(&self, segments: &[S]) -> Option<&Value> {
        let (first, rest) = segments.split_first()?;
        let mut current = self.fields.get(first.as_ref())?;
        for part in rest {
            current = match current {
                Value::Object(map) => map.get(part.as_ref())?,
                Value::Array(items) => items.get(part.as_ref().parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Document's `workflow_state`, if set and non-empty
    pub fn workflow_state(&self) -> Option<&str> {
        self.get("workflow_state")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Rows of a child table as state history entries; malformed rows are skipped
    pub fn history(&self, table: &str) -> Vec<StateHistoryEntry> {
        match self.get(table) {
            Some(Value::Array(rows)) => rows
                .iter()
                .filter_map(|row| serde_json::from_value(row.clone()).ok())
                .collect(),
            _ => vec![],
        }
    }

    /// The embedded state-change history of a tracked document
    pub fn state_history(&self) -> Vec<StateHistoryEntry> {
        self.history(STATE_CHANGE_FIELD)
    }

    /// Current state: own `workflow_state`, else the last item's, else Draft
    pub fn current_state(&self) -> String {
        if let Some(state) = self.workflow_state() {
            return state.to_string();
        }
        match self.get(ITEMS_FIELD) {
            Some(Value::Array(items)) if !items.is_empty() => items
                .last()
                .and_then(|item| item.get("workflow_state"))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .unwrap_or(DEFAULT_STATE)
                .to_string(),
            _ => DEFAULT_STATE.to_string(),
        }
    }

    /// Convert to a JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

impl From<Value> for DocumentRecord {
    fn from(value: Value) -> Self {
        Self::from_json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_record() {
        let doc = DocumentRecord::empty();
        assert!(doc.get("anything").is_none());
        assert_eq!(doc.to_json(), json!({}));
    }

    #[test]
    fn test_non_object_is_empty() {
        let doc = DocumentRecord::from_json(json!([1, 2, 3]));
        assert_eq!(doc, DocumentRecord::empty());
    }

    #[test]
    fn test_get_segments() {
        let doc = DocumentRecord::from_json(json!({
            "customer": {"address": {"country": "India"}},
            "items": [{"qty": 3}]
        }));

        assert_eq!(
            doc.get_segments(&["customer", "address", "country"]),
            Some(&json!("India"))
        );
        assert_eq!(doc.get_segments(&["items", "0", "qty"]), Some(&json!(3)));
        assert_eq!(doc.get_segments(&["customer", "nonexistent"]), None);
        assert_eq!(doc.get_segments(&["customer", "address", "country", "code"]), None);
    }

    #[test]
    fn test_current_state_prefers_own_field() {
        let doc = DocumentRecord::empty()
            .with("workflow_state", json!("Approved"))
            .with("items", json!([{"workflow_state": "Pending"}]));
        assert_eq!(doc.current_state(), "Approved");
    }

    #[test]
    fn test_current_state_from_last_item() {
        let doc = DocumentRecord::empty().with(
            "items",
            json!([{"workflow_state": "Draft"}, {"workflow_state": "Pending"}]),
        );
        assert_eq!(doc.current_state(), "Pending");

        let doc = DocumentRecord::empty().with("items", json!([{"username": "a"}]));
        assert_eq!(doc.current_state(), "Draft");
    }

    #[test]
    fn test_current_state_defaults_to_draft() {
        assert_eq!(DocumentRecord::empty().current_state(), "Draft");
    }

    #[test]
    fn test_state_history_skips_malformed_rows() {
        let doc = DocumentRecord::from_json(json!({
            "state_change": [
                {"workflow_state": "Draft", "modification_time": "2025-01-01 09:00:00"},
                "garbage",
                {"workflow_state": "Approved", "modification_time": "2025-01-02 09:00:00"}
            ]
        }));
        let history = doc.state_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].state(), "Approved");
    }
}
