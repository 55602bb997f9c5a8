// SPDX-License-Identifier: MIT

//! Workflow bundle loader - YAML/JSON file loading and parsing

use super::types::WorkflowBundle;
use crate::error::Result;
use std::fs;
use std::path::Path;

/// Loads workflow bundles from YAML or JSON files
pub struct WorkflowLoader;

impl WorkflowLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a bundle; `.json` files are parsed as JSON, anything else as YAML
    pub fn load_bundle<P: AsRef<Path>>(&self, path: P) -> Result<WorkflowBundle> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        log::debug!("Loaded workflow bundle from {}", path.display());

        if path.extension().is_some_and(|ext| ext == "json") {
            Self::parse_json(&content)
        } else {
            Self::parse_yaml(&content)
        }
    }

    /// Parse a bundle from a YAML string
    pub fn parse_yaml(content: &str) -> Result<WorkflowBundle> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parse a bundle from a JSON string
    pub fn parse_json(content: &str) -> Result<WorkflowBundle> {
        Ok(serde_json::from_str(content)?)
    }
}

impl Default for WorkflowLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BUNDLE: &str = r#"
doctype: Purchase Order
states:
  - state: Draft
    allow_edit: Purchase User
  - state: Pending
    allow_edit: Purchase Manager
  - state: Approved
transitions:
  - state: Draft
    next_state: Pending
    action: Submit
    allowed: Purchase User
  - state: Pending
    next_state: Approved
    action: Approve
    allowed: Purchase Manager
    condition: doc.grand_total < 10000
documents:
  PO-0001:
    grand_total: 2500
    workflow_state: Pending
    state_change:
      - workflow_state: Draft
        modification_time: "2025-02-01 09:00:00"
      - workflow_state: Pending
        modification_time: "2025-02-01 10:30:00"
"#;

    #[test]
    fn test_parse_yaml_bundle() {
        let bundle = WorkflowLoader::parse_yaml(BUNDLE).unwrap();
        assert_eq!(bundle.doctype, "Purchase Order");
        assert_eq!(bundle.states.len(), 3);
        assert_eq!(bundle.states[1].roles, vec!["Purchase Manager".to_string()]);
        assert!(bundle.states[2].roles.is_empty());
        assert_eq!(bundle.transitions.len(), 2);
        assert_eq!(
            bundle.transitions[1].condition.as_deref(),
            Some("doc.grand_total < 10000")
        );
        assert_eq!(bundle.documents["PO-0001"]["grand_total"], 2500);
    }

    #[test]
    fn test_parse_bundle_with_shift() {
        let yaml = r#"
doctype: Purchase Order
shift:
  doctype_name: Purchase Order
  start_time: "09:00:00"
  end_time: "18:00:00"
  break_start_time: "13:00:00"
  break_end_time: "14:00:00"
  shift_details:
    - condition: doc.grand_total > 10000
      total_time: 4
holidays:
  - "2025-12-25"
"#;
        let bundle = WorkflowLoader::parse_yaml(yaml).unwrap();
        let shift = bundle.shift.unwrap();
        assert_eq!(shift.shift_details[0].total_time, 4.0);
        assert_eq!(shift.hours.end_time.to_string(), "18:00:00");
        let christmas = chrono::NaiveDate::from_ymd_opt(2025, 12, 25).unwrap();
        assert!(bundle.holidays.contains(christmas));
    }

    #[test]
    fn test_parse_json_bundle() {
        let json = r#"{
            "doctype": "Leave Application",
            "transitions": [{"state": "Open", "next_state": "Approved", "action": "Approve"}]
        }"#;
        let bundle = WorkflowLoader::parse_json(json).unwrap();
        assert_eq!(bundle.doctype, "Leave Application");
        assert!(bundle.states.is_empty());
        assert!(bundle.documents.is_empty());
        assert!(bundle.shift.is_none());
    }

    #[test]
    fn test_load_bundle_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(BUNDLE.as_bytes()).unwrap();

        let bundle = WorkflowLoader::new().load_bundle(file.path()).unwrap();
        assert_eq!(bundle.transitions[0].action, "Submit");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = WorkflowLoader::new().load_bundle("/nonexistent/bundle.yaml");
        assert!(matches!(result, Err(crate::error::StateChangeError::Io(_))));
    }

    #[test]
    fn test_invalid_yaml_returns_error() {
        let yaml = r#"
doctype:
  - invalid structure
"#;
        assert!(WorkflowLoader::parse_yaml(yaml).is_err());
    }
}
