// SPDX-License-Identifier: MIT

//! Serde types for workflow definitions and state history
//!
//! These mirror the rows the host framework hands out: workflow transitions,
//! workflow document states, and the state-change child table attached to a
//! tracked document.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::reminder::{DocumentShift, Holidays};

/// One directed, optionally guarded edge of the workflow graph
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct Transition {
    pub state: String,
    pub next_state: String,
    #[serde(default)]
    pub action: String,
    /// Restricted boolean expression over document fields
    #[serde(default)]
    pub condition: Option<String>,
    /// Role permitted to execute the transition
    #[serde(default)]
    pub allowed: Option<String>,
}

impl Transition {
    pub fn new(
        state: impl Into<String>,
        next_state: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            state: state.into(),
            next_state: next_state.into(),
            action: action.into(),
            condition: None,
            allowed: None,
        }
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_allowed(mut self, role: impl Into<String>) -> Self {
        self.allowed = Some(role.into());
        self
    }

    /// The guard, if one is present and non-blank
    pub fn guard(&self) -> Option<&str> {
        self.condition
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// A declared workflow state in progression order
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct WorkflowStateDef {
    #[serde(default)]
    pub state: String,
    /// Role allowed to edit the document while in this state
    #[serde(default, alias = "allow_edit", deserialize_with = "roles_from_any")]
    pub roles: Vec<String>,
}

impl WorkflowStateDef {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            roles: vec![],
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }
}

/// Accept either a single role (`allow_edit: Approver`), a list, or null
fn roles_from_any<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Roles {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<Roles>::deserialize(deserializer)? {
        None => vec![],
        Some(Roles::One(s)) if s.is_empty() => vec![],
        Some(Roles::One(s)) => vec![s],
        Some(Roles::Many(v)) => v,
    })
}

/// Point in time a state change was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub NaiveDateTime);

impl Timestamp {
    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl FromStr for Timestamp {
    type Err = chrono::ParseError;

    /// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.ffffff]`, `YYYY-MM-DDTHH:MM:SS`
    /// and bare dates
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self(dt.naive_utc()));
        }
        for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(Self(dt));
            }
        }
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")?;
        Ok(Self(date.and_hms_opt(0, 0, 0).unwrap_or_default()))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S"))
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(dt: NaiveDateTime) -> Self {
        Self(dt)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.format("%Y-%m-%d %H:%M:%S%.f").to_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Unparseable timestamps become `None` instead of failing the whole history
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}

/// One recorded state change of a document
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct StateHistoryEntry {
    #[serde(default)]
    pub workflow_state: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub modification_time: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl StateHistoryEntry {
    pub fn new(workflow_state: impl Into<String>, modification_time: Timestamp) -> Self {
        Self {
            workflow_state: Some(workflow_state.into()),
            modification_time: Some(modification_time),
            username: None,
            role: None,
        }
    }

    pub fn by(mut self, username: impl Into<String>, role: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.role = Some(role.into());
        self
    }

    /// Recorded state, or the empty string when absent
    pub fn state(&self) -> &str {
        self.workflow_state.as_deref().unwrap_or("")
    }
}

/// Everything needed to render one doctype's workflow, as stored on disk
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct WorkflowBundle {
    /// Doctype the workflow applies to
    pub doctype: String,
    #[serde(default)]
    pub transitions: Vec<Transition>,
    /// Declared states in progression order
    #[serde(default)]
    pub states: Vec<WorkflowStateDef>,
    /// Documents keyed by name
    #[serde(default)]
    pub documents: HashMap<String, serde_json::Value>,
    /// Working hours that reminders are scheduled over
    #[serde(default)]
    pub shift: Option<DocumentShift>,
    #[serde(default)]
    pub holidays: Holidays,
}
