// SPDX-License-Identifier: MIT

//! Typed error handling for statechange-rs
//!
//! Two families of errors exist. [`StateChangeError`] covers everything that
//! aborts a render (fetching documents, transitions and workflow states).
//! [`ConditionError`] describes why a condition could not be parsed; it never
//! escapes condition evaluation, which fails closed instead.

use thiserror::Error;

/// Top-level error type for statechange-rs
#[derive(Debug, Error)]
pub enum StateChangeError {
    /// Upstream retrieval failed (network, host error payload)
    #[error("Fetch error from {source_name}: {message}")]
    Fetch {
        source_name: String,
        message: String,
    },

    /// The doctype has no active workflow (no transitions or states)
    #[error("No active workflow found for document type '{0}'")]
    NoActiveWorkflow(String),

    /// The requested document does not exist in the source
    #[error("Document '{name}' of type '{doctype}' not found")]
    DocumentNotFound { doctype: String, name: String },

    /// No available transition from the current state carries this action
    #[error("Action '{action}' is not available from state '{state}'")]
    TransitionNotAllowed { action: String, state: String },

    /// A reminder could not be scheduled (no matching shift row, no working time)
    #[error("Cannot schedule reminder: {0}")]
    Schedule(String),

    /// Configuration errors (missing env vars, invalid base URL)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A condition rejected by `validate`
    #[error("Invalid condition '{condition}': {source}")]
    Condition {
        condition: String,
        #[source]
        source: ConditionError,
    },

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Malformed URLs
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

/// Errors produced while lexing or parsing a condition expression
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConditionError {
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unterminated string literal starting at offset {0}")]
    UnterminatedString(usize),

    #[error("unexpected token '{found}' at offset {offset}, expected {expected}")]
    UnexpectedToken {
        found: String,
        offset: usize,
        expected: &'static str,
    },

    #[error("unexpected end of expression, expected {0}")]
    UnexpectedEnd(&'static str),

    #[error("function '{0}' is not available in conditions")]
    UnknownFunction(String),

    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),

    #[error("empty expression")]
    Empty,
}

impl StateChangeError {
    /// Create a fetch error
    pub fn fetch(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error belongs to the fetch-failure class that stops a render:
    /// anything that goes wrong retrieving or decoding upstream data
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            Self::Fetch { .. }
                | Self::NoActiveWorkflow(_)
                | Self::DocumentNotFound { .. }
                | Self::Http(_)
                | Self::Io(_)
                | Self::Json(_)
                | Self::Yaml(_)
                | Self::Url(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StateChangeError>;
