// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::env;
use url::Url;

use super::WorkflowSource;
use crate::error::{Result, StateChangeError};
use crate::workflow::document::DocumentRecord;
use crate::workflow::types::{Transition, WorkflowStateDef};

const GET_DOC_METHOD: &str = "frappe.client.get";
const TRANSITIONS_METHOD: &str =
    "workflow_transitions.workflow_transitions.doc_events.workflow.get_workflow_transitions";
const FIELDS_METHOD: &str =
    "workflow_transitions.workflow_transitions.doc_events.workflow.get_workflow_fields";

/// Talks to a Frappe site over its REST API
#[derive(Clone)]
pub struct FrappeSource {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl FrappeSource {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        api_secret: Option<String>,
    ) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(StateChangeError::config(format!(
                "FRAPPE_URL is not a base URL: {}",
                base_url
            )));
        }
        // sites served under a path prefix must keep it when methods are joined on
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let token = match (api_key, api_secret) {
            (Some(key), Some(secret)) => Some(format!("token {}:{}", key, secret)),
            (None, None) => None,
            _ => {
                return Err(StateChangeError::config(
                    "FRAPPE_API_KEY and FRAPPE_API_SECRET must be set together",
                ))
            }
        };

        log::info!(
            "Frappe source: base_url={}, authenticated={}",
            base_url,
            token.is_some()
        );

        Ok(Self {
            client: Client::new(),
            base_url,
            token,
        })
    }

    /// Build from `FRAPPE_URL`, `FRAPPE_API_KEY` and `FRAPPE_API_SECRET`
    pub fn from_env() -> Result<Self> {
        let base_url =
            env::var("FRAPPE_URL").map_err(|_| StateChangeError::config("FRAPPE_URL must be set"))?;
        let key = env::var("FRAPPE_API_KEY").ok().filter(|k| !k.is_empty());
        let secret = env::var("FRAPPE_API_SECRET").ok().filter(|s| !s.is_empty());
        Self::new(&base_url, key, secret)
    }

    fn method_url(&self, method: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base_url.join(&format!("api/method/{}", method))?;
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    /// Call a whitelisted method and return its `message` payload
    async fn call(&self, method: &str, query: &[(&str, &str)]) -> Result<(StatusCode, Value)> {
        let url = self.method_url(method, query)?;
        log::debug!("GET {}", url);

        let mut req = self.client.get(url).header("Accept", "application/json");
        if let Some(token) = &self.token {
            req = req.header("Authorization", token);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await?;
            return Ok((status, Value::String(text)));
        }

        let body: Value = resp.json().await?;
        Ok((status, message(body)))
    }

    async fn call_rows<T: DeserializeOwned>(&self, method: &str, doctype: &str) -> Result<Vec<T>> {
        let (status, payload) = self.call(method, &[("doc", doctype)]).await?;
        if !status.is_success() {
            return Err(api_error(method, status, &payload));
        }
        let rows: Vec<T> = match payload {
            Value::Null => vec![],
            other => serde_json::from_value(other)?,
        };
        if rows.is_empty() {
            return Err(StateChangeError::NoActiveWorkflow(doctype.to_string()));
        }
        Ok(rows)
    }
}

/// A successful response carries its payload under `message`
fn message(body: Value) -> Value {
    match body {
        Value::Object(mut map) => map.remove("message").unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn api_error(method: &str, status: StatusCode, payload: &Value) -> StateChangeError {
    let detail = payload.as_str().unwrap_or_default();
    StateChangeError::fetch("frappe", format!("{} returned {}: {}", method, status, detail))
}

#[async_trait]
impl WorkflowSource for FrappeSource {
    fn name(&self) -> &str {
        "frappe"
    }

    async fn fetch_document(&self, doctype: &str, name: &str) -> Result<DocumentRecord> {
        let (status, payload) = self
            .call(GET_DOC_METHOD, &[("doctype", doctype), ("name", name)])
            .await?;

        if status == StatusCode::NOT_FOUND || (status.is_success() && !payload.is_object()) {
            return Err(StateChangeError::DocumentNotFound {
                doctype: doctype.to_string(),
                name: name.to_string(),
            });
        }
        if !status.is_success() {
            return Err(api_error(GET_DOC_METHOD, status, &payload));
        }
        Ok(DocumentRecord::from_json(payload))
    }

    async fn fetch_transitions(&self, doctype: &str) -> Result<Vec<Transition>> {
        self.call_rows(TRANSITIONS_METHOD, doctype).await
    }

    async fn fetch_workflow_states(&self, doctype: &str) -> Result<Vec<WorkflowStateDef>> {
        self.call_rows(FIELDS_METHOD, doctype).await
    }
}
