// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::path::Path;

use super::WorkflowSource;
use crate::error::{Result, StateChangeError};
use crate::workflow::document::DocumentRecord;
use crate::workflow::loader::WorkflowLoader;
use crate::workflow::types::{Transition, WorkflowBundle, WorkflowStateDef};

/// Serves a single doctype's workflow from an in-memory bundle
pub struct FileSource {
    bundle: WorkflowBundle,
}

impl FileSource {
    pub fn new(bundle: WorkflowBundle) -> Self {
        Self { bundle }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(WorkflowLoader::new().load_bundle(path)?))
    }

    pub fn bundle(&self) -> &WorkflowBundle {
        &self.bundle
    }

    fn check_doctype(&self, doctype: &str) -> Result<()> {
        if self.bundle.doctype == doctype {
            Ok(())
        } else {
            Err(StateChangeError::NoActiveWorkflow(doctype.to_string()))
        }
    }
}

#[async_trait]
impl WorkflowSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch_document(&self, doctype: &str, name: &str) -> Result<DocumentRecord> {
        self.check_doctype(doctype)?;
        self.bundle
            .documents
            .get(name)
            .cloned()
            .map(DocumentRecord::from_json)
            .ok_or_else(|| StateChangeError::DocumentNotFound {
                doctype: doctype.to_string(),
                name: name.to_string(),
            })
    }

    async fn fetch_transitions(&self, doctype: &str) -> Result<Vec<Transition>> {
        self.check_doctype(doctype)?;
        non_empty(doctype, &self.bundle.transitions)
    }

    async fn fetch_workflow_states(&self, doctype: &str) -> Result<Vec<WorkflowStateDef>> {
        self.check_doctype(doctype)?;
        non_empty(doctype, &self.bundle.states)
    }
}

fn non_empty<T: Clone>(doctype: &str, rows: &[T]) -> Result<Vec<T>> {
    if rows.is_empty() {
        Err(StateChangeError::NoActiveWorkflow(doctype.to_string()))
    } else {
        Ok(rows.to_vec())
    }
}
