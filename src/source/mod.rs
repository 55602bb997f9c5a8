// SPDX-License-Identifier: MIT

//! Where documents and workflow definitions come from
//!
//! - `FileSource` - a bundle loaded from disk
//! - `FrappeSource` - the host's REST API

mod file;
mod frappe;

pub use file::FileSource;
pub use frappe::FrappeSource;

use async_trait::async_trait;

use crate::error::Result;
use crate::workflow::document::DocumentRecord;
use crate::workflow::types::{Transition, WorkflowStateDef};

/// Fetch operations the renderer depends on
#[async_trait]
pub trait WorkflowSource: Send + Sync {
    /// Short name used in logs and fetch errors
    fn name(&self) -> &str;

    /// The document `name` of type `doctype`
    async fn fetch_document(&self, doctype: &str, name: &str) -> Result<DocumentRecord>;

    /// Transitions of the doctype's active workflow, in declared order
    async fn fetch_transitions(&self, doctype: &str) -> Result<Vec<Transition>>;

    /// Declared states of the doctype's active workflow, in progression order
    async fn fetch_workflow_states(&self, doctype: &str) -> Result<Vec<WorkflowStateDef>>;
}
