// SPDX-License-Identifier: MIT

//! Render pipeline: fetch, gate, classify, describe
//!
//! [`render`] fetches the document, the doctype's transitions and its declared
//! states from a [`WorkflowSource`] and hands them to [`render_document`].
//! Any fetch failure aborts the whole render: nothing partial is returned.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::error::Result;
use crate::source::WorkflowSource;
use crate::workflow::diagram::WorkflowDiagram;
use crate::workflow::document::{DocumentRecord, ITEMS_FIELD};
use crate::workflow::history::Timeline;
use crate::workflow::progress::{generate_status_indicators, role_levels, MarkerConfig, RoleLevel};
use crate::workflow::transitions::{filter_transitions, next_roles};
use crate::workflow::types::{StateHistoryEntry, Transition, WorkflowStateDef};

/// Everything the host needs to draw one document's workflow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedWorkflow {
    pub current_state: String,
    /// Transitions whose condition holds, in declared order
    pub transitions: Vec<Transition>,
    pub diagram: WorkflowDiagram,
    /// Declared state labels, the columns of `status_rows`
    pub states: Vec<String>,
    pub status_rows: Vec<Vec<String>>,
    pub role_levels: Vec<RoleLevel>,
    pub next_roles: BTreeSet<String>,
    pub timeline: Timeline,
}

/// Fetch and render `doctype`/`name`
pub async fn render(
    source: &dyn WorkflowSource,
    doctype: &str,
    name: &str,
    config: &MarkerConfig,
) -> Result<RenderedWorkflow> {
    let fetched = async {
        let doc = source.fetch_document(doctype, name).await?;
        let (transitions, states) = tokio::try_join!(
            source.fetch_transitions(doctype),
            source.fetch_workflow_states(doctype)
        )?;
        Ok::<_, crate::error::StateChangeError>((doc, transitions, states))
    }
    .await;

    let (doc, transitions, states) = match fetched {
        Ok(parts) => parts,
        Err(e) => {
            log::error!(
                "Cannot render workflow for {} '{}' via {}: {}",
                doctype,
                name,
                source.name(),
                e
            );
            return Err(e);
        }
    };

    log::info!(
        "Rendering {} '{}': {} transitions, {} states",
        doctype,
        name,
        transitions.len(),
        states.len()
    );
    Ok(render_document(&doc, &transitions, &states, config))
}

/// Render already-fetched inputs
pub fn render_document(
    doc: &DocumentRecord,
    transitions: &[Transition],
    states: &[WorkflowStateDef],
    config: &MarkerConfig,
) -> RenderedWorkflow {
    let history = doc.state_history();
    let current_state = doc.current_state();
    let transitions = filter_transitions(transitions, doc);
    let diagram = WorkflowDiagram::build(&transitions, &history);

    let ordered: Vec<String> = states.iter().map(|s| s.state.clone()).collect();
    let items = status_items(doc);
    let status_rows = generate_status_indicators(&items, &ordered, config);
    let role_levels = role_levels(states, &items, config);
    let next_roles = next_roles(&current_state, &transitions, doc);
    let timeline = Timeline::build(&history);

    RenderedWorkflow {
        current_state,
        transitions,
        diagram,
        states: ordered,
        status_rows,
        role_levels,
        next_roles,
        timeline,
    }
}

/// Line items of a State Change record, or the document itself as one item
fn status_items(doc: &DocumentRecord) -> Vec<StateHistoryEntry> {
    let items = doc.history(ITEMS_FIELD);
    if !items.is_empty() {
        return items;
    }
    vec![StateHistoryEntry {
        workflow_state: doc.workflow_state().map(str::to_string),
        ..Default::default()
    }]
}
