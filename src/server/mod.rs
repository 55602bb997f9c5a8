// SPDX-License-Identifier: MIT

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::StateChangeError;
use crate::render::{render, render_document};
use crate::source::WorkflowSource;
use crate::workflow::condition::{evaluate_condition, parse, translate};
use crate::workflow::document::DocumentRecord;
use crate::workflow::progress::{generate_status_indicators, MarkerConfig};
use crate::workflow::reminder::{plan_reminder, DocumentShift, Holidays};
use crate::workflow::transitions::apply_transition;
use crate::workflow::types::{StateHistoryEntry, Timestamp, Transition, WorkflowStateDef};

#[derive(Clone, Default)]
pub struct AppState {
    /// Backs `/api/workflows/{doctype}/{name}`; absent when serving pure functions only
    pub source: Option<Arc<dyn WorkflowSource>>,
    pub markers: MarkerConfig,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/translate", post(translate_condition))
        .route("/api/evaluate", post(evaluate_expression))
        .route("/api/diagram", post(diagram))
        .route("/api/status", post(status_indicators))
        .route("/api/apply", post(apply_action))
        .route("/api/remind", post(schedule_reminder))
        .route("/api/workflows/{doctype}/{name}", get(fetch_and_render))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(port: u16, state: AppState) -> crate::error::Result<()> {
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Deserialize)]
struct TranslateRequest {
    condition: String,
}

async fn translate_condition(Json(payload): Json<TranslateRequest>) -> Json<Value> {
    let translated = translate(&payload.condition);
    match parse(&translated) {
        Ok(_) => Json(json!({ "translated": translated, "valid": true })),
        Err(e) => Json(json!({
            "translated": translated,
            "valid": false,
            "error": e.to_string()
        })),
    }
}

#[derive(Deserialize)]
struct EvaluateRequest {
    condition: String,
    #[serde(default)]
    doc: Value,
}

async fn evaluate_expression(Json(payload): Json<EvaluateRequest>) -> Json<Value> {
    let translated = translate(&payload.condition);
    let doc = DocumentRecord::from_json(payload.doc);
    let result = evaluate_condition(&translated, &doc);
    Json(json!({ "translated": translated, "result": result }))
}

#[derive(Deserialize)]
struct DiagramRequest {
    #[serde(default)]
    doc: Value,
    transitions: Vec<Transition>,
    #[serde(default)]
    states: Vec<WorkflowStateDef>,
    markers: Option<MarkerConfig>,
}

async fn diagram(
    State(state): State<AppState>,
    Json(payload): Json<DiagramRequest>,
) -> Json<Value> {
    let doc = DocumentRecord::from_json(payload.doc);
    let markers = payload.markers.unwrap_or(state.markers);
    let rendered = render_document(&doc, &payload.transitions, &payload.states, &markers);
    Json(json!({
        "mermaid": rendered.diagram.to_mermaid(),
        "dot": rendered.diagram.to_dot(),
        "workflow": rendered,
    }))
}

#[derive(Deserialize)]
struct StatusRequest {
    items: Vec<StateHistoryEntry>,
    states: Vec<String>,
    markers: Option<MarkerConfig>,
}

async fn status_indicators(
    State(state): State<AppState>,
    Json(payload): Json<StatusRequest>,
) -> Json<Value> {
    let markers = payload.markers.unwrap_or(state.markers);
    let rows = generate_status_indicators(&payload.items, &payload.states, &markers);
    Json(json!({ "rows": rows }))
}

fn now() -> Timestamp {
    Timestamp::from(chrono::Local::now().naive_local())
}

#[derive(Deserialize)]
struct ApplyRequest {
    doc: Value,
    transitions: Vec<Transition>,
    action: String,
    username: String,
    #[serde(default)]
    role: String,
    /// Defaults to the server's local time
    at: Option<Timestamp>,
}

async fn apply_action(Json(payload): Json<ApplyRequest>) -> (StatusCode, Json<Value>) {
    let doc = DocumentRecord::from_json(payload.doc);
    let at = payload.at.unwrap_or_else(now);
    match apply_transition(
        &doc,
        &payload.transitions,
        &payload.action,
        &payload.username,
        &payload.role,
        at,
    ) {
        Ok(moved) => (StatusCode::OK, Json(json!({ "doc": moved.to_json() }))),
        Err(e) => error_response(&e),
    }
}

#[derive(Deserialize)]
struct RemindRequest {
    doc: Value,
    transitions: Vec<Transition>,
    shift: DocumentShift,
    #[serde(default)]
    holidays: Holidays,
    from: Option<Timestamp>,
}

async fn schedule_reminder(Json(payload): Json<RemindRequest>) -> (StatusCode, Json<Value>) {
    let doc = DocumentRecord::from_json(payload.doc);
    let from = payload.from.unwrap_or_else(now);
    match plan_reminder(&payload.shift, &doc, &payload.transitions, from, &payload.holidays) {
        Ok(plan) => (StatusCode::OK, Json(json!(plan))),
        Err(e) => error_response(&e),
    }
}

/// Missing documents and workflows are 404, upstream failures 502, and a
/// request the workflow cannot satisfy 422
fn status_for(e: &StateChangeError) -> StatusCode {
    match e {
        StateChangeError::DocumentNotFound { .. } | StateChangeError::NoActiveWorkflow(_) => {
            StatusCode::NOT_FOUND
        }
        StateChangeError::TransitionNotAllowed { .. } | StateChangeError::Schedule(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        e if e.is_fetch_failure() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(e: &StateChangeError) -> (StatusCode, Json<Value>) {
    (status_for(e), Json(json!({"error": e.to_string()})))
}

async fn fetch_and_render(
    State(state): State<AppState>,
    Path((doctype, name)): Path<(String, String)>,
) -> (StatusCode, Json<Value>) {
    let Some(source) = state.source.as_deref() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "No workflow source configured"})),
        );
    };

    match render(source, &doctype, &name, &state.markers).await {
        Ok(rendered) => (StatusCode::OK, Json(json!(rendered))),
        Err(e) => error_response(&e),
    }
}
