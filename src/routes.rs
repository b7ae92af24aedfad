//! REST endpoints for the intake wizard.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, IntakeError, SessionError};
use crate::intake::{NavAction, PageView, WizardController, WizardPage, pages};
use crate::model::PredictionService;
use crate::schema::{FeatureSchema, FieldValue};
use crate::session::SessionStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub service: PredictionService,
}

/// Build the Axum router for the intake API.
pub fn intake_routes(sessions: Arc<SessionStore>, service: PredictionService) -> Router {
    let state = AppState { sessions, service };

    Router::new()
        .route("/health", get(health))
        .route("/api/schema", get(schema))
        .route("/api/sessions", post(create_session))
        .route(
            "/api/sessions/{id}",
            get(get_session).delete(delete_session),
        )
        .route("/api/sessions/{id}/fields", post(update_fields))
        .route("/api/sessions/{id}/next", post(next_page))
        .route("/api/sessions/{id}/back", post(previous_page))
        .route("/api/sessions/{id}/start-over", post(start_over))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Errors ──────────────────────────────────────────────────────────────

/// Error body returned by every endpoint.
#[derive(Debug)]
pub struct ApiError(Error);

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Session(SessionError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Error::Intake(
                IntakeError::InvalidTransition { .. }
                | IntakeError::IncompleteIntake { .. }
                | IntakeError::NotOnResults { .. },
            ) => StatusCode::CONFLICT,
            Error::Intake(_) => StatusCode::BAD_REQUEST,
            Error::Prediction(_) => StatusCode::BAD_GATEWAY,
            Error::Model(_) | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl From<IntakeError> for ApiError {
    fn from(e: IntakeError) -> Self {
        Self(e.into())
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self.0, "Request failed");
        } else {
            debug!(error = %self.0, %status, "Request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

// ── Health / schema ─────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let sessions = state.sessions.len().await;
    Json(serde_json::json!({
        "status": "ok",
        "service": "fibro-intake",
        "model": state.service.model_name(),
        "sessions": sessions,
    }))
}

/// GET /api/schema
///
/// The feature list in model column order, plus which widgets each page shows.
async fn schema() -> impl IntoResponse {
    let schema = FeatureSchema::fibromyalgia();
    let layout: Vec<_> = WizardPage::ALL
        .iter()
        .map(|page| {
            serde_json::json!({
                "page": page,
                "title": page.title(),
                "fields": pages::widgets(*page).iter().map(|w| w.key).collect::<Vec<_>>(),
            })
        })
        .collect();
    Json(serde_json::json!({
        "features": schema.fields(),
        "pages": layout,
    }))
}

// ── Sessions ────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct FieldsRequest {
    #[serde(default)]
    values: BTreeMap<String, FieldValue>,
}

/// Run `f` on the session, then render whatever page it ends up on.
async fn render_after<F>(state: &AppState, id: Uuid, f: F) -> Result<Json<PageView>, ApiError>
where
    F: FnOnce(&mut WizardController) -> Result<(), IntakeError>,
{
    let service = &state.service;
    let view = state
        .sessions
        .with_session(id, |controller| {
            f(controller)?;
            Ok::<_, IntakeError>(controller.render(service))
        })
        .await??;
    Ok(Json(view))
}

/// POST /api/sessions
async fn create_session(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let id = state.sessions.create().await;
    let Json(view) = render_after(&state, id, |_| Ok(())).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "session_id": id, "view": view })),
    ))
}

/// GET /api/sessions/{id}
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PageView>, ApiError> {
    render_after(&state, id, |_| Ok(())).await
}

/// POST /api/sessions/{id}/fields
async fn update_fields(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<FieldsRequest>,
) -> Result<Json<PageView>, ApiError> {
    debug!(session_id = %id, count = req.values.len(), "Updating fields");
    render_after(&state, id, |c| c.apply(&req.values)).await
}

/// POST /api/sessions/{id}/next
///
/// Values in the body are stored before moving on, like a form submit.
/// A move the page does not offer stores nothing.
async fn next_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<FieldsRequest>,
) -> Result<Json<PageView>, ApiError> {
    render_after(&state, id, |c| {
        let page = c.submit(NavAction::Next, &req.values)?;
        info!(session_id = %id, %page, "Advanced");
        Ok(())
    })
    .await
}

/// POST /api/sessions/{id}/back
async fn previous_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<FieldsRequest>,
) -> Result<Json<PageView>, ApiError> {
    render_after(&state, id, |c| {
        let page = c.submit(NavAction::Back, &req.values)?;
        info!(session_id = %id, %page, "Went back");
        Ok(())
    })
    .await
}

/// POST /api/sessions/{id}/start-over
async fn start_over(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PageView>, ApiError> {
    render_after(&state, id, |c| {
        c.start_over()?;
        info!(session_id = %id, "Started over");
        Ok(())
    })
    .await
}

/// DELETE /api/sessions/{id}
async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(SessionError::NotFound { id }.into())
    }
}
