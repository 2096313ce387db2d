//! Extraction handlers: run triggers, stop, status, session lookup.

use crate::api::AppState;
use crate::error::Error;
use crate::types::{HarvestStatus, RunParams, SessionId, SessionSnapshot};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for starting a single-query run
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StartRunRequest {
    /// The search query to run
    pub query: String,

    /// Run tuning (result cap, ordering, publication window)
    #[serde(flatten)]
    pub params: RunParams,
}

/// Request body for starting a targeted run
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TargetedRunRequest {
    /// Ad hoc query list, processed in order
    pub queries: Vec<String>,

    /// Per-query result cap (default: 25)
    #[serde(default = "default_targeted_max_results")]
    pub max_results: u32,
}

/// Response for accepted run-start requests
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RunStartedResponse {
    /// Identifier of the newly created session
    pub session_id: SessionId,
    /// Always "started"
    pub status: String,
}

/// Response for accepted stop requests
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StopResponse {
    /// Identifier of the session being stopped
    pub session_id: SessionId,
    /// Always "stopping" - the stop completes at the next strategy boundary
    pub status: String,
}

/// POST /extraction/run - Start a single-query extraction run
#[utoipa::path(
    post,
    path = "/api/v1/extraction/run",
    tag = "extraction",
    request_body = StartRunRequest,
    responses(
        (status = 202, description = "Run started", body = RunStartedResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "A run is already in progress")
    )
)]
pub async fn start_single_run(
    State(state): State<AppState>,
    Json(request): Json<StartRunRequest>,
) -> Result<(StatusCode, Json<RunStartedResponse>), Error> {
    let session_id = state
        .harvester
        .start_single(request.query, request.params)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(RunStartedResponse {
            session_id,
            status: "started".to_string(),
        }),
    ))
}

/// POST /extraction/comprehensive - Start a comprehensive run over the catalog
#[utoipa::path(
    post,
    path = "/api/v1/extraction/comprehensive",
    tag = "extraction",
    responses(
        (status = 202, description = "Run started", body = RunStartedResponse),
        (status = 409, description = "A run is already in progress")
    )
)]
pub async fn start_comprehensive_run(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<RunStartedResponse>), Error> {
    let session_id = state.harvester.start_comprehensive().await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(RunStartedResponse {
            session_id,
            status: "started".to_string(),
        }),
    ))
}

/// POST /extraction/targeted - Start a targeted run over an ad hoc query list
#[utoipa::path(
    post,
    path = "/api/v1/extraction/targeted",
    tag = "extraction",
    request_body = TargetedRunRequest,
    responses(
        (status = 202, description = "Run started", body = RunStartedResponse),
        (status = 400, description = "Empty query list"),
        (status = 409, description = "A run is already in progress")
    )
)]
pub async fn start_targeted_run(
    State(state): State<AppState>,
    Json(request): Json<TargetedRunRequest>,
) -> Result<(StatusCode, Json<RunStartedResponse>), Error> {
    let session_id = state
        .harvester
        .start_targeted(request.queries, request.max_results)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(RunStartedResponse {
            session_id,
            status: "started".to_string(),
        }),
    ))
}

/// POST /extraction/stop - Request a cooperative stop of the active run
#[utoipa::path(
    post,
    path = "/api/v1/extraction/stop",
    tag = "extraction",
    responses(
        (status = 202, description = "Stop requested", body = StopResponse),
        (status = 409, description = "No run is active")
    )
)]
pub async fn stop_run(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<StopResponse>), Error> {
    let session_id = state.harvester.stop_run().await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(StopResponse {
            session_id,
            status: "stopping".to_string(),
        }),
    ))
}

/// GET /extraction/status - Current status snapshot
#[utoipa::path(
    get,
    path = "/api/v1/extraction/status",
    tag = "extraction",
    responses(
        (status = 200, description = "Status snapshot", body = HarvestStatus)
    )
)]
pub async fn extraction_status(State(state): State<AppState>) -> Json<HarvestStatus> {
    Json(state.harvester.status().await)
}

/// GET /extraction/sessions/:id - Fetch one session by identifier
#[utoipa::path(
    get,
    path = "/api/v1/extraction/sessions/{id}",
    tag = "extraction",
    params(
        ("id" = String, Path, description = "Session identifier")
    ),
    responses(
        (status = 200, description = "Session snapshot", body = SessionSnapshot),
        (status = 404, description = "Session not found")
    )
)]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, Error> {
    let session_id = SessionId::from(id);
    let row = state
        .harvester
        .db
        .get_session(&session_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("session {}", session_id)))?;

    Ok(Json(SessionSnapshot::from(row)))
}

fn default_targeted_max_results() -> u32 {
    25
}
