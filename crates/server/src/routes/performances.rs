use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use showrunner_core::{CreatePerformanceRequest, Performance, PerformanceStatus, ProgramOrder};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::RequestCaller;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct StatusQuery {
    /// Only performances in this status
    pub status: Option<PerformanceStatus>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ReorderRequest {
    pub ordered_ids: Vec<Uuid>,
    /// Sequence version the client last saw.
    #[serde(default)]
    pub expected_version: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct AssignNumberRequest {
    pub number: u32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct SetStatusRequest {
    pub status: PerformanceStatus,
}

#[utoipa::path(
    get,
    path = "/api/events/{id}/program",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Running order", body = ProgramOrder),
        (status = 404, description = "Event not found", body = crate::error::ErrorResponse),
    ),
    tag = "program"
)]
pub async fn get_program(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProgramOrder>, AppError> {
    Ok(Json(state.services.sequencer.program(id).await?))
}

/// Renumbers the event's numbered performances.
///
/// Rejections carry the authoritative order in `current`.
#[utoipa::path(
    put,
    path = "/api/events/{id}/program",
    params(("id" = Uuid, Path, description = "Event ID")),
    request_body = ReorderRequest,
    responses(
        (status = 200, description = "New running order", body = ProgramOrder),
        (status = 409, description = "Invalid set or stale version", body = crate::error::ErrorResponse),
    ),
    tag = "program"
)]
pub async fn reorder_program(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReorderRequest>,
) -> Result<Json<ProgramOrder>, AppError> {
    let program = state
        .services
        .sequencer
        .reorder(&caller, id, &payload.ordered_ids, payload.expected_version)
        .await?;
    Ok(Json(program))
}

#[utoipa::path(
    get,
    path = "/api/events/{id}/performances",
    params(("id" = Uuid, Path, description = "Event ID"), StatusQuery),
    responses((status = 200, description = "Performances including withdrawn", body = Vec<Performance>)),
    tag = "performances"
)]
pub async fn list_performances(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<Uuid>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<Performance>>, AppError> {
    let performances = state
        .services
        .lifecycle
        .list_performances(&caller, id, query.status)
        .await?;
    Ok(Json(performances))
}

#[utoipa::path(
    post,
    path = "/api/events/{id}/performances",
    params(("id" = Uuid, Path, description = "Event ID")),
    request_body = CreatePerformanceRequest,
    responses(
        (status = 201, description = "Performance created", body = Performance),
        (status = 400, description = "Blank title", body = crate::error::ErrorResponse),
    ),
    tag = "performances"
)]
pub async fn create_performance(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreatePerformanceRequest>,
) -> Result<(StatusCode, Json<Performance>), AppError> {
    let performance = state
        .services
        .sequencer
        .create_performance(&caller, id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(performance)))
}

#[utoipa::path(
    get,
    path = "/api/performances/{id}",
    params(("id" = Uuid, Path, description = "Performance ID")),
    responses(
        (status = 200, description = "Performance", body = Performance),
        (status = 404, description = "Performance not found", body = crate::error::ErrorResponse),
    ),
    tag = "performances"
)]
pub async fn get_performance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Performance>, AppError> {
    Ok(Json(state.services.lifecycle.get_performance(id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/performances/{id}",
    params(("id" = Uuid, Path, description = "Performance ID")),
    responses((status = 204, description = "Deleted; later item numbers shift down")),
    tag = "performances"
)]
pub async fn delete_performance(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.services.sequencer.delete_performance(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/performances/{id}/number",
    params(("id" = Uuid, Path, description = "Performance ID")),
    request_body = AssignNumberRequest,
    responses(
        (status = 200, description = "Running order after the swap", body = ProgramOrder),
        (status = 400, description = "Number out of range", body = crate::error::ErrorResponse),
    ),
    tag = "program"
)]
pub async fn assign_number(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignNumberRequest>,
) -> Result<Json<ProgramOrder>, AppError> {
    let program = state
        .services
        .sequencer
        .assign_number(&caller, id, payload.number)
        .await?;
    Ok(Json(program))
}

#[utoipa::path(
    put,
    path = "/api/performances/{id}/status",
    params(("id" = Uuid, Path, description = "Performance ID")),
    request_body = SetStatusRequest,
    responses((status = 200, description = "Updated performance", body = Performance)),
    tag = "performances"
)]
pub async fn set_status(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetStatusRequest>,
) -> Result<Json<Performance>, AppError> {
    let performance = state
        .services
        .lifecycle
        .set_status(&caller, id, payload.status)
        .await?;
    Ok(Json(performance))
}

#[utoipa::path(
    post,
    path = "/api/performances/{id}/withdraw",
    params(("id" = Uuid, Path, description = "Performance ID")),
    responses((status = 200, description = "Hidden from judges", body = Performance)),
    tag = "performances"
)]
pub async fn withdraw_performance(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<Uuid>,
) -> Result<Json<Performance>, AppError> {
    Ok(Json(state.services.lifecycle.withdraw(&caller, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/performances/{id}/restore",
    params(("id" = Uuid, Path, description = "Performance ID")),
    responses((status = 200, description = "Visible to judges again", body = Performance)),
    tag = "performances"
)]
pub async fn restore_performance(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<Uuid>,
) -> Result<Json<Performance>, AppError> {
    Ok(Json(state.services.lifecycle.restore(&caller, id).await?))
}
