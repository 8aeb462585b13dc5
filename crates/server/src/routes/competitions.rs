use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use showrunner_core::{CompetitionEvent, CreateEventRequest, Performance, RankingEntry};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::RequestCaller;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ResetResponse {
    pub reset_performance_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct SetCurrentRequest {
    pub performance_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CurrentResponse {
    pub event_id: Uuid,
    pub performance: Option<Performance>,
}

#[utoipa::path(
    get,
    path = "/api/events",
    responses((status = 200, description = "All events, newest first", body = Vec<CompetitionEvent>)),
    tag = "events"
)]
pub async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<CompetitionEvent>>, AppError> {
    Ok(Json(state.services.catalog.list().await?))
}

#[utoipa::path(
    post,
    path = "/api/events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = CompetitionEvent),
        (status = 400, description = "Blank name", body = crate::error::ErrorResponse),
    ),
    tag = "events"
)]
pub async fn create_event(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Json(payload): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<CompetitionEvent>), AppError> {
    let event = state.services.catalog.create(&caller, payload).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

#[utoipa::path(
    get,
    path = "/api/events/{id}",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event", body = CompetitionEvent),
        (status = 404, description = "Event not found", body = crate::error::ErrorResponse),
    ),
    tag = "events"
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CompetitionEvent>, AppError> {
    Ok(Json(state.services.catalog.get(id).await?))
}

/// Cascades to performances, scores and rosters.
#[utoipa::path(
    delete,
    path = "/api/events/{id}",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 204, description = "Event deleted"),
        (status = 404, description = "Event not found", body = crate::error::ErrorResponse),
    ),
    tag = "events"
)]
pub async fn delete_event(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.services.catalog.delete(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/events/{id}/reset",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses((status = 200, description = "Statuses reset to scheduled", body = ResetResponse)),
    tag = "events"
)]
pub async fn reset_event(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<Uuid>,
) -> Result<Json<ResetResponse>, AppError> {
    let reset_performance_ids = state.services.lifecycle.reset_event(&caller, id).await?;
    Ok(Json(ResetResponse {
        reset_performance_ids,
    }))
}

#[utoipa::path(
    get,
    path = "/api/events/{id}/current",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses((status = 200, description = "Performance on stage, if any", body = CurrentResponse)),
    tag = "events"
)]
pub async fn get_current(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CurrentResponse>, AppError> {
    let performance = state.services.lifecycle.get_current(id).await?;
    Ok(Json(CurrentResponse {
        event_id: id,
        performance,
    }))
}

#[utoipa::path(
    put,
    path = "/api/events/{id}/current",
    params(("id" = Uuid, Path, description = "Event ID")),
    request_body = SetCurrentRequest,
    responses((status = 200, description = "Pointer moved", body = CurrentResponse)),
    tag = "events"
)]
pub async fn set_current(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetCurrentRequest>,
) -> Result<Json<CurrentResponse>, AppError> {
    let performance = state
        .services
        .lifecycle
        .set_current(&caller, id, payload.performance_id)
        .await?;
    Ok(Json(CurrentResponse {
        event_id: id,
        performance: Some(performance),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/events/{id}/current",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses((status = 204, description = "Pointer cleared")),
    tag = "events"
)]
pub async fn clear_current(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.services.lifecycle.clear_current(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/events/{id}/rankings",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses((status = 200, description = "Ranked performances", body = Vec<RankingEntry>)),
    tag = "scores"
)]
pub async fn get_rankings(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<RankingEntry>>, AppError> {
    Ok(Json(state.services.ledger.rankings(&caller, id).await?))
}
