use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use showrunner_core::{AssignJudgeRequest, JudgeAssignment, PerformanceRosterRequest};
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::RequestCaller;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/events/{id}/judges",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses((status = 200, description = "Event roster", body = Vec<JudgeAssignment>)),
    tag = "judges"
)]
pub async fn list_judges(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<JudgeAssignment>>, AppError> {
    Ok(Json(state.services.roster.list(&caller, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/events/{id}/judges",
    params(("id" = Uuid, Path, description = "Event ID")),
    request_body = AssignJudgeRequest,
    responses((status = 201, description = "Judge on the roster", body = JudgeAssignment)),
    tag = "judges"
)]
pub async fn assign_judge(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignJudgeRequest>,
) -> Result<(StatusCode, Json<JudgeAssignment>), AppError> {
    let assignment = state
        .services
        .roster
        .assign(&caller, id, payload.judge_id)
        .await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

#[utoipa::path(
    delete,
    path = "/api/events/{id}/judges/{judge_id}",
    params(
        ("id" = Uuid, Path, description = "Event ID"),
        ("judge_id" = Uuid, Path, description = "Judge ID"),
    ),
    responses((status = 204, description = "Judge removed from the roster")),
    tag = "judges"
)]
pub async fn unassign_judge(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path((id, judge_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    state.services.roster.unassign(&caller, id, judge_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Judges expected to score this performance instead of the event roster.
#[utoipa::path(
    put,
    path = "/api/performances/{id}/roster",
    params(("id" = Uuid, Path, description = "Performance ID")),
    request_body = PerformanceRosterRequest,
    responses((status = 200, description = "Effective roster", body = Vec<Uuid>)),
    tag = "judges"
)]
pub async fn set_performance_roster(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<Uuid>,
    Json(payload): Json<PerformanceRosterRequest>,
) -> Result<Json<Vec<Uuid>>, AppError> {
    let roster = state
        .services
        .roster
        .set_performance_roster(&caller, id, &payload.judge_ids)
        .await?;
    Ok(Json(roster))
}

#[utoipa::path(
    delete,
    path = "/api/performances/{id}/roster",
    params(("id" = Uuid, Path, description = "Performance ID")),
    responses((status = 200, description = "Event roster applies again", body = Vec<Uuid>)),
    tag = "judges"
)]
pub async fn clear_performance_roster(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Uuid>>, AppError> {
    let roster = state
        .services
        .roster
        .set_performance_roster(&caller, id, &[])
        .await?;
    Ok(Json(roster))
}
