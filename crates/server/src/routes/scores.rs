use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use showrunner_core::{
    DeleteScoreRequest, JudgePerformanceView, Score, ScoreDeletionRecord, ScoringStatus,
    SubmitScoreRequest,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::RequestCaller;
use crate::routes::performances::StatusQuery;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/performances/{id}/scores",
    params(("id" = Uuid, Path, description = "Performance ID")),
    responses((status = 200, description = "Every judge's score", body = Vec<Score>)),
    tag = "scores"
)]
pub async fn list_scores(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Score>>, AppError> {
    Ok(Json(state.services.ledger.list(&caller, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/performances/{id}/scoring-status",
    params(("id" = Uuid, Path, description = "Performance ID")),
    responses((status = 200, description = "Completion against the roster", body = ScoringStatus)),
    tag = "scores"
)]
pub async fn get_scoring_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScoringStatus>, AppError> {
    Ok(Json(state.services.ledger.status(id).await?))
}

/// Creates or overwrites the judge's score.
#[utoipa::path(
    put,
    path = "/api/performances/{id}/scores/{judge_id}",
    params(
        ("id" = Uuid, Path, description = "Performance ID"),
        ("judge_id" = Uuid, Path, description = "Judge ID"),
    ),
    request_body = SubmitScoreRequest,
    responses(
        (status = 200, description = "Stored score", body = Score),
        (status = 400, description = "Dimension out of range", body = crate::error::ErrorResponse),
        (status = 409, description = "Performance withdrawn", body = crate::error::ErrorResponse),
    ),
    tag = "scores"
)]
pub async fn submit_score(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path((id, judge_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<SubmitScoreRequest>,
) -> Result<Json<Score>, AppError> {
    let score = state
        .services
        .ledger
        .submit(&caller, id, judge_id, payload)
        .await?;
    Ok(Json(score))
}

#[utoipa::path(
    get,
    path = "/api/performances/{id}/scores/{judge_id}",
    params(
        ("id" = Uuid, Path, description = "Performance ID"),
        ("judge_id" = Uuid, Path, description = "Judge ID"),
    ),
    responses(
        (status = 200, description = "Score", body = Score),
        (status = 404, description = "Not scored yet", body = crate::error::ErrorResponse),
    ),
    tag = "scores"
)]
pub async fn get_score(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path((id, judge_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Score>, AppError> {
    Ok(Json(state.services.ledger.get(&caller, id, judge_id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/performances/{id}/scores/{judge_id}",
    params(
        ("id" = Uuid, Path, description = "Performance ID"),
        ("judge_id" = Uuid, Path, description = "Judge ID"),
    ),
    request_body = DeleteScoreRequest,
    responses((status = 204, description = "Score deleted and audited")),
    tag = "scores"
)]
pub async fn delete_score(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path((id, judge_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<DeleteScoreRequest>,
) -> Result<StatusCode, AppError> {
    state
        .services
        .ledger
        .delete(&caller, id, judge_id, &payload.reason)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/performances/{id}/score-deletions",
    params(("id" = Uuid, Path, description = "Performance ID")),
    responses((status = 200, description = "Deletion audit", body = Vec<ScoreDeletionRecord>)),
    tag = "scores"
)]
pub async fn list_score_deletions(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ScoreDeletionRecord>>, AppError> {
    Ok(Json(state.services.ledger.deletions(&caller, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/events/{id}/judges/{judge_id}/performances",
    params(
        ("id" = Uuid, Path, description = "Event ID"),
        ("judge_id" = Uuid, Path, description = "Judge ID"),
        StatusQuery,
    ),
    responses((status = 200, description = "Judge dashboard, withdrawn excluded", body = Vec<JudgePerformanceView>)),
    tag = "judges"
)]
pub async fn judge_performances(
    State(state): State<AppState>,
    RequestCaller(caller): RequestCaller,
    Path((id, judge_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<JudgePerformanceView>>, AppError> {
    let views = state
        .services
        .ledger
        .judge_performances(&caller, id, judge_id, query.status)
        .await?;
    Ok(Json(views))
}
