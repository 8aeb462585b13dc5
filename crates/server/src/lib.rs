pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Showrunner API",
        version = "0.1.0",
        description = "Running order, performance lifecycle and judging for live competitions"
    ),
    paths(
        routes::health_check,
        routes::list_events,
        routes::create_event,
        routes::get_event,
        routes::delete_event,
        routes::reset_event,
        routes::get_current,
        routes::set_current,
        routes::clear_current,
        routes::get_rankings,
        routes::get_program,
        routes::reorder_program,
        routes::list_performances,
        routes::create_performance,
        routes::get_performance,
        routes::delete_performance,
        routes::assign_number,
        routes::set_status,
        routes::withdraw_performance,
        routes::restore_performance,
        routes::list_judges,
        routes::assign_judge,
        routes::unassign_judge,
        routes::set_performance_roster,
        routes::clear_performance_roster,
        routes::judge_performances,
        routes::list_scores,
        routes::get_scoring_status,
        routes::submit_score,
        routes::get_score,
        routes::delete_score,
        routes::list_score_deletions,
        routes::quote_fee,
        routes::sse::events_stream,
    ),
    components(schemas(
        routes::HealthResponse,
        routes::ResetResponse,
        routes::SetCurrentRequest,
        routes::CurrentResponse,
        routes::ReorderRequest,
        routes::AssignNumberRequest,
        routes::SetStatusRequest,
        error::ErrorResponse,
        showrunner_core::CompetitionEvent,
        showrunner_core::CreateEventRequest,
        showrunner_core::ProgramOrder,
        showrunner_core::Performance,
        showrunner_core::PerformanceStatus,
        showrunner_core::StatusTransition,
        showrunner_core::CreatePerformanceRequest,
        showrunner_core::JudgePerformanceView,
        showrunner_core::Score,
        showrunner_core::ScoreDimensions,
        showrunner_core::SubmitScoreRequest,
        showrunner_core::DeleteScoreRequest,
        showrunner_core::ScoreDeletionRecord,
        showrunner_core::ScoringStatus,
        showrunner_core::RankingEntry,
        showrunner_core::JudgeAssignment,
        showrunner_core::AssignJudgeRequest,
        showrunner_core::PerformanceRosterRequest,
        showrunner_core::FeeInput,
        showrunner_core::FeeQuote,
        showrunner_core::MasteryLevel,
        showrunner_core::PerformanceType,
        events::EventEnvelope,
        events::Event,
    )),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "events", description = "Competition events, reset and current performance"),
        (name = "program", description = "Running order and item numbers"),
        (name = "performances", description = "Performance intake, status and withdrawal"),
        (name = "judges", description = "Judge rosters and dashboards"),
        (name = "scores", description = "Score submission, audit and rankings"),
        (name = "fees", description = "Entry fee quotes"),
        (name = "stream", description = "Real-time event streaming (SSE)"),
    )
)]
pub struct ApiDoc;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", ApiDoc::openapi()))
        .route("/health", get(routes::health_check))
        .route(
            "/api/events",
            get(routes::list_events).post(routes::create_event),
        )
        .route(
            "/api/events/{id}",
            get(routes::get_event).delete(routes::delete_event),
        )
        .route(
            "/api/events/{id}/program",
            get(routes::get_program).put(routes::reorder_program),
        )
        .route("/api/events/{id}/reset", post(routes::reset_event))
        .route(
            "/api/events/{id}/current",
            get(routes::get_current)
                .put(routes::set_current)
                .delete(routes::clear_current),
        )
        .route("/api/events/{id}/rankings", get(routes::get_rankings))
        .route(
            "/api/events/{id}/performances",
            get(routes::list_performances).post(routes::create_performance),
        )
        .route(
            "/api/events/{id}/judges",
            get(routes::list_judges).post(routes::assign_judge),
        )
        .route(
            "/api/events/{id}/judges/{judge_id}",
            axum::routing::delete(routes::unassign_judge),
        )
        .route(
            "/api/events/{id}/judges/{judge_id}/performances",
            get(routes::judge_performances),
        )
        .route(
            "/api/performances/{id}",
            get(routes::get_performance).delete(routes::delete_performance),
        )
        .route("/api/performances/{id}/number", put(routes::assign_number))
        .route("/api/performances/{id}/status", put(routes::set_status))
        .route(
            "/api/performances/{id}/withdraw",
            post(routes::withdraw_performance),
        )
        .route(
            "/api/performances/{id}/restore",
            post(routes::restore_performance),
        )
        .route(
            "/api/performances/{id}/roster",
            put(routes::set_performance_roster).delete(routes::clear_performance_roster),
        )
        .route("/api/performances/{id}/scores", get(routes::list_scores))
        .route(
            "/api/performances/{id}/scoring-status",
            get(routes::get_scoring_status),
        )
        .route(
            "/api/performances/{id}/scores/{judge_id}",
            get(routes::get_score)
                .put(routes::submit_score)
                .delete(routes::delete_score),
        )
        .route(
            "/api/performances/{id}/score-deletions",
            get(routes::list_score_deletions),
        )
        .route("/api/fees/quote", post(routes::quote_fee))
        .route("/api/stream", get(routes::sse::events_stream))
        .route("/ws", get(routes::websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
