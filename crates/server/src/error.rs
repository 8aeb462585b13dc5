use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use running_order::ServiceError;
use serde::Serialize;
use showrunner_core::{CoreError, ProgramOrder};
use utoipa::ToSchema;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Service(ServiceError),
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    /// Authoritative program order after a rejected sequencing change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<ProgramOrder>,
}

pub(crate) fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::InvalidSet { .. }
        | ServiceError::ConcurrentModification { .. }
        | ServiceError::Withdrawn(_) => StatusCode::CONFLICT,
        ServiceError::MissingRole => StatusCode::UNAUTHORIZED,
        ServiceError::Unauthorized(_) => StatusCode::FORBIDDEN,
        ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "validation".to_string(),
                    message,
                    current: None,
                },
            ),
            AppError::Service(err) => {
                let status = status_for(&err);
                let message = match &err {
                    ServiceError::Database(db_err) => {
                        tracing::error!("Database error: {:?}", db_err);
                        "Database error occurred".to_string()
                    }
                    other => other.to_string(),
                };
                (
                    status,
                    ErrorResponse {
                        error: err.kind().to_string(),
                        message,
                        current: err.current().cloned(),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        AppError::Service(err)
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::Service(err.into())
    }
}

impl From<db::DbError> for AppError {
    fn from(err: db::DbError) -> Self {
        AppError::Service(err.into())
    }
}
