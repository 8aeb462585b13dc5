use axum::Json;
use showrunner_core::{calculate_fee, FeeInput, FeeQuote};

use crate::error::AppError;

/// Stateless; the caller stores the quote on the performance it creates.
#[utoipa::path(
    post,
    path = "/api/fees/quote",
    request_body = FeeInput,
    responses(
        (status = 200, description = "Fee breakdown", body = FeeQuote),
        (status = 400, description = "Participant count does not fit the type", body = crate::error::ErrorResponse),
    ),
    tag = "fees"
)]
pub async fn quote_fee(Json(input): Json<FeeInput>) -> Result<Json<FeeQuote>, AppError> {
    Ok(Json(calculate_fee(&input)?))
}
