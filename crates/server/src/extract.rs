use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use showrunner_core::{Caller, CoreError, Role};
use uuid::Uuid;

use crate::error::AppError;

pub const ROLE_HEADER: &str = "X-Role";
pub const ACTOR_HEADER: &str = "X-Actor-Id";

/// Caller identity from `X-Role` / `X-Actor-Id`.
///
/// An absent role yields an anonymous caller; services reject it where a
/// role is required.
#[derive(Debug, Clone, Copy)]
pub struct RequestCaller(pub Caller);

impl RequestCaller {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let role = match header_str(headers, ROLE_HEADER) {
            None => None,
            Some(raw) => Some(Role::parse(raw).ok_or_else(|| {
                AppError::from(CoreError::Unauthorized(format!("unknown role '{}'", raw)))
            })?),
        };

        let actor_id = match header_str(headers, ACTOR_HEADER) {
            None => None,
            Some(raw) => Some(
                raw.parse::<Uuid>()
                    .map_err(|_| AppError::BadRequest(format!("invalid {} header", ACTOR_HEADER)))?,
            ),
        };

        Ok(Self(Caller { role, actor_id }))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl<S> FromRequestParts<S> for RequestCaller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}
