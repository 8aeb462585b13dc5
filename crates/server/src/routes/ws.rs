use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use running_order::{RunningOrder, ServiceError};
use serde::Deserialize;
use showrunner_core::{Caller, CoreError, ProgramOrder, Role};
use uuid::Uuid;

use websocket::{IntentHandler, IntentOutcome, MutationIntent, WsState};

use crate::error::AppError;
use crate::extract::RequestCaller;
use crate::state::AppState;

/// Browsers cannot set headers on an upgrade request, so the caller may
/// also be given as query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    pub role: Option<String>,
    pub actor_id: Option<Uuid>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
) -> Response {
    let caller = match socket_caller(&headers, &query) {
        Ok(caller) => caller,
        Err(err) => return err.into_response(),
    };

    let ws_state = Arc::new(
        WsState::new(state.event_bus.clone(), state.intents(), caller)
            .with_heartbeat(state.config.live.heartbeat()),
    );
    websocket::ws_handler(ws, State(ws_state)).await.into_response()
}

fn socket_caller(headers: &HeaderMap, query: &WsQuery) -> Result<Caller, AppError> {
    let RequestCaller(mut caller) = RequestCaller::from_headers(headers)?;
    if caller.role.is_none() {
        if let Some(raw) = query.role.as_deref() {
            let role = Role::parse(raw).ok_or_else(|| {
                AppError::from(CoreError::Unauthorized(format!("unknown role '{}'", raw)))
            })?;
            caller.role = Some(role);
        }
    }
    if caller.actor_id.is_none() {
        caller.actor_id = query.actor_id;
    }
    Ok(caller)
}

/// Applies socket intents through the same services as the REST routes.
pub struct ServiceIntents {
    services: RunningOrder,
}

impl ServiceIntents {
    pub fn new(services: RunningOrder) -> Self {
        Self { services }
    }

    /// Rejections of sequencing intents always carry the order to roll back to.
    async fn rollback_order(&self, err: &ServiceError, event_id: Option<Uuid>) -> Option<ProgramOrder> {
        if let Some(current) = err.current() {
            return Some(current.clone());
        }
        let event_id = event_id?;
        self.services.sequencer.program(event_id).await.ok()
    }

    async fn event_of(&self, performance_id: Uuid) -> Option<Uuid> {
        self.services
            .lifecycle
            .get_performance(performance_id)
            .await
            .ok()
            .map(|p| p.event_id)
    }
}

fn failure(err: &ServiceError, current: Option<ProgramOrder>) -> IntentOutcome {
    IntentOutcome::failure(err.kind(), err.to_string(), current)
}

#[async_trait]
impl IntentHandler for ServiceIntents {
    async fn handle(&self, caller: Caller, intent: MutationIntent) -> IntentOutcome {
        match intent {
            MutationIntent::Reorder {
                event_id,
                ordered_ids,
                expected_version,
            } => match self
                .services
                .sequencer
                .reorder(&caller, event_id, &ordered_ids, expected_version)
                .await
            {
                Ok(program) => IntentOutcome::success(Some(program)),
                Err(err) => {
                    let current = self.rollback_order(&err, Some(event_id)).await;
                    failure(&err, current)
                }
            },
            MutationIntent::AssignNumber {
                performance_id,
                number,
            } => match self
                .services
                .sequencer
                .assign_number(&caller, performance_id, number)
                .await
            {
                Ok(program) => IntentOutcome::success(Some(program)),
                Err(err) => {
                    let event_id = self.event_of(performance_id).await;
                    let current = self.rollback_order(&err, event_id).await;
                    failure(&err, current)
                }
            },
            MutationIntent::SetStatus {
                performance_id,
                status,
            } => match self
                .services
                .lifecycle
                .set_status(&caller, performance_id, status)
                .await
            {
                Ok(_) => IntentOutcome::success(None),
                Err(err) => failure(&err, None),
            },
            MutationIntent::Withdraw { performance_id } => {
                match self.services.lifecycle.withdraw(&caller, performance_id).await {
                    Ok(_) => IntentOutcome::success(None),
                    Err(err) => failure(&err, None),
                }
            }
            MutationIntent::Restore { performance_id } => {
                match self.services.lifecycle.restore(&caller, performance_id).await {
                    Ok(_) => IntentOutcome::success(None),
                    Err(err) => failure(&err, None),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use events::EventBus;
    use showrunner_core::{CreateEventRequest, CreatePerformanceRequest};
    use tempfile::TempDir;

    async fn seeded_intents(titles: &[&str]) -> (ServiceIntents, Uuid, Vec<Uuid>, TempDir) {
        let dir = TempDir::new().unwrap();
        let pool = db::create_migrated_pool_in(dir.path()).await.unwrap();
        let services = RunningOrder::new(pool, EventBus::new());
        let event = services
            .catalog
            .create(
                &Caller::staff(),
                CreateEventRequest {
                    name: "Showcase".to_string(),
                },
            )
            .await
            .unwrap();

        let mut ids = Vec::new();
        for title in titles {
            let performance = services
                .sequencer
                .create_performance(
                    &Caller::staff(),
                    event.id,
                    CreatePerformanceRequest {
                        title: title.to_string(),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            ids.push(performance.id);
        }
        (ServiceIntents::new(services), event.id, ids, dir)
    }

    #[test]
    fn test_query_fills_missing_role() {
        let judge = Uuid::new_v4();
        let query = WsQuery {
            role: Some("judge".to_string()),
            actor_id: Some(judge),
        };
        let caller = socket_caller(&HeaderMap::new(), &query).unwrap();
        assert_eq!(caller, Caller::judge(judge));
    }

    #[test]
    fn test_header_wins_over_query() {
        let mut headers = HeaderMap::new();
        headers.insert("x-role", HeaderValue::from_static("admin"));
        let query = WsQuery {
            role: Some("judge".to_string()),
            actor_id: None,
        };
        let caller = socket_caller(&headers, &query).unwrap();
        assert_eq!(caller.role, Some(Role::Admin));
    }

    #[test]
    fn test_unknown_query_role_is_forbidden() {
        let query = WsQuery {
            role: Some("wizard".to_string()),
            actor_id: None,
        };
        let err = socket_caller(&HeaderMap::new(), &query).unwrap_err();
        assert_eq!(err.into_response().status(), axum::http::StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_rejected_reorder_carries_current_order() {
        let (intents, event_id, ids, _dir) = seeded_intents(&["A", "B", "C"]).await;

        let wrong_set = intents
            .handle(
                Caller::staff(),
                MutationIntent::Reorder {
                    event_id,
                    ordered_ids: vec![ids[0], ids[1]],
                    expected_version: None,
                },
            )
            .await;
        assert!(!wrong_set.ok);
        assert_eq!(wrong_set.error.unwrap().error, "invalid_set");
        let current = wrong_set.current.unwrap();
        assert_eq!(current.order, ids);

        let stale = intents
            .handle(
                Caller::staff(),
                MutationIntent::Reorder {
                    event_id,
                    ordered_ids: vec![ids[2], ids[1], ids[0]],
                    expected_version: Some(current.sequence_version - 1),
                },
            )
            .await;
        assert!(!stale.ok);
        assert_eq!(stale.error.unwrap().error, "concurrent_modification");
        assert_eq!(stale.current.unwrap().order, ids);
    }

    #[tokio::test]
    async fn test_rejected_assign_carries_current_order() {
        let (intents, _event_id, ids, _dir) = seeded_intents(&["A", "B"]).await;

        let out_of_range = intents
            .handle(
                Caller::admin(),
                MutationIntent::AssignNumber {
                    performance_id: ids[0],
                    number: 5,
                },
            )
            .await;
        assert!(!out_of_range.ok);
        assert_eq!(out_of_range.error.unwrap().error, "validation");
        assert_eq!(out_of_range.current.unwrap().order, ids);

        let staff = intents
            .handle(
                Caller::staff(),
                MutationIntent::AssignNumber {
                    performance_id: ids[1],
                    number: 1,
                },
            )
            .await;
        assert!(!staff.ok);
        assert_eq!(staff.error.unwrap().error, "unauthorized");
        assert_eq!(staff.current.unwrap().order, ids);
    }
}
