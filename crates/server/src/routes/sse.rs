use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use events::EventEnvelope;
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::state::AppState;

pub const SSE_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);
pub const LAST_EVENT_ID_HEADER: &str = "Last-Event-ID";

#[derive(Debug, Deserialize, IntoParams)]
pub struct StreamQuery {
    /// Comma-separated competition event IDs to filter envelopes
    pub event_ids: Option<String>,
}

fn parse_event_ids(event_ids: Option<&str>) -> Option<Vec<Uuid>> {
    event_ids.map(|s| {
        s.split(',')
            .filter_map(|id| id.trim().parse().ok())
            .collect()
    })
}

fn is_wanted(filter: Option<&[Uuid]>, envelope: &EventEnvelope) -> bool {
    match (filter, envelope.event_id) {
        (Some(ids), Some(event_id)) => ids.contains(&event_id),
        _ => true,
    }
}

fn envelope_to_sse_event(envelope: &EventEnvelope) -> Result<Event, Infallible> {
    let data = serde_json::to_string(envelope).unwrap_or_else(|_| "{}".to_string());

    Ok(Event::default()
        .id(envelope.id.to_string())
        .event(envelope.event.kind())
        .data(data))
}

fn truncated_notice() -> EventEnvelope {
    EventEnvelope::new(events::Event::Error {
        message: "missed events are no longer available, reload state".to_string(),
        context: Some("replay_truncated".to_string()),
    })
}

/// Live envelopes, preceded by anything logged after `Last-Event-ID`.
#[utoipa::path(
    get,
    path = "/api/stream",
    params(StreamQuery),
    responses(
        (status = 200, description = "SSE event stream"),
    ),
    tag = "stream"
)]
pub async fn events_stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
    headers: HeaderMap,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let event_ids = parse_event_ids(query.event_ids.as_deref());
    let last_event_id = headers
        .get(LAST_EVENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<Uuid>().ok());

    let replay = state.event_bus.subscribe_after(last_event_id);
    if replay.truncated {
        tracing::debug!(last_event_id = ?last_event_id, "SSE replay position no longer logged");
    }

    let mut missed: Vec<EventEnvelope> = replay
        .missed
        .into_iter()
        .filter(|e| is_wanted(event_ids.as_deref(), e))
        .collect();
    if replay.truncated {
        missed.insert(0, truncated_notice());
    }

    let missed_stream = futures::stream::iter(missed.into_iter().map(|e| envelope_to_sse_event(&e)));

    let live_stream = BroadcastStream::new(replay.receiver).filter_map(move |result| {
        let event_ids = event_ids.clone();

        async move {
            match result {
                Ok(envelope) if is_wanted(event_ids.as_deref(), &envelope) => {
                    Some(envelope_to_sse_event(&envelope))
                }
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!("SSE broadcast error: {:?}", e);
                    None
                }
            }
        }
    });

    let stream = missed_stream.chain(live_stream);

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(SSE_KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}
