use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use showrunner_core::{PerformanceStatus, ProgramOrder};
use uuid::Uuid;

use events::EventEnvelope;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe {
        filter: Option<SubscriptionFilter>,
        /// Last revision seen per event; those events replay what followed.
        #[serde(default)]
        since: Option<HashMap<Uuid, i64>>,
    },
    Unsubscribe,
    Ping,
    Intent {
        request_id: String,
        intent: MutationIntent,
    },
}

/// A mutation requested over the socket. Answered by exactly one
/// [`ServerMessage::IntentResult`] with the same `request_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationIntent {
    Reorder {
        event_id: Uuid,
        ordered_ids: Vec<Uuid>,
        #[serde(default)]
        expected_version: Option<i64>,
    },
    AssignNumber {
        performance_id: Uuid,
        number: u32,
    },
    SetStatus {
        performance_id: Uuid,
        status: PerformanceStatus,
    },
    Withdraw {
        performance_id: Uuid,
    },
    Restore {
        performance_id: Uuid,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct IntentError {
    /// Same vocabulary as the HTTP error body
    pub error: String,
    pub message: String,
}

/// What an [`crate::IntentHandler`] reports back for one intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentOutcome {
    pub ok: bool,
    pub error: Option<IntentError>,
    /// Authoritative program order after the intent, successful or not.
    pub current: Option<ProgramOrder>,
}

impl IntentOutcome {
    pub fn success(current: Option<ProgramOrder>) -> Self {
        Self {
            ok: true,
            error: None,
            current,
        }
    }

    pub fn failure(
        error: impl Into<String>,
        message: impl Into<String>,
        current: Option<ProgramOrder>,
    ) -> Self {
        Self {
            ok: false,
            error: Some(IntentError {
                error: error.into(),
                message: message.into(),
            }),
            current,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Event {
        envelope: EventEnvelope,
    },
    Subscribed {
        filter: Option<SubscriptionFilter>,
        replayed: usize,
        /// Replay could not reach back to `since`; reload before trusting it.
        truncated: bool,
    },
    Unsubscribed,
    Pong,
    IntentResult {
        request_id: String,
        ok: bool,
        error: Option<IntentError>,
        current: Option<ProgramOrder>,
    },
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn intent_result(request_id: String, outcome: IntentOutcome) -> Self {
        Self::IntentResult {
            request_id,
            ok: outcome.ok,
            error: outcome.error,
            current: outcome.current,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(ts_rs::TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct SubscriptionFilter {
    pub event_ids: Option<Vec<Uuid>>,
}

impl SubscriptionFilter {
    pub fn for_event(event_id: Uuid) -> Self {
        Self {
            event_ids: Some(vec![event_id]),
        }
    }

    pub fn includes(&self, event_id: Uuid) -> bool {
        self.event_ids
            .as_ref()
            .map(|ids| ids.contains(&event_id))
            .unwrap_or(true)
    }

    /// Envelopes without an event id (errors) always pass.
    pub fn matches(&self, envelope: &EventEnvelope) -> bool {
        match (&self.event_ids, envelope.event_id) {
            (Some(ids), Some(event_id)) => ids.contains(&event_id),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use events::Event;

    fn current_changed(event_id: Uuid) -> EventEnvelope {
        EventEnvelope::for_revision(
            1,
            Event::CurrentChanged {
                event_id,
                performance_id: None,
            },
        )
    }

    #[test]
    fn test_client_message_serialize() {
        let msg = ClientMessage::Subscribe {
            filter: None,
            since: None,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("subscribe"));
    }

    #[test]
    fn test_client_message_deserialize() {
        let json = r#"{"type":"ping"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }

    #[test]
    fn test_subscribe_without_since() {
        let json = r#"{"type":"subscribe","filter":{"event_ids":null}}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::Subscribe { since: None, .. }));
    }

    #[test]
    fn test_subscribe_since_per_event() {
        let event_id = Uuid::new_v4();
        let json = format!(
            r#"{{"type":"subscribe","filter":{{"event_ids":["{0}"]}},"since":{{"{0}":7}}}}"#,
            event_id
        );
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();

        match msg {
            ClientMessage::Subscribe {
                since: Some(since), ..
            } => assert_eq!(since.get(&event_id), Some(&7)),
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_filter_includes() {
        let event_id = Uuid::new_v4();
        assert!(SubscriptionFilter::default().includes(event_id));
        assert!(SubscriptionFilter::for_event(event_id).includes(event_id));
        assert!(!SubscriptionFilter::for_event(event_id).includes(Uuid::new_v4()));
    }

    #[test]
    fn test_intent_deserialize() {
        let performance_id = Uuid::new_v4();
        let json = format!(
            r#"{{"type":"intent","request_id":"r-1","intent":{{"kind":"set_status","performance_id":"{}","status":"in_progress"}}}}"#,
            performance_id
        );
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();

        match msg {
            ClientMessage::Intent { request_id, intent } => {
                assert_eq!(request_id, "r-1");
                assert_eq!(
                    intent,
                    MutationIntent::SetStatus {
                        performance_id,
                        status: PerformanceStatus::InProgress,
                    }
                );
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_intent_result_serialize() {
        let outcome = IntentOutcome::failure("withdrawn", "performance is withdrawn", None);
        let msg = ServerMessage::intent_result("r-2".to_string(), outcome);
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "intent_result");
        assert_eq!(json["request_id"], "r-2");
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"]["error"], "withdrawn");
    }

    #[test]
    fn test_subscription_filter_matches_all() {
        let filter = SubscriptionFilter::default();
        assert!(filter.matches(&current_changed(Uuid::new_v4())));
    }

    #[test]
    fn test_subscription_filter_matches_specific_event() {
        let event_id = Uuid::new_v4();
        let filter = SubscriptionFilter::for_event(event_id);

        assert!(filter.matches(&current_changed(event_id)));
        assert!(!filter.matches(&current_changed(Uuid::new_v4())));
    }

    #[test]
    fn test_subscription_filter_allows_events_without_event_id() {
        let filter = SubscriptionFilter::for_event(Uuid::new_v4());
        let envelope = EventEnvelope::new(Event::Error {
            message: "test".to_string(),
            context: None,
        });

        assert!(filter.matches(&envelope));
    }
}
