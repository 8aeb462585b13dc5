//! Event bus implementation using tokio broadcast channels

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::types::EventEnvelope;

/// Capacity for the broadcast channel
pub const DEFAULT_CAPACITY: usize = 1000;

/// Envelopes kept for reconnecting subscribers
pub const DEFAULT_REPLAY_LOG_SIZE: usize = 1000;

struct ReplayLog {
    entries: VecDeque<EventEnvelope>,
    max_size: usize,
    /// Highest revision dropped from the log, per competition event.
    evicted: HashMap<Uuid, i64>,
}

impl ReplayLog {
    fn push(&mut self, envelope: EventEnvelope) {
        if self.max_size == 0 {
            self.record_eviction(&envelope);
            return;
        }
        if self.entries.len() >= self.max_size {
            if let Some(dropped) = self.entries.pop_front() {
                self.record_eviction(&dropped);
            }
        }
        self.entries.push_back(envelope);
    }

    fn record_eviction(&mut self, envelope: &EventEnvelope) {
        if let Some(event_id) = envelope.event_id {
            let highest = self.evicted.entry(event_id).or_insert(envelope.revision);
            *highest = (*highest).max(envelope.revision);
        }
    }

    /// Whether anything of `event_id` after revision `since` is gone.
    fn has_gap(&self, event_id: Uuid, since: i64) -> bool {
        self.evicted
            .get(&event_id)
            .map(|&highest| highest > since)
            .unwrap_or(false)
    }
}

/// Live receiver plus whatever it missed.
///
/// `missed` and `receiver` are taken under the same lock as `publish`, so
/// nothing is delivered twice and nothing falls between them.
pub struct ReplaySubscription {
    pub missed: Vec<EventEnvelope>,
    pub receiver: broadcast::Receiver<EventEnvelope>,
    /// The requested position is no longer in the log; the client should
    /// reload state instead of trusting `missed`.
    pub truncated: bool,
}

/// Event bus for publishing and subscribing to events
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
    log: Arc<Mutex<ReplayLog>>,
    /// Number of events published (for monitoring)
    event_count: Arc<AtomicUsize>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, DEFAULT_REPLAY_LOG_SIZE)
    }

    pub fn with_capacity(capacity: usize, replay_log_size: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            log: Arc::new(Mutex::new(ReplayLog {
                entries: VecDeque::with_capacity(replay_log_size),
                max_size: replay_log_size,
                evicted: HashMap::new(),
            })),
            event_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of subscribers that received the event.
    /// The envelope is logged for replay even when nobody is listening.
    pub fn publish(&self, envelope: EventEnvelope) -> usize {
        let mut log = self
            .log
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.event_count.fetch_add(1, Ordering::Relaxed);
        log.push(envelope.clone());
        self.sender.send(envelope).unwrap_or(0)
    }

    /// Subscribe to events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    /// Subscribe and replay everything logged after envelope `last_seen`.
    pub fn subscribe_after(&self, last_seen: Option<Uuid>) -> ReplaySubscription {
        let log = self
            .log
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let receiver = self.sender.subscribe();

        let Some(last_seen) = last_seen else {
            return ReplaySubscription {
                missed: Vec::new(),
                receiver,
                truncated: false,
            };
        };

        match log.entries.iter().position(|e| e.id == last_seen) {
            Some(pos) => ReplaySubscription {
                missed: log.entries.iter().skip(pos + 1).cloned().collect(),
                receiver,
                truncated: false,
            },
            None => ReplaySubscription {
                missed: Vec::new(),
                receiver,
                truncated: true,
            },
        }
    }

    /// Subscribe and replay, for each event in `since`, the logged
    /// envelopes whose revision is greater than the one given for it.
    ///
    /// Revisions count per event, so each event carries its own position.
    /// Events not in `since` are not replayed.
    pub fn subscribe_since(&self, since: &HashMap<Uuid, i64>) -> ReplaySubscription {
        let log = self
            .log
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let receiver = self.sender.subscribe();

        let missed = log
            .entries
            .iter()
            .filter(|e| {
                e.event_id
                    .and_then(|id| since.get(&id))
                    .map(|&seen| e.revision > seen)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        let truncated = since.iter().any(|(&id, &seen)| log.has_gap(id, seen));

        ReplaySubscription {
            missed,
            receiver,
            truncated,
        }
    }

    /// Get the number of current subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the total number of events published
    pub fn event_count(&self) -> usize {
        self.event_count.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .field("event_count", &self.event_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Event;

    fn withdrawal(event_id: Uuid, revision: i64) -> EventEnvelope {
        EventEnvelope::for_revision(
            revision,
            Event::WithdrawalChanged {
                event_id,
                performance_id: Uuid::new_v4(),
                withdrawn: true,
            },
        )
    }

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        let envelope = withdrawal(Uuid::new_v4(), 1);
        let sent = bus.publish(envelope.clone());
        assert_eq!(sent, 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, envelope.id);
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let envelope = withdrawal(Uuid::new_v4(), 1);
        let envelope_id = envelope.id;

        assert_eq!(bus.publish(envelope), 2);
        assert_eq!(rx1.recv().await.unwrap().id, envelope_id);
        assert_eq!(rx2.recv().await.unwrap().id, envelope_id);
    }

    #[tokio::test]
    async fn test_no_subscribers() {
        let bus = EventBus::new();

        // Nobody receives it, but it is still logged
        let sent = bus.publish(withdrawal(Uuid::new_v4(), 1));
        assert_eq!(sent, 0);
        assert_eq!(bus.event_count(), 1);
    }

    #[test]
    fn test_subscribe_after_replays_tail() {
        let bus = EventBus::new();
        let event_id = Uuid::new_v4();
        let first = withdrawal(event_id, 1);
        let second = withdrawal(event_id, 2);
        let third = withdrawal(event_id, 3);
        bus.publish(first.clone());
        bus.publish(second.clone());
        bus.publish(third.clone());

        let sub = bus.subscribe_after(Some(first.id));
        let ids: Vec<Uuid> = sub.missed.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![second.id, third.id]);
        assert!(!sub.truncated);
    }

    #[test]
    fn test_subscribe_after_unknown_id_is_truncated() {
        let bus = EventBus::new();
        bus.publish(withdrawal(Uuid::new_v4(), 1));

        let sub = bus.subscribe_after(Some(Uuid::new_v4()));
        assert!(sub.missed.is_empty());
        assert!(sub.truncated);
    }

    #[test]
    fn test_subscribe_since_filters_by_event_and_revision() {
        let bus = EventBus::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        bus.publish(withdrawal(a, 1));
        bus.publish(withdrawal(b, 1));
        bus.publish(withdrawal(a, 2));
        bus.publish(withdrawal(a, 3));

        let sub = bus.subscribe_since(&HashMap::from([(a, 1)]));
        let revisions: Vec<i64> = sub.missed.iter().map(|e| e.revision).collect();
        assert_eq!(revisions, vec![2, 3]);
        assert!(sub.missed.iter().all(|e| e.event_id == Some(a)));
    }

    #[test]
    fn test_replay_log_is_bounded() {
        let bus = EventBus::with_capacity(16, 2);
        let event_id = Uuid::new_v4();
        for revision in 1..=5 {
            bus.publish(withdrawal(event_id, revision));
        }

        let sub = bus.subscribe_since(&HashMap::from([(event_id, 0)]));
        let revisions: Vec<i64> = sub.missed.iter().map(|e| e.revision).collect();
        assert_eq!(revisions, vec![4, 5]);
        assert!(sub.truncated);

        let caught_up = bus.subscribe_since(&HashMap::from([(event_id, 3)]));
        assert_eq!(caught_up.missed.len(), 2);
        assert!(!caught_up.truncated);
    }

    #[test]
    fn test_gap_reported_when_other_events_evict_everything() {
        let bus = EventBus::with_capacity(16, 3);
        let quiet = Uuid::new_v4();
        let busy = Uuid::new_v4();
        bus.publish(withdrawal(quiet, 1));
        bus.publish(withdrawal(quiet, 2));
        for revision in 1..=3 {
            bus.publish(withdrawal(busy, revision));
        }

        let sub = bus.subscribe_since(&HashMap::from([(quiet, 0)]));
        assert!(sub.missed.is_empty());
        assert!(sub.truncated);

        let seen_all = bus.subscribe_since(&HashMap::from([(quiet, 2)]));
        assert!(!seen_all.truncated);
    }

    #[test]
    fn test_positions_are_per_event() {
        let bus = EventBus::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        for revision in 1..=5 {
            bus.publish(withdrawal(a, revision));
        }
        for revision in 1..=3 {
            bus.publish(withdrawal(b, revision));
        }

        let sub = bus.subscribe_since(&HashMap::from([(a, 5), (b, 1)]));
        let replayed: Vec<(Option<Uuid>, i64)> =
            sub.missed.iter().map(|e| (e.event_id, e.revision)).collect();
        assert_eq!(replayed, vec![(Some(b), 2), (Some(b), 3)]);
        assert!(!sub.truncated);
    }

    #[tokio::test]
    async fn test_replay_then_live_has_no_gap() {
        let bus = EventBus::new();
        let event_id = Uuid::new_v4();
        bus.publish(withdrawal(event_id, 1));

        let mut sub = bus.subscribe_since(&HashMap::from([(event_id, 0)]));
        bus.publish(withdrawal(event_id, 2));

        assert_eq!(sub.missed.len(), 1);
        assert_eq!(sub.receiver.recv().await.unwrap().revision, 2);
    }

    #[tokio::test]
    async fn test_subscriber_count() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);

        let _rx1 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_clone() {
        let bus1 = EventBus::new();
        let bus2 = bus1.clone();

        let _rx = bus2.subscribe();
        assert_eq!(bus1.subscriber_count(), 1);
        assert_eq!(bus2.subscriber_count(), 1);
    }
}
