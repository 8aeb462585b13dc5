use std::collections::HashSet;

use db::{EventRepository, PerformanceRepository, SequenceCommit};
use events::{Event, EventBus, EventEnvelope};
use showrunner_core::{Caller, CreatePerformanceRequest, Performance, ProgramOrder};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::current::CurrentPerformanceStore;
use crate::error::{Result, ServiceError};
use crate::locks::EventLocks;

/// Owns the dense `1..=N` numbering of each event's performances.
#[derive(Clone)]
pub struct ProgramSequencer {
    events: EventRepository,
    performances: PerformanceRepository,
    bus: EventBus,
    locks: EventLocks,
    current: CurrentPerformanceStore,
}

impl ProgramSequencer {
    pub fn new(
        events: EventRepository,
        performances: PerformanceRepository,
        bus: EventBus,
        locks: EventLocks,
        current: CurrentPerformanceStore,
    ) -> Self {
        Self {
            events,
            performances,
            bus,
            locks,
            current,
        }
    }

    pub async fn program(&self, event_id: Uuid) -> Result<ProgramOrder> {
        self.performances
            .program(event_id)
            .await?
            .ok_or_else(|| ServiceError::event_not_found(event_id))
    }

    /// Entry approval: stores the performance and, unless `numbered` is
    /// false, appends it to the running order as `N + 1`.
    pub async fn create_performance(
        &self,
        caller: &Caller,
        event_id: Uuid,
        request: CreatePerformanceRequest,
    ) -> Result<Performance> {
        caller.require_staff()?;
        let title = request.title.trim();
        if title.is_empty() {
            return Err(ServiceError::Validation("title must not be empty".to_string()));
        }

        let mut performance = Performance::new(event_id, title).with_participants(request.participants);
        performance.duration_seconds = request.duration_seconds;
        performance.media_ref = request.media_ref;
        performance.fee = request.fee;

        let _guard = self.locks.acquire(event_id).await;
        let mut writer = self.performances.sequence(event_id).await?;
        let numbered = request.numbered.unwrap_or(true);
        if numbered {
            let count = writer.numbered_ids().await?.len();
            performance.item_number = Some(count as u32 + 1);
        } else {
            writer.preserve_version().await?;
        }
        writer.insert(&performance).await?;
        let commit = writer.commit().await?;

        info!(
            event_id = %event_id,
            performance_id = %performance.id,
            item_number = ?performance.item_number,
            "Performance created"
        );
        self.bus.publish(EventEnvelope::for_revision(
            commit.revision,
            Event::PerformanceCreated {
                event_id,
                performance_id: performance.id,
                item_number: performance.item_number,
                title: performance.title.clone(),
            },
        ));
        if numbered {
            self.publish_sequence(&commit);
        }

        Ok(performance)
    }

    /// Renumbers the event's numbered performances as `ordered_ids`.
    ///
    /// `ordered_ids` must be exactly the currently numbered set. When
    /// `expected_version` is given it must match the stored sequence version.
    pub async fn reorder(
        &self,
        caller: &Caller,
        event_id: Uuid,
        ordered_ids: &[Uuid],
        expected_version: Option<i64>,
    ) -> Result<ProgramOrder> {
        caller.require_staff()?;

        let _guard = self.locks.acquire(event_id).await;
        let mut writer = self.performances.sequence(event_id).await?;
        let current = ProgramOrder {
            event_id,
            sequence_version: writer.previous_version(),
            order: writer.numbered_ids().await?,
        };

        if let Some(expected) = expected_version {
            if expected != current.sequence_version {
                writer.rollback().await?;
                warn!(
                    event_id = %event_id,
                    expected,
                    found = current.sequence_version,
                    "Reorder rejected: stale sequence version"
                );
                return Err(ServiceError::ConcurrentModification {
                    expected: Some(expected),
                    current,
                });
            }
        }

        if let Some(message) = membership_mismatch(&current.order, ordered_ids) {
            writer.rollback().await?;
            debug!(event_id = %event_id, %message, "Reorder rejected");
            return Err(ServiceError::InvalidSet { message, current });
        }

        if current.order == ordered_ids {
            writer.rollback().await?;
            return Ok(current);
        }

        writer.apply_order(ordered_ids).await?;
        let commit = writer.commit().await?;

        info!(
            event_id = %event_id,
            sequence_version = commit.program.sequence_version,
            "Running order reordered"
        );
        self.publish_sequence(&commit);

        Ok(commit.program)
    }

    /// Admin override of a single item number.
    ///
    /// The previous holder of `number` takes the mover's old number, or
    /// becomes unnumbered if the mover had none. Density is preserved.
    pub async fn assign_number(
        &self,
        caller: &Caller,
        performance_id: Uuid,
        number: u32,
    ) -> Result<ProgramOrder> {
        caller.require_admin()?;
        let event_id = self.event_of(performance_id).await?;

        let _guard = self.locks.acquire(event_id).await;
        let mut writer = self.performances.sequence(event_id).await?;
        let Some(mover) = writer.find(performance_id).await? else {
            writer.rollback().await?;
            return Err(ServiceError::performance_not_found(performance_id));
        };

        let numbered = writer.numbered_ids().await?.len() as u32;
        let max = if mover.item_number.is_some() {
            numbered
        } else {
            numbered + 1
        };
        if number == 0 || number > max {
            writer.rollback().await?;
            return Err(ServiceError::Validation(format!(
                "item number must be between 1 and {}, got {}",
                max, number
            )));
        }

        if mover.item_number == Some(number) {
            writer.rollback().await?;
            return self.program(event_id).await;
        }

        let displaced = writer.move_to(performance_id, number).await?;
        let commit = writer.commit().await?;

        info!(
            event_id = %event_id,
            performance_id = %performance_id,
            number,
            displaced = ?displaced,
            "Item number assigned"
        );
        self.publish_sequence(&commit);

        Ok(commit.program)
    }

    /// Deletes a performance with its scores. Later numbers shift down so
    /// the sequence stays dense.
    pub async fn delete_performance(&self, caller: &Caller, performance_id: Uuid) -> Result<()> {
        caller.require_admin()?;
        let event_id = self.event_of(performance_id).await?;

        let _guard = self.locks.acquire(event_id).await;
        let mut writer = self.performances.sequence(event_id).await?;
        let remaining: Vec<Uuid> = writer
            .numbered_ids()
            .await?
            .into_iter()
            .filter(|id| *id != performance_id)
            .collect();

        if !writer.delete(performance_id).await? {
            writer.rollback().await?;
            return Err(ServiceError::performance_not_found(performance_id));
        }
        writer.apply_order(&remaining).await?;
        let commit = writer.commit().await?;

        info!(event_id = %event_id, performance_id = %performance_id, "Performance deleted");
        self.bus.publish(EventEnvelope::for_revision(
            commit.revision,
            Event::PerformanceDeleted {
                event_id,
                performance_id,
            },
        ));
        self.publish_sequence(&commit);

        if self.current.clear_if(event_id, performance_id) {
            self.bus.publish(EventEnvelope::for_revision(
                commit.revision,
                Event::CurrentChanged {
                    event_id,
                    performance_id: None,
                },
            ));
        }

        Ok(())
    }

    pub async fn ensure_event(&self, event_id: Uuid) -> Result<()> {
        match self.events.find_by_id(event_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::event_not_found(event_id)),
        }
    }

    async fn event_of(&self, performance_id: Uuid) -> Result<Uuid> {
        self.performances
            .find_by_id(performance_id)
            .await?
            .map(|p| p.event_id)
            .ok_or_else(|| ServiceError::performance_not_found(performance_id))
    }

    fn publish_sequence(&self, commit: &SequenceCommit) {
        self.bus.publish(EventEnvelope::for_revision(
            commit.revision,
            Event::SequenceChanged {
                event_id: commit.program.event_id,
                sequence_version: commit.program.sequence_version,
                order: commit.program.order.clone(),
            },
        ));
    }
}

/// Describes why `proposed` is not a permutation of `numbered`.
fn membership_mismatch(numbered: &[Uuid], proposed: &[Uuid]) -> Option<String> {
    let mut seen = HashSet::with_capacity(proposed.len());
    if let Some(dup) = proposed.iter().find(|id| !seen.insert(**id)) {
        return Some(format!("performance {} appears more than once", dup));
    }

    let expected: HashSet<&Uuid> = numbered.iter().collect();
    if let Some(extra) = proposed.iter().find(|id| !expected.contains(id)) {
        return Some(format!("performance {} is not numbered in this event", extra));
    }
    if proposed.len() != numbered.len() {
        return Some(format!(
            "expected {} numbered performances, got {}",
            numbered.len(),
            proposed.len()
        ));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_event, setup};
    use showrunner_core::is_dense_sequence;

    #[test]
    fn test_membership_mismatch() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        assert!(membership_mismatch(&[a, b], &[b, a]).is_none());
        assert!(membership_mismatch(&[a, b], &[a, a]).unwrap().contains("more than once"));
        assert!(membership_mismatch(&[a, b], &[a, c]).unwrap().contains("not numbered"));
        assert!(membership_mismatch(&[a, b], &[a]).unwrap().contains("expected 2"));
    }

    #[tokio::test]
    async fn test_reorder_scenario() {
        let (services, _dir) = setup().await;
        let (event_id, ids) = seed_event(&services, &["A", "B", "C"]).await;
        let (a, b, c) = (ids[0], ids[1], ids[2]);

        let program = services
            .sequencer
            .reorder(&Caller::staff(), event_id, &[c, a, b], None)
            .await
            .unwrap();

        assert_eq!(program.item_number_of(c), Some(1));
        assert_eq!(program.item_number_of(a), Some(2));
        assert_eq!(program.item_number_of(b), Some(3));
    }

    #[tokio::test]
    async fn test_reorder_round_trip_restores_numbering() {
        let (services, _dir) = setup().await;
        let (event_id, ids) = seed_event(&services, &["A", "B", "C", "D"]).await;
        let staff = Caller::staff();

        let shuffled = vec![ids[3], ids[1], ids[0], ids[2]];
        services
            .sequencer
            .reorder(&staff, event_id, &shuffled, None)
            .await
            .unwrap();
        let restored = services
            .sequencer
            .reorder(&staff, event_id, &ids, None)
            .await
            .unwrap();

        assert_eq!(restored.order, ids);
    }

    #[tokio::test]
    async fn test_reorder_rejects_wrong_set_with_current_order() {
        let (services, _dir) = setup().await;
        let (event_id, ids) = seed_event(&services, &["A", "B"]).await;

        let err = services
            .sequencer
            .reorder(&Caller::staff(), event_id, &[ids[0]], None)
            .await
            .unwrap_err();

        match err {
            ServiceError::InvalidSet { current, .. } => assert_eq!(current.order, ids),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reorder_stale_version_is_concurrent_modification() {
        let (services, _dir) = setup().await;
        let (event_id, ids) = seed_event(&services, &["A", "B"]).await;
        let staff = Caller::staff();
        let seen = services.sequencer.program(event_id).await.unwrap();

        services
            .sequencer
            .reorder(&staff, event_id, &[ids[1], ids[0]], Some(seen.sequence_version))
            .await
            .unwrap();

        let err = services
            .sequencer
            .reorder(&staff, event_id, &[ids[0], ids[1]], Some(seen.sequence_version))
            .await
            .unwrap_err();

        match err {
            ServiceError::ConcurrentModification { current, .. } => {
                assert_eq!(current.order, vec![ids[1], ids[0]]);
                assert_eq!(current.sequence_version, seen.sequence_version + 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_concurrent_reorders_from_same_snapshot() {
        let (services, _dir) = setup().await;
        let (event_id, ids) = seed_event(&services, &["A", "B", "C"]).await;
        let version = services.sequencer.program(event_id).await.unwrap().sequence_version;

        let orders = vec![
            vec![ids[2], ids[1], ids[0]],
            vec![ids[1], ids[2], ids[0]],
            vec![ids[0], ids[2], ids[1]],
        ];
        let attempts = orders.iter().map(|order| {
            let sequencer = services.sequencer.clone();
            let order = order.clone();
            async move {
                sequencer
                    .reorder(&Caller::staff(), event_id, &order, Some(version))
                    .await
            }
        });
        let results = futures::future::join_all(attempts).await;

        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(results.iter().all(|r| match r {
            Ok(_) => true,
            Err(e) => matches!(e, ServiceError::ConcurrentModification { .. }),
        }));

        let numbers: Vec<u32> = services
            .performances()
            .find_by_event(event_id, None)
            .await
            .unwrap()
            .iter()
            .filter_map(|p| p.item_number)
            .collect();
        assert_eq!(numbers.len(), 3);
        assert!(is_dense_sequence(&numbers));
    }

    #[tokio::test]
    async fn test_reorder_requires_staff() {
        let (services, _dir) = setup().await;
        let (event_id, ids) = seed_event(&services, &["A"]).await;

        let err = services
            .sequencer
            .reorder(&Caller::anonymous(), event_id, &ids, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::MissingRole));

        let err = services
            .sequencer
            .reorder(&Caller::judge(Uuid::new_v4()), event_id, &ids, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_create_appends_and_unnumbered_entries() {
        let (services, _dir) = setup().await;
        let (event_id, ids) = seed_event(&services, &["A", "B"]).await;

        let late = services
            .sequencer
            .create_performance(
                &Caller::staff(),
                event_id,
                CreatePerformanceRequest {
                    title: "Standby".to_string(),
                    numbered: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(late.item_number, None);

        let program = services.sequencer.program(event_id).await.unwrap();
        assert_eq!(program.order, ids);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_title() {
        let (services, _dir) = setup().await;
        let (event_id, _) = seed_event(&services, &[]).await;

        let err = services
            .sequencer
            .create_performance(&Caller::staff(), event_id, CreatePerformanceRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_assign_number_swaps_holder() {
        let (services, _dir) = setup().await;
        let (event_id, ids) = seed_event(&services, &["A", "B", "C"]).await;

        let program = services
            .sequencer
            .assign_number(&Caller::admin(), ids[0], 3)
            .await
            .unwrap();

        assert_eq!(program.order, vec![ids[2], ids[1], ids[0]]);
        assert_eq!(program.event_id, event_id);
    }

    #[tokio::test]
    async fn test_assign_number_bounds_and_role() {
        let (services, _dir) = setup().await;
        let (_event_id, ids) = seed_event(&services, &["A", "B"]).await;

        let err = services
            .sequencer
            .assign_number(&Caller::admin(), ids[0], 3)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = services
            .sequencer
            .assign_number(&Caller::admin(), ids[0], 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = services
            .sequencer
            .assign_number(&Caller::staff(), ids[0], 2)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_assign_number_to_unnumbered_performance() {
        let (services, _dir) = setup().await;
        let (event_id, ids) = seed_event(&services, &["A", "B"]).await;
        let extra = services
            .sequencer
            .create_performance(
                &Caller::staff(),
                event_id,
                CreatePerformanceRequest {
                    title: "Late".to_string(),
                    numbered: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let program = services
            .sequencer
            .assign_number(&Caller::admin(), extra.id, 3)
            .await
            .unwrap();
        assert_eq!(program.order, vec![ids[0], ids[1], extra.id]);
    }

    #[tokio::test]
    async fn test_delete_compacts_sequence() {
        let (services, _dir) = setup().await;
        let (event_id, ids) = seed_event(&services, &["A", "B", "C"]).await;

        services
            .sequencer
            .delete_performance(&Caller::admin(), ids[0])
            .await
            .unwrap();

        let program = services.sequencer.program(event_id).await.unwrap();
        assert_eq!(program.order, vec![ids[1], ids[2]]);

        let err = services
            .sequencer
            .delete_performance(&Caller::admin(), ids[0])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_mutations_publish_in_commit_order() {
        let (services, _dir) = setup().await;
        let (event_id, ids) = seed_event(&services, &["A", "B"]).await;
        let mut rx = services.bus.subscribe();

        services
            .sequencer
            .reorder(&Caller::staff(), event_id, &[ids[1], ids[0]], None)
            .await
            .unwrap();
        services
            .sequencer
            .assign_number(&Caller::admin(), ids[0], 2)
            .await
            .unwrap();
        services
            .sequencer
            .reorder(&Caller::staff(), event_id, &[ids[0], ids[1]], None)
            .await
            .unwrap();

        let mut revisions = Vec::new();
        for _ in 0..2 {
            let envelope = rx.recv().await.unwrap();
            assert_eq!(envelope.event.kind(), "sequence.changed");
            revisions.push(envelope.revision);
        }
        assert!(revisions[0] < revisions[1]);
    }

    #[tokio::test]
    async fn test_unnumbered_create_keeps_sequence_version() {
        let (services, _dir) = setup().await;
        let (event_id, ids) = seed_event(&services, &["A", "B"]).await;
        let seen = services.sequencer.program(event_id).await.unwrap();
        let mut rx = services.bus.subscribe();

        services
            .sequencer
            .create_performance(
                &Caller::staff(),
                event_id,
                CreatePerformanceRequest {
                    title: "Standby".to_string(),
                    numbered: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let after = services.sequencer.program(event_id).await.unwrap();
        assert_eq!(after.sequence_version, seen.sequence_version);

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.event.kind(), "performance.created");
        assert!(rx.try_recv().is_err());

        services
            .sequencer
            .reorder(&Caller::staff(), event_id, &[ids[1], ids[0]], Some(seen.sequence_version))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_repeated_reorders_stay_dense() {
        let (services, _dir) = setup().await;
        let (event_id, ids) = seed_event(&services, &["A", "B", "C", "D", "E"]).await;
        let staff = Caller::staff();

        let mut order = ids.clone();
        for step in 0..12 {
            order.rotate_left(step % 4 + 1);
            let len = order.len();
            order.swap(0, step % len);
            let program = services
                .sequencer
                .reorder(&staff, event_id, &order, None)
                .await
                .unwrap();
            assert_eq!(program.order, order);

            let numbers: Vec<u32> = services
                .performances()
                .find_by_event(event_id, None)
                .await
                .unwrap()
                .iter()
                .filter_map(|p| p.item_number)
                .collect();
            assert_eq!(numbers.len(), ids.len());
            assert!(is_dense_sequence(&numbers));
        }
    }

    #[tokio::test]
    async fn test_unknown_event_leaves_no_lock_entries() {
        let (services, _dir) = setup().await;

        for _ in 0..5 {
            let err = services
                .sequencer
                .reorder(&Caller::staff(), Uuid::new_v4(), &[], None)
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::NotFound(_)));
        }
        assert!(services.sequencer.locks.is_empty());
    }
}
