use db::{EventRepository, PerformanceRepository};
use events::{Event, EventBus, EventEnvelope};
use showrunner_core::{Caller, Performance, PerformanceStatus, StatusTransition};
use tracing::{debug, info};
use uuid::Uuid;

use crate::current::CurrentPerformanceStore;
use crate::error::{Result, ServiceError};
use crate::locks::EventLocks;

/// Execution status, judge visibility and the on-stage pointer.
#[derive(Clone)]
pub struct LifecycleManager {
    events: EventRepository,
    performances: PerformanceRepository,
    bus: EventBus,
    locks: EventLocks,
    current: CurrentPerformanceStore,
}

impl LifecycleManager {
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

    pub async fn get_performance(&self, performance_id: Uuid) -> Result<Performance> {
        self.performances
            .find_by_id(performance_id)
            .await?
            .ok_or_else(|| ServiceError::performance_not_found(performance_id))
    }

    /// Admin listing; withdrawn performances are included.
    pub async fn list_performances(
        &self,
        caller: &Caller,
        event_id: Uuid,
        status: Option<PerformanceStatus>,
    ) -> Result<Vec<Performance>> {
        caller.require_staff()?;
        self.ensure_event(event_id).await?;
        Ok(self.performances.find_by_event(event_id, status).await?)
    }

    /// Any status may follow any other. The move is classified, logged and
    /// broadcast, never rejected.
    pub async fn set_status(
        &self,
        caller: &Caller,
        performance_id: Uuid,
        status: PerformanceStatus,
    ) -> Result<Performance> {
        caller.require_staff()?;
        let event_id = self.get_performance(performance_id).await?.event_id;

        let _guard = self.locks.acquire(event_id).await;
        let update = self
            .performances
            .set_status(performance_id, status)
            .await?
            .ok_or_else(|| ServiceError::performance_not_found(performance_id))?;

        let transition = update.previous.transition_to(status);
        match transition {
            StatusTransition::Correction | StatusTransition::Revive => info!(
                performance_id = %performance_id,
                from = update.previous.as_str(),
                to = status.as_str(),
                ?transition,
                "Manual status correction"
            ),
            _ => debug!(
                performance_id = %performance_id,
                from = update.previous.as_str(),
                to = status.as_str(),
                "Status changed"
            ),
        }

        self.bus.publish(EventEnvelope::for_revision(
            update.revision,
            Event::StatusChanged {
                event_id,
                performance_id,
                from_status: update.previous,
                to_status: status,
                transition,
            },
        ));

        let pointer_moved = if status == PerformanceStatus::InProgress {
            self.current.set(event_id, performance_id)
        } else {
            self.current.clear_if(event_id, performance_id)
        };
        if pointer_moved {
            self.bus.publish(EventEnvelope::for_revision(
                update.revision,
                Event::CurrentChanged {
                    event_id,
                    performance_id: self.current.get(event_id),
                },
            ));
        }

        Ok(update.performance)
    }

    /// Hides the performance from judges. Idempotent.
    pub async fn withdraw(&self, caller: &Caller, performance_id: Uuid) -> Result<Performance> {
        self.set_withdrawn(caller, performance_id, true).await
    }

    /// Makes a withdrawn performance visible to judges again. Idempotent.
    pub async fn restore(&self, caller: &Caller, performance_id: Uuid) -> Result<Performance> {
        self.set_withdrawn(caller, performance_id, false).await
    }

    async fn set_withdrawn(
        &self,
        caller: &Caller,
        performance_id: Uuid,
        withdrawn: bool,
    ) -> Result<Performance> {
        caller.require_staff()?;
        let event_id = self.get_performance(performance_id).await?.event_id;

        let _guard = self.locks.acquire(event_id).await;
        let update = self
            .performances
            .set_withdrawn(performance_id, withdrawn)
            .await?
            .ok_or_else(|| ServiceError::performance_not_found(performance_id))?;

        if let Some(revision) = update.revision {
            info!(performance_id = %performance_id, withdrawn, "Judging visibility changed");
            self.bus.publish(EventEnvelope::for_revision(
                revision,
                Event::WithdrawalChanged {
                    event_id,
                    performance_id,
                    withdrawn,
                },
            ));
        }

        Ok(update.performance)
    }

    /// Returns every performance of the event to `scheduled` and clears the
    /// on-stage pointer. Order and scores are kept.
    pub async fn reset_event(&self, caller: &Caller, event_id: Uuid) -> Result<Vec<Uuid>> {
        caller.require_admin()?;

        let _guard = self.locks.acquire(event_id).await;
        let reset = self.performances.reset_statuses(event_id).await?;
        self.current.clear(event_id);

        info!(event_id = %event_id, reset = reset.reset_ids.len(), "Event reset");
        self.bus.publish(EventEnvelope::for_revision(
            reset.revision,
            Event::EventReset {
                event_id,
                reset_performance_ids: reset.reset_ids.clone(),
            },
        ));
        self.bus.publish(EventEnvelope::for_revision(
            reset.revision,
            Event::CurrentChanged {
                event_id,
                performance_id: None,
            },
        ));

        Ok(reset.reset_ids)
    }

    pub async fn get_current(&self, event_id: Uuid) -> Result<Option<Performance>> {
        self.ensure_event(event_id).await?;
        match self.current.get(event_id) {
            Some(performance_id) => Ok(self.performances.find_by_id(performance_id).await?),
            None => Ok(None),
        }
    }

    /// Points the event at `performance_id` without touching its status.
    pub async fn set_current(
        &self,
        caller: &Caller,
        event_id: Uuid,
        performance_id: Uuid,
    ) -> Result<Performance> {
        caller.require_staff()?;
        let performance = self.get_performance(performance_id).await?;
        if performance.event_id != event_id {
            return Err(ServiceError::performance_not_found(performance_id));
        }

        let _guard = self.locks.acquire(event_id).await;
        if self.current.set(event_id, performance_id) {
            self.publish_current(event_id, Some(performance_id)).await?;
        }

        Ok(performance)
    }

    pub async fn clear_current(&self, caller: &Caller, event_id: Uuid) -> Result<()> {
        caller.require_staff()?;
        self.ensure_event(event_id).await?;

        let _guard = self.locks.acquire(event_id).await;
        if self.current.clear(event_id).is_some() {
            self.publish_current(event_id, None).await?;
        }

        Ok(())
    }

    async fn publish_current(&self, event_id: Uuid, performance_id: Option<Uuid>) -> Result<()> {
        let revision = self.events.advance_revision(event_id).await?;
        self.bus.publish(EventEnvelope::for_revision(
            revision,
            Event::CurrentChanged {
                event_id,
                performance_id,
            },
        ));
        Ok(())
    }

    async fn ensure_event(&self, event_id: Uuid) -> Result<()> {
        match self.events.find_by_id(event_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::event_not_found(event_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_event, setup};

    #[tokio::test]
    async fn test_every_transition_succeeds() {
        let (services, _dir) = setup().await;
        let (_event_id, ids) = seed_event(&services, &["A"]).await;
        let staff = Caller::staff();

        for from in PerformanceStatus::ALL {
            for to in PerformanceStatus::ALL {
                services.lifecycle.set_status(&staff, ids[0], from).await.unwrap();
                let performance = services.lifecycle.set_status(&staff, ids[0], to).await.unwrap();
                assert_eq!(performance.status, to);
            }
        }
    }

    #[tokio::test]
    async fn test_status_change_keeps_order_and_withdrawal() {
        let (services, _dir) = setup().await;
        let (event_id, ids) = seed_event(&services, &["A", "B"]).await;
        let staff = Caller::staff();

        services.lifecycle.withdraw(&staff, ids[1]).await.unwrap();
        let performance = services
            .lifecycle
            .set_status(&staff, ids[1], PerformanceStatus::Cancelled)
            .await
            .unwrap();

        assert_eq!(performance.item_number, Some(2));
        assert!(performance.withdrawn_from_judging);
        let program = services.sequencer.program(event_id).await.unwrap();
        assert_eq!(program.order, ids);
    }

    #[tokio::test]
    async fn test_withdraw_is_idempotent() {
        let (services, _dir) = setup().await;
        let (_event_id, ids) = seed_event(&services, &["A"]).await;
        let staff = Caller::staff();
        let mut rx = services.bus.subscribe();

        services.lifecycle.withdraw(&staff, ids[0]).await.unwrap();
        let again = services.lifecycle.withdraw(&staff, ids[0]).await.unwrap();
        assert!(again.withdrawn_from_judging);
        assert_eq!(again.item_number, Some(1));

        let restored = services.lifecycle.restore(&staff, ids[0]).await.unwrap();
        assert!(!restored.withdrawn_from_judging);

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(matches!(first.event, Event::WithdrawalChanged { withdrawn: true, .. }));
        assert!(matches!(second.event, Event::WithdrawalChanged { withdrawn: false, .. }));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_in_progress_moves_current_pointer() {
        let (services, _dir) = setup().await;
        let (event_id, ids) = seed_event(&services, &["A", "B"]).await;
        let staff = Caller::staff();

        services
            .lifecycle
            .set_status(&staff, ids[0], PerformanceStatus::InProgress)
            .await
            .unwrap();
        let current = services.lifecycle.get_current(event_id).await.unwrap().unwrap();
        assert_eq!(current.id, ids[0]);

        // Completing a performance that is not on stage leaves the pointer.
        services
            .lifecycle
            .set_status(&staff, ids[1], PerformanceStatus::Completed)
            .await
            .unwrap();
        assert!(services.lifecycle.get_current(event_id).await.unwrap().is_some());

        services
            .lifecycle
            .set_status(&staff, ids[0], PerformanceStatus::Completed)
            .await
            .unwrap();
        assert!(services.lifecycle.get_current(event_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reset_event() {
        let (services, _dir) = setup().await;
        let (event_id, ids) = seed_event(&services, &["A", "B"]).await;
        let staff = Caller::staff();

        services
            .lifecycle
            .set_status(&staff, ids[0], PerformanceStatus::InProgress)
            .await
            .unwrap();
        services
            .lifecycle
            .set_status(&staff, ids[1], PerformanceStatus::Completed)
            .await
            .unwrap();

        let err = services.lifecycle.reset_event(&staff, event_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        let reset = services
            .lifecycle
            .reset_event(&Caller::admin(), event_id)
            .await
            .unwrap();
        assert_eq!(reset.len(), 2);
        assert!(services.lifecycle.get_current(event_id).await.unwrap().is_none());

        let listed = services
            .lifecycle
            .list_performances(&staff, event_id, Some(PerformanceStatus::Scheduled))
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(services.sequencer.program(event_id).await.unwrap().order, ids);
    }

    #[tokio::test]
    async fn test_set_current_checks_event() {
        let (services, _dir) = setup().await;
        let (event_id, ids) = seed_event(&services, &["A"]).await;
        let (other_event, _) = seed_event(&services, &[]).await;
        let staff = Caller::staff();

        let err = services
            .lifecycle
            .set_current(&staff, other_event, ids[0])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        services.lifecycle.set_current(&staff, event_id, ids[0]).await.unwrap();
        assert_eq!(
            services.lifecycle.get_current(event_id).await.unwrap().map(|p| p.id),
            Some(ids[0])
        );

        services.lifecycle.clear_current(&staff, event_id).await.unwrap();
        assert!(services.lifecycle.get_current(event_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_status_of_missing_performance() {
        let (services, _dir) = setup().await;
        let err = services
            .lifecycle
            .set_status(&Caller::staff(), Uuid::new_v4(), PerformanceStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
