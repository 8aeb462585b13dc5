use db::EventRepository;
use showrunner_core::{Caller, CompetitionEvent, CreateEventRequest};
use tracing::info;
use uuid::Uuid;

use crate::current::CurrentPerformanceStore;
use crate::error::{Result, ServiceError};
use crate::locks::EventLocks;

#[derive(Clone)]
pub struct EventCatalog {
    events: EventRepository,
    locks: EventLocks,
    current: CurrentPerformanceStore,
}

impl EventCatalog {
    pub fn new(events: EventRepository, locks: EventLocks, current: CurrentPerformanceStore) -> Self {
        Self {
            events,
            locks,
            current,
        }
    }

    pub async fn create(&self, caller: &Caller, request: CreateEventRequest) -> Result<CompetitionEvent> {
        caller.require_staff()?;
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ServiceError::Validation("event name must not be empty".to_string()));
        }

        let event = self.events.create(&CompetitionEvent::new(name)).await?;
        info!(event_id = %event.id, name = %event.name, "Event created");
        Ok(event)
    }

    pub async fn get(&self, event_id: Uuid) -> Result<CompetitionEvent> {
        self.events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| ServiceError::event_not_found(event_id))
    }

    pub async fn list(&self) -> Result<Vec<CompetitionEvent>> {
        Ok(self.events.find_all().await?)
    }

    /// Removes the event with its performances, scores and rosters.
    pub async fn delete(&self, caller: &Caller, event_id: Uuid) -> Result<()> {
        caller.require_admin()?;
        let _guard = self.locks.acquire(event_id).await;
        if !self.events.delete(event_id).await? {
            return Err(ServiceError::event_not_found(event_id));
        }
        self.current.clear(event_id);

        info!(event_id = %event_id, "Event deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_event, setup};

    #[tokio::test]
    async fn test_create_and_list() {
        let (services, _dir) = setup().await;
        let event = services
            .catalog
            .create(
                &Caller::staff(),
                CreateEventRequest {
                    name: "  Spring Showcase ".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(event.name, "Spring Showcase");

        let events = services.catalog.list().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(services.catalog.get(event.id).await.unwrap().id, event.id);
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let (services, _dir) = setup().await;
        let err = services
            .catalog
            .create(&Caller::staff(), CreateEventRequest { name: " ".to_string() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_without_role() {
        let (services, _dir) = setup().await;
        let err = services
            .catalog
            .create(&Caller::anonymous(), CreateEventRequest { name: "X".to_string() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::MissingRole));
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let (services, _dir) = setup().await;
        let (event_id, ids) = seed_event(&services, &["A", "B"]).await;
        services
            .lifecycle
            .set_current(&Caller::staff(), event_id, ids[0])
            .await
            .unwrap();

        services.catalog.delete(&Caller::admin(), event_id).await.unwrap();

        assert!(matches!(
            services.catalog.get(event_id).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
        assert!(services.performances().find_by_id(ids[0]).await.unwrap().is_none());
        assert_eq!(services.current.get(event_id), None);
        assert!(matches!(
            services.catalog.delete(&Caller::admin(), event_id).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }
}
