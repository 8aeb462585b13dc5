use db::{EventRepository, JudgeRepository};
use showrunner_core::{Caller, JudgeAssignment};
use tracing::info;
use uuid::Uuid;

use crate::error::{Result, ServiceError};

/// Which judges are expected to score an event's performances.
#[derive(Clone)]
pub struct JudgeRoster {
    events: EventRepository,
    judges: JudgeRepository,
}

impl JudgeRoster {
    pub fn new(events: EventRepository, judges: JudgeRepository) -> Self {
        Self { events, judges }
    }

    /// Idempotent; assigning twice keeps the first assignment.
    pub async fn assign(&self, caller: &Caller, event_id: Uuid, judge_id: Uuid) -> Result<JudgeAssignment> {
        caller.require_admin()?;
        let assignment = self.judges.assign(event_id, judge_id).await?;
        info!(event_id = %event_id, judge_id = %judge_id, "Judge assigned");
        Ok(assignment)
    }

    pub async fn unassign(&self, caller: &Caller, event_id: Uuid, judge_id: Uuid) -> Result<()> {
        caller.require_admin()?;
        if !self.judges.unassign(event_id, judge_id).await? {
            return Err(ServiceError::NotFound(format!(
                "Judge {} is not assigned to event {}",
                judge_id, event_id
            )));
        }
        info!(event_id = %event_id, judge_id = %judge_id, "Judge unassigned");
        Ok(())
    }

    pub async fn list(&self, caller: &Caller, event_id: Uuid) -> Result<Vec<JudgeAssignment>> {
        caller.require_staff()?;
        if self.events.find_by_id(event_id).await?.is_none() {
            return Err(ServiceError::event_not_found(event_id));
        }
        Ok(self.judges.list_for_event(event_id).await?)
    }

    /// Replaces the event roster for one performance. An empty list falls
    /// back to the event roster.
    pub async fn set_performance_roster(
        &self,
        caller: &Caller,
        performance_id: Uuid,
        judge_ids: &[Uuid],
    ) -> Result<Vec<Uuid>> {
        caller.require_admin()?;
        if judge_ids.is_empty() {
            self.judges.clear_performance_roster(performance_id).await?;
        } else {
            self.judges.set_performance_roster(performance_id, judge_ids).await?;
        }
        Ok(self.judges.roster_for_performance(performance_id).await?)
    }

    pub async fn roster_for_performance(&self, performance_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(self.judges.roster_for_performance(performance_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_event, setup};

    #[tokio::test]
    async fn test_assign_is_idempotent() {
        let (services, _dir) = setup().await;
        let (event_id, _) = seed_event(&services, &[]).await;
        let admin = Caller::admin();
        let judge = Uuid::new_v4();

        services.roster.assign(&admin, event_id, judge).await.unwrap();
        services.roster.assign(&admin, event_id, judge).await.unwrap();

        let judges = services.roster.list(&admin, event_id).await.unwrap();
        assert_eq!(judges.len(), 1);
        assert_eq!(judges[0].judge_id, judge);
    }

    #[tokio::test]
    async fn test_assign_requires_admin() {
        let (services, _dir) = setup().await;
        let (event_id, _) = seed_event(&services, &[]).await;

        let err = services
            .roster
            .assign(&Caller::staff(), event_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_assign_to_unknown_event() {
        let (services, _dir) = setup().await;
        let err = services
            .roster
            .assign(&Caller::admin(), Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unassign_unknown_judge() {
        let (services, _dir) = setup().await;
        let (event_id, _) = seed_event(&services, &[]).await;

        let err = services
            .roster
            .unassign(&Caller::admin(), event_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_performance_roster_overrides_and_falls_back() {
        let (services, _dir) = setup().await;
        let (event_id, ids) = seed_event(&services, &["A"]).await;
        let admin = Caller::admin();
        let (j1, j2) = (Uuid::new_v4(), Uuid::new_v4());
        services.roster.assign(&admin, event_id, j1).await.unwrap();
        services.roster.assign(&admin, event_id, j2).await.unwrap();

        let roster = services
            .roster
            .set_performance_roster(&admin, ids[0], &[j2])
            .await
            .unwrap();
        assert_eq!(roster, vec![j2]);

        let mut fallback = services
            .roster
            .set_performance_roster(&admin, ids[0], &[])
            .await
            .unwrap();
        fallback.sort();
        let mut expected = vec![j1, j2];
        expected.sort();
        assert_eq!(fallback, expected);
    }
}
