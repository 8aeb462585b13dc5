pub mod catalog;
pub mod current;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod locks;
pub mod roster;
pub mod sequencer;

pub use catalog::EventCatalog;
pub use current::CurrentPerformanceStore;
pub use error::{Result, ServiceError};
pub use ledger::ScoreLedger;
pub use lifecycle::LifecycleManager;
pub use locks::EventLocks;
pub use roster::JudgeRoster;
pub use sequencer::ProgramSequencer;

use db::{EventRepository, JudgeRepository, PerformanceRepository, ScoreRepository};
use events::EventBus;
use sqlx::SqlitePool;

/// Every service wired over one pool, one bus and one set of event locks.
#[derive(Clone)]
pub struct RunningOrder {
    pub catalog: EventCatalog,
    pub sequencer: ProgramSequencer,
    pub lifecycle: LifecycleManager,
    pub ledger: ScoreLedger,
    pub roster: JudgeRoster,
    pub current: CurrentPerformanceStore,
    pub bus: EventBus,
    performances: PerformanceRepository,
}

impl RunningOrder {
    pub fn new(pool: SqlitePool, bus: EventBus) -> Self {
        let events = EventRepository::new(pool.clone());
        let performances = PerformanceRepository::new(pool.clone());
        let scores = ScoreRepository::new(pool.clone());
        let judges = JudgeRepository::new(pool);
        let locks = EventLocks::new();
        let current = CurrentPerformanceStore::new();

        Self {
            catalog: EventCatalog::new(events.clone(), locks.clone(), current.clone()),
            sequencer: ProgramSequencer::new(
                events.clone(),
                performances.clone(),
                bus.clone(),
                locks.clone(),
                current.clone(),
            ),
            lifecycle: LifecycleManager::new(
                events.clone(),
                performances.clone(),
                bus.clone(),
                locks.clone(),
                current.clone(),
            ),
            ledger: ScoreLedger::new(
                events.clone(),
                performances.clone(),
                scores,
                judges.clone(),
                bus.clone(),
                locks,
            ),
            roster: JudgeRoster::new(events, judges),
            current,
            bus,
            performances,
        }
    }

    /// Read access for projections that need no service rules.
    pub fn performances(&self) -> &PerformanceRepository {
        &self.performances
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use showrunner_core::{Caller, CreateEventRequest, CreatePerformanceRequest};
    use tempfile::TempDir;
    use uuid::Uuid;

    use super::*;

    pub async fn setup() -> (RunningOrder, TempDir) {
        let dir = TempDir::new().unwrap();
        let pool = db::create_migrated_pool_in(dir.path()).await.unwrap();
        (RunningOrder::new(pool, EventBus::new()), dir)
    }

    pub fn entry(title: &str) -> CreatePerformanceRequest {
        CreatePerformanceRequest {
            title: title.to_string(),
            ..Default::default()
        }
    }

    /// Event with numbered performances `1..=titles.len()` in the given order.
    pub async fn seed_event(services: &RunningOrder, titles: &[&str]) -> (Uuid, Vec<Uuid>) {
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

        let mut ids = Vec::with_capacity(titles.len());
        for title in titles {
            let performance = services
                .sequencer
                .create_performance(&Caller::staff(), event.id, entry(title))
                .await
                .unwrap();
            ids.push(performance.id);
        }
        (event.id, ids)
    }
}
