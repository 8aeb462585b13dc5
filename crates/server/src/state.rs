use std::sync::Arc;

use events::EventBus;
use running_order::RunningOrder;
use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::routes::ws::ServiceIntents;

#[derive(Clone)]
pub struct AppState {
    pub services: RunningOrder,
    pub event_bus: EventBus,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_config(pool, AppConfig::default())
    }

    pub fn with_config(pool: SqlitePool, config: AppConfig) -> Self {
        let event_bus = EventBus::with_capacity(config.live.bus_capacity, config.live.replay_log_size);
        let services = RunningOrder::new(pool, event_bus.clone());

        Self {
            services,
            event_bus,
            config: Arc::new(config),
        }
    }

    /// Socket intent dispatcher over the same services as the REST routes.
    pub fn intents(&self) -> Arc<ServiceIntents> {
        Arc::new(ServiceIntents::new(self.services.clone()))
    }
}
