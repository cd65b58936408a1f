use std::sync::Arc;

use tracing::{info, warn};

use rentflow_events::InMemoryEventBus;
use rentflow_infra::{
    AppConfig, FulfillmentService, FulfillmentStore, InMemoryFulfillmentStore, LifecycleEnvelope,
    PostgresFulfillmentStore, StoreError,
};

pub type SharedStore = Arc<dyn FulfillmentStore>;
pub type LifecycleBus = Arc<InMemoryEventBus<LifecycleEnvelope>>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    Postgres,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::InMemory => "in_memory",
            StoreBackend::Postgres => "postgres",
        }
    }
}

/// Everything the handlers need, shared across requests.
#[derive(Clone)]
pub struct AppServices {
    pub fulfillment: FulfillmentService<SharedStore, LifecycleBus>,
    /// Lifecycle events are published here after each committed transition.
    pub bus: LifecycleBus,
    pub backend: StoreBackend,
}

impl AppServices {
    pub fn new(store: SharedStore, backend: StoreBackend) -> Self {
        let bus: LifecycleBus = Arc::new(InMemoryEventBus::new());
        Self {
            fulfillment: FulfillmentService::new(store, bus.clone()),
            bus,
            backend,
        }
    }

    pub fn in_memory(store: InMemoryFulfillmentStore) -> Self {
        Self::new(Arc::new(store), StoreBackend::InMemory)
    }

    /// Postgres when `DATABASE_URL` is set (schema applied on start), otherwise
    /// an empty in-memory store.
    pub async fn from_config(config: &AppConfig) -> Result<Self, StoreError> {
        match config.database_url.as_deref() {
            Some(url) => {
                let store = PostgresFulfillmentStore::connect(url, config.db_max_connections).await?;
                store.apply_schema().await?;
                info!(max_connections = config.db_max_connections, "using postgres store");
                Ok(Self::new(Arc::new(store), StoreBackend::Postgres))
            }
            None => {
                warn!("DATABASE_URL not set; using in-memory store (data is lost on restart)");
                Ok(Self::in_memory(InMemoryFulfillmentStore::new()))
            }
        }
    }
}
