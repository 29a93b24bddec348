use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::graph::GraphRepository;
use crate::services::advisor::Advisor;
use crate::services::reference::ReferenceService;
use crate::store::WarehouseProxy;

/// Shared handler state. The warehouse is optional: the server boots and
/// serves the graph and reference routes even when the interaction store is
/// down, and mastery routes degrade instead of failing.
#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    warehouse: Option<Arc<WarehouseProxy>>,
    graph: Arc<GraphRepository>,
    advisor: Arc<Advisor>,
    references: Arc<ReferenceService>,
    store_timeout: Duration,
}

impl AppState {
    pub fn new(warehouse: Option<Arc<WarehouseProxy>>, store_timeout: Duration) -> Self {
        Self {
            started_at: Instant::now(),
            warehouse,
            graph: Arc::new(GraphRepository::seeded()),
            advisor: Arc::new(Advisor::from_env()),
            references: Arc::new(ReferenceService::from_env()),
            store_timeout,
        }
    }

    pub fn warehouse(&self) -> Option<&WarehouseProxy> {
        self.warehouse.as_deref()
    }

    pub fn graph(&self) -> &GraphRepository {
        &self.graph
    }

    pub fn advisor(&self) -> &Advisor {
        &self.advisor
    }

    pub fn references(&self) -> &ReferenceService {
        &self.references
    }

    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
