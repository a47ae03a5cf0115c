use std::sync::Arc;
use std::time::Instant;

use crate::lifecycle::LifecycleService;
use crate::store::TmsStore;

/// Gateway application state (shared)
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LifecycleService>,
    /// Startup instant for the health endpoint's uptime
    pub started_at: Instant,
}

impl AppState {
    pub fn new(service: LifecycleService) -> Self {
        Self {
            service: Arc::new(service),
            started_at: Instant::now(),
        }
    }

    pub fn store(&self) -> &Arc<dyn TmsStore> {
        self.service.store()
    }
}
