//! Shared application state handed to every route.

use std::sync::Arc;

use dispatch_core::config::{DispatchConfig, LocationConfig};
use dispatch_core::error::ConfigError;
use dispatch_core::location::{DriverLocationStore, InMemoryLocationStore};
use dispatch_core::DispatchService;

pub struct AppState {
    service: Arc<DispatchService>,
    store: Arc<InMemoryLocationStore>,
}

impl AppState {
    pub fn new(dispatch: DispatchConfig, location: &LocationConfig) -> Result<Self, ConfigError> {
        let store = Arc::new(InMemoryLocationStore::new(location)?);
        let shared: Arc<dyn DriverLocationStore> = store.clone();
        Ok(Self {
            service: DispatchService::new(shared, dispatch),
            store,
        })
    }

    pub fn service(&self) -> &Arc<DispatchService> {
        &self.service
    }

    /// The concrete store, for sweeping and health reporting.
    pub fn store(&self) -> &Arc<InMemoryLocationStore> {
        &self.store
    }
}
