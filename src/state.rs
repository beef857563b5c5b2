use std::sync::Arc;

use crate::{
    config::AppConfig,
    notify::{NotificationHub, Notifier},
    remote::{MemoryStore, RemoteStore},
    services::cart_service::CartCounts,
    storage::LocalObjectStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RemoteStore>,
    pub hub: NotificationHub,
    pub cart_counts: CartCounts,
    pub objects: LocalObjectStore,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn RemoteStore>) -> Self {
        Self {
            store,
            hub: NotificationHub::new(config.notification_buffer),
            cart_counts: CartCounts::default(),
            objects: LocalObjectStore::new(&config.upload_dir, &config.public_base_url),
            config: Arc::new(config),
        }
    }

    pub fn notifier(&self) -> Notifier<'_> {
        Notifier::new(self.store.as_ref(), &self.hub)
    }

    /// State backed by a fresh [`MemoryStore`]; the concrete handle is returned for inspection.
    pub fn in_memory(config: AppConfig) -> (Self, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Self::new(config, store.clone()), store)
    }
}
