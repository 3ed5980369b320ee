//! Shared application state
//!
//! Raíz de composición: construye el almacenamiento, las notificaciones,
//! la conectividad y el servicio de challans, y los reparte explícitamente
//! en lugar de usar singletons globales.

use std::sync::Arc;

use crate::config::environment::EnvironmentConfig;
use crate::monitor::{MonitorEvent, MonitorRunner, RandomWalkSignal, SpeedSignal};
use crate::services::{CitationService, Connectivity, MockCitationApi, NotificationHub};
use crate::storage::{FileStore, KeyValueStore, MemoryStore, StorageService};

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub storage: StorageService,
    pub notifications: NotificationHub,
    pub connectivity: Connectivity,
    pub api: Arc<MockCitationApi>,
    pub citations: Arc<CitationService>,
}

impl AppState {
    /// Estado con el almacén indicado por la configuración
    pub fn new(config: EnvironmentConfig) -> Self {
        let store: Arc<dyn KeyValueStore> = match &config.storage.path {
            Some(path) => {
                log::info!("💾 Almacenamiento local en {}", path.display());
                Arc::new(FileStore::new(path.clone()))
            }
            None => {
                log::info!("💾 Almacenamiento local en memoria");
                Arc::new(MemoryStore::new())
            }
        };
        Self::with_store(config, store)
    }

    pub fn with_store(config: EnvironmentConfig, store: Arc<dyn KeyValueStore>) -> Self {
        let storage = StorageService::new(store, config.storage.clone());
        if !storage.is_available() {
            log::warn!("⚠️ Almacenamiento local no disponible: los challans offline quedarán en memoria");
        }
        let notifications = NotificationHub::with_storage(storage.clone());
        let connectivity = Connectivity::new(!config.start_offline);
        let api = Arc::new(MockCitationApi::new(config.network_latency, config.sync_latency));
        let citations = Arc::new(CitationService::new(
            api.clone(),
            Arc::new(connectivity.clone()),
            storage.clone(),
            notifications.clone(),
        ));

        Self {
            config,
            storage,
            notifications,
            connectivity,
            api,
            citations,
        }
    }

    /// Runner de monitoreo con la señal simulada configurada
    pub fn monitor_runner(&self) -> (MonitorRunner, tokio::sync::mpsc::UnboundedReceiver<MonitorEvent>) {
        let max_speed = self.config.monitor.max_speed;
        let signal: Box<dyn SpeedSignal> = match self.config.monitor_seed {
            Some(seed) => Box::new(RandomWalkSignal::seeded(seed, max_speed)),
            None => Box::new(RandomWalkSignal::from_entropy(max_speed)),
        };
        MonitorRunner::new(
            self.config.monitor.clone(),
            signal,
            self.citations.clone(),
            self.config.default_vehicle.clone(),
            self.config.default_location.clone(),
        )
    }
}
