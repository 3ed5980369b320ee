//! Conectividad
//!
//! Señal online/offline del entorno y la tarea que sincroniza la cola
//! offline cuando se recupera la conexión.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::citation_service::CitationService;

/// Consulta de conectividad usada por el servicio de challans
pub trait ConnectivityProbe: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Estado online/offline observable
#[derive(Clone)]
pub struct Connectivity {
    sender: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        let (sender, _) = watch::channel(online);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Cambiar el estado; devuelve `true` si hubo transición
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.sender.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            if online {
                info!("🌐 Conexión recuperada");
            } else {
                warn!("📴 Sin conexión: los challans se guardarán localmente");
            }
        }
        changed
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

impl ConnectivityProbe for Connectivity {
    fn is_online(&self) -> bool {
        *self.sender.borrow()
    }
}

/// Lanzar la tarea que sincroniza al pasar de offline a online.
///
/// Con `sync_on_start` también sincroniza una vez al arrancar si ya hay
/// conexión. Los errores de sincronización se registran y la tarea sigue.
pub fn spawn_reconnect_sync(
    service: Arc<CitationService>,
    connectivity: &Connectivity,
    sync_on_start: bool,
) -> JoinHandle<()> {
    let mut rx = connectivity.subscribe();
    tokio::spawn(async move {
        if sync_on_start && *rx.borrow_and_update() {
            run_sync(&service).await;
        }

        // `set_online` solo notifica transiciones reales: un cambio que deja
        // el estado en online implica que hubo un periodo offline, aunque
        // el watch haya fusionado varias transiciones.
        while rx.changed().await.is_ok() {
            let online = *rx.borrow_and_update();
            if online {
                run_sync(&service).await;
            }
        }
    })
}

async fn run_sync(service: &CitationService) {
    match service.sync_queued_citations().await {
        Ok(report) if report.synced > 0 || report.failed > 0 => {
            info!("🔄 Sincronización: {} sincronizados, {} fallidos", report.synced, report.failed);
        }
        Ok(_) => {}
        Err(e) => warn!("⚠️ Sincronización fallida: {}", e.user_message()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_are_reported_once() {
        let connectivity = Connectivity::new(true);
        assert!(connectivity.is_online());
        assert!(!connectivity.set_online(true));
        assert!(connectivity.set_online(false));
        assert!(!connectivity.is_online());
        assert!(!connectivity.set_online(false));
        assert!(connectivity.set_online(true));
    }

    #[tokio::test]
    async fn test_subscribers_observe_changes() {
        let connectivity = Connectivity::new(false);
        let mut rx = connectivity.subscribe();
        connectivity.set_online(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }
}
