//! Servicio de notificaciones
//!
//! Reparte las notificaciones a los suscriptores (capa de presentación) por
//! un canal broadcast y conserva un historial acotado, replicado en el
//! almacenamiento local cuando está disponible.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::models::{Notification, NotificationKind};
use crate::storage::{keys, StorageService};

const CHANNEL_CAPACITY: usize = 64;

/// Hub de notificaciones compartido por los servicios
#[derive(Clone)]
pub struct NotificationHub {
    sender: broadcast::Sender<Notification>,
    history: Arc<RwLock<VecDeque<Notification>>>,
    capacity: usize,
    storage: Option<StorageService>,
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            history: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
            storage: None,
        }
    }

    /// Hub que replica el historial en el almacenamiento local
    pub fn with_storage(storage: StorageService) -> Self {
        let mut hub = Self::new(storage.config().notification_history);
        if let Ok(Some(saved)) = storage.get_data::<Vec<Notification>>(keys::NOTIFICATIONS) {
            let start = saved.len().saturating_sub(hub.capacity);
            hub.history = Arc::new(RwLock::new(saved.into_iter().skip(start).collect()));
        }
        hub.storage = Some(storage);
        hub
    }

    /// Suscribirse a las notificaciones nuevas
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Publicar una notificación. Nunca falla por falta de suscriptores.
    pub async fn publish(
        &self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Notification {
        let notification = Notification::new(kind, title, message);
        if self.capacity > 0 {
            let mut history = self.history.write().await;
            while history.len() >= self.capacity {
                history.pop_front();
            }
            history.push_back(notification.clone());
        }
        self.persist().await;

        if self.sender.send(notification.clone()).is_err() {
            log::debug!("📭 Notificación '{}' sin suscriptores", notification.title);
        }
        notification
    }

    /// Notificaciones más recientes primero
    pub async fn recent(&self) -> Vec<Notification> {
        self.history.read().await.iter().rev().cloned().collect()
    }

    pub async fn unread_count(&self) -> usize {
        self.history.read().await.iter().filter(|n| !n.read).count()
    }

    pub async fn mark_read(&self, id: Uuid) -> bool {
        let found = {
            let mut history = self.history.write().await;
            match history.iter_mut().find(|n| n.id == id) {
                Some(notification) => {
                    notification.read = true;
                    true
                }
                None => false,
            }
        };
        if found {
            self.persist().await;
        }
        found
    }

    pub async fn mark_all_read(&self) {
        {
            let mut history = self.history.write().await;
            history.iter_mut().for_each(|n| n.read = true);
        }
        self.persist().await;
    }

    pub async fn clear(&self) {
        self.history.write().await.clear();
        self.persist().await;
    }

    async fn persist(&self) {
        let Some(storage) = &self.storage else {
            return;
        };
        let snapshot: Vec<Notification> = self.history.read().await.iter().cloned().collect();
        if let Err(e) = storage.save_data(keys::NOTIFICATIONS, &snapshot) {
            log::warn!("⚠️ No se pudo guardar el historial de notificaciones: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StorageConfig};

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let hub = NotificationHub::new(10);
        let mut rx = hub.subscribe();

        hub.publish(NotificationKind::Info, "New Challan Generated", "AP1").await;
        let received = rx.recv().await.unwrap();
        assert_eq!(received.title, "New Challan Generated");
        assert!(!received.read);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_and_history_cap() {
        let hub = NotificationHub::new(2);
        for i in 0..3 {
            hub.publish(NotificationKind::Info, format!("n{}", i), "").await;
        }
        let titles: Vec<String> = hub.recent().await.into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["n2", "n1"]);
    }

    #[tokio::test]
    async fn test_zero_capacity_keeps_no_history() {
        let hub = NotificationHub::new(0);
        let mut rx = hub.subscribe();
        for i in 0..5 {
            hub.publish(NotificationKind::Info, format!("n{}", i), "").await;
        }
        assert!(hub.recent().await.is_empty());
        // Los suscriptores siguen recibiendo todo
        assert_eq!(rx.recv().await.unwrap().title, "n0");
    }

    #[tokio::test]
    async fn test_read_tracking() {
        let hub = NotificationHub::new(10);
        let first = hub.publish(NotificationKind::Warning, "a", "").await;
        hub.publish(NotificationKind::Success, "b", "").await;
        assert_eq!(hub.unread_count().await, 2);

        assert!(hub.mark_read(first.id).await);
        assert!(!hub.mark_read(Uuid::new_v4()).await);
        assert_eq!(hub.unread_count().await, 1);

        hub.mark_all_read().await;
        assert_eq!(hub.unread_count().await, 0);
    }

    #[tokio::test]
    async fn test_history_survives_restart() {
        let store = Arc::new(MemoryStore::new());
        let storage = StorageService::new(store.clone(), StorageConfig::default());

        let hub = NotificationHub::with_storage(storage.clone());
        hub.publish(NotificationKind::Info, "persisted", "").await;

        let reopened = NotificationHub::with_storage(storage);
        let recent = reopened.recent().await;
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].title, "persisted");
    }

    #[tokio::test]
    async fn test_storage_failure_does_not_break_publish() {
        let store = Arc::new(MemoryStore::new());
        let storage = StorageService::new(store.clone(), StorageConfig::default());
        let hub = NotificationHub::with_storage(storage);

        store.set_available(false);
        hub.publish(NotificationKind::Error, "still delivered", "").await;
        assert_eq!(hub.recent().await.len(), 1);
    }
}
