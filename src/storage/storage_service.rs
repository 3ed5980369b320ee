//! Servicio de almacenamiento local
//!
//! Todos los datos viven en un único objeto JSON con espacio de nombres,
//! guardado bajo una clave raíz del almacén clave-valor. Cada operación
//! hace lectura-modificación-escritura completa bajo un lock.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::local_store::KeyValueStore;
use super::storage_config::{keys, StorageConfig};
use crate::models::{Citation, OfflineCitationRecord, SyncStatus};
use crate::utils::errors::{internal_error, not_found_error, storage_error, AppError, AppResult};

/// Servicio de almacenamiento durable
#[derive(Clone)]
pub struct StorageService {
    store: Arc<dyn KeyValueStore>,
    config: StorageConfig,
    lock: Arc<Mutex<()>>,
}

impl StorageService {
    pub fn new(store: Arc<dyn KeyValueStore>, config: StorageConfig) -> Self {
        Self {
            store,
            config,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Verificar si el almacenamiento está disponible
    pub fn is_available(&self) -> bool {
        self.store.probe().is_ok()
    }

    /// Guardar un valor bajo una clave lógica
    pub fn save_data<T: Serialize>(&self, key: &str, data: &T) -> AppResult<()> {
        let _guard = self.guard()?;
        let mut root = self.read_root()?;
        root.insert(key.to_string(), serde_json::to_value(data)?);
        self.write_root(&root)
    }

    /// Obtener un valor de una clave lógica
    pub fn get_data<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let _guard = self.guard()?;
        let mut root = self.read_root()?;
        match root.remove(key) {
            Some(Value::Null) | None => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    /// Eliminar una clave lógica
    pub fn remove_data(&self, key: &str) -> AppResult<()> {
        let _guard = self.guard()?;
        let mut root = self.read_root()?;
        if root.remove(key).is_some() {
            self.write_root(&root)?;
        }
        Ok(())
    }

    /// Borrar todos los datos de la aplicación
    pub fn clear_all(&self) -> AppResult<()> {
        let _guard = self.guard()?;
        self.store.remove_item(&self.config.root_key)
    }

    /// Guardar un challan en la cola offline con syncStatus=pending
    pub fn save_offline_citation(&self, citation: Citation) -> AppResult<OfflineCitationRecord> {
        self.save_offline_citation_at(citation, Utc::now())
    }

    pub fn save_offline_citation_at(
        &self,
        citation: Citation,
        queued_at: DateTime<Utc>,
    ) -> AppResult<OfflineCitationRecord> {
        let record = OfflineCitationRecord::queued(citation, queued_at);
        self.modify_queue(|queue| {
            queue.push(record.clone());
            Ok(())
        })?;
        debug!("💾 Challan {} guardado en la cola offline", record.citation.id);
        Ok(record)
    }

    /// Todos los registros de la cola offline
    pub fn offline_citations(&self) -> AppResult<Vec<OfflineCitationRecord>> {
        Ok(self
            .get_data::<Vec<OfflineCitationRecord>>(keys::OFFLINE_CHALLANS)?
            .unwrap_or_default())
    }

    /// Registros pendientes de sincronización
    pub fn pending_citations(&self) -> AppResult<Vec<OfflineCitationRecord>> {
        Ok(self
            .offline_citations()?
            .into_iter()
            .filter(OfflineCitationRecord::is_pending)
            .collect())
    }

    /// Actualizar el estado de sincronización de un registro.
    ///
    /// Solo se permite avanzar de pending a synced; devuelve si hubo cambio.
    pub fn update_sync_status(&self, citation_id: &str, status: SyncStatus) -> AppResult<bool> {
        self.modify_queue(|queue| {
            let record = queue
                .iter_mut()
                .find(|r| r.citation.id == citation_id)
                .ok_or_else(|| not_found_error("Offline challan", citation_id))?;
            match status {
                SyncStatus::Synced => Ok(record.mark_synced()),
                SyncStatus::Pending if record.is_pending() => Ok(false),
                SyncStatus::Pending => {
                    warn!("⚠️ Intento de devolver {} a pending ignorado", citation_id);
                    Ok(false)
                }
            }
        })
    }

    /// Eliminar los registros ya sincronizados; devuelve cuántos se eliminaron
    pub fn remove_synced(&self) -> AppResult<usize> {
        self.modify_queue(|queue| {
            let before = queue.len();
            queue.retain(OfflineCitationRecord::is_pending);
            Ok(before - queue.len())
        })
    }

    // Métodos privados

    fn guard(&self) -> AppResult<MutexGuard<'_, ()>> {
        self.lock.lock().map_err(|_| internal_error("storage lock poisoned"))
    }

    fn modify_queue<R>(
        &self,
        f: impl FnOnce(&mut Vec<OfflineCitationRecord>) -> AppResult<R>,
    ) -> AppResult<R> {
        let _guard = self.guard()?;
        let mut root = self.read_root()?;
        let mut queue: Vec<OfflineCitationRecord> = match root.remove(keys::OFFLINE_CHALLANS) {
            Some(Value::Null) | None => Vec::new(),
            Some(value) => serde_json::from_value(value)?,
        };
        let result = f(&mut queue)?;
        root.insert(keys::OFFLINE_CHALLANS.to_string(), serde_json::to_value(&queue)?);
        self.write_root(&root)?;
        Ok(result)
    }

    fn read_root(&self) -> AppResult<Map<String, Value>> {
        match self.store.get_item(&self.config.root_key)? {
            None => Ok(Map::new()),
            Some(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => Ok(map),
                Ok(_) | Err(_) => {
                    warn!("⚠️ Datos locales corruptos bajo '{}', se reinician", self.config.root_key);
                    Ok(Map::new())
                }
            },
        }
    }

    fn write_root(&self, root: &Map<String, Value>) -> AppResult<()> {
        let serialized = serde_json::to_string(root)?;
        self.store
            .set_item(&self.config.root_key, &serialized)
            .map_err(|e| match e {
                AppError::StorageUnavailable(_) => e,
                other => storage_error("write", other),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewCitation;
    use crate::storage::local_store::MemoryStore;
    use chrono::NaiveDate;
    use serde::Deserialize;

    fn service() -> (StorageService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (StorageService::new(store.clone(), StorageConfig::default()), store)
    }

    fn citation(id: &str) -> Citation {
        let request = NewCitation::new("AP23AB1234", "Overspeeding", "Main Road", 500, "");
        Citation::from_request(id.into(), &request, NaiveDate::from_ymd_opt(2025, 10, 30).unwrap(), true)
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Settings {
        sound: bool,
    }

    #[test]
    fn test_namespaced_keys_share_root() {
        let (storage, store) = service();
        storage.save_data("settings", &Settings { sound: true }).unwrap();
        storage.save_data("userInfo", &"officer").unwrap();

        let raw = store.get_item("ap_bike_challan_data").unwrap().unwrap();
        let root: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(root["settings"]["sound"], true);
        assert_eq!(root["userInfo"], "officer");

        storage.remove_data("userInfo").unwrap();
        assert_eq!(storage.get_data::<String>("userInfo").unwrap(), None);
        assert_eq!(
            storage.get_data::<Settings>("settings").unwrap(),
            Some(Settings { sound: true })
        );

        storage.clear_all().unwrap();
        assert_eq!(storage.get_data::<Settings>("settings").unwrap(), None);
    }

    #[test]
    fn test_offline_queue_lifecycle() {
        let (storage, _) = service();
        storage.save_offline_citation(citation("OFFLINE_1")).unwrap();
        storage.save_offline_citation(citation("OFFLINE_2")).unwrap();
        assert_eq!(storage.pending_citations().unwrap().len(), 2);

        assert!(storage.update_sync_status("OFFLINE_1", SyncStatus::Synced).unwrap());
        assert!(!storage.update_sync_status("OFFLINE_1", SyncStatus::Synced).unwrap());
        assert!(!storage.update_sync_status("OFFLINE_1", SyncStatus::Pending).unwrap());

        let pending = storage.pending_citations().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].citation.id, "OFFLINE_2");

        assert_eq!(storage.remove_synced().unwrap(), 1);
        assert_eq!(storage.offline_citations().unwrap().len(), 1);
    }

    #[test]
    fn test_update_unknown_record_is_not_found() {
        let (storage, _) = service();
        let result = storage.update_sync_status("OFFLINE_404", SyncStatus::Synced);
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_unavailable_storage_fails_gracefully() {
        let (storage, store) = service();
        store.set_available(false);

        assert!(!storage.is_available());
        assert!(matches!(
            storage.save_offline_citation(citation("OFFLINE_3")),
            Err(AppError::StorageUnavailable(_))
        ));
        assert!(storage.pending_citations().is_err());
    }

    #[test]
    fn test_corrupt_root_is_reset() {
        let (storage, store) = service();
        store.set_item("ap_bike_challan_data", "not json").unwrap();
        assert!(storage.offline_citations().unwrap().is_empty());
        storage.save_offline_citation(citation("OFFLINE_4")).unwrap();
        assert_eq!(storage.offline_citations().unwrap().len(), 1);
    }
}
