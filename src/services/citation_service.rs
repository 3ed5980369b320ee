//! Servicio de challans
//!
//! Emisión de challans con o sin conexión, cola offline durable y
//! sincronización con el sistema remoto al recuperar la conexión.
//! Ningún challan se descarta en silencio: si el almacenamiento local no
//! está disponible se conserva en memoria hasta la siguiente sincronización.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;
use validator::Validate;

use super::connectivity::ConnectivityProbe;
use super::notification_service::NotificationHub;
use crate::models::{
    Citation, CitationStatus, NewCitation, NotificationKind, OfflineCitationRecord, SyncStatus,
    OFFLINE_ID_PREFIX,
};
use crate::storage::StorageService;
use crate::utils::errors::{not_found_error, AppError, AppResult};
use crate::utils::validation::normalize_vehicle_number;

/// Sistema remoto de challans (caja negra)
#[async_trait]
pub trait CitationApi: Send + Sync {
    /// Registrar un challan nuevo; el servidor asigna el identificador
    async fn submit(&self, request: &NewCitation) -> AppResult<Citation>;

    /// Confirmar en una sola petición un lote de challans creados offline
    async fn acknowledge_batch(&self, records: &[OfflineCitationRecord]) -> AppResult<()>;
}

/// API remota simulada con latencia configurable
pub struct MockCitationApi {
    latency: Duration,
    sync_latency: Duration,
    failing: AtomicBool,
    sequence: AtomicU32,
}

impl MockCitationApi {
    pub fn new(latency: Duration, sync_latency: Duration) -> Self {
        Self {
            latency,
            sync_latency,
            failing: AtomicBool::new(false),
            sequence: AtomicU32::new(0),
        }
    }

    /// API sin latencia
    pub fn instant() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Simular rechazos de red
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    async fn round_trip(&self, latency: Duration) -> AppResult<()> {
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Network("simulated server rejection".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CitationApi for MockCitationApi {
    async fn submit(&self, request: &NewCitation) -> AppResult<Citation> {
        self.round_trip(self.latency).await?;
        let today = Utc::now().date_naive();
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("AP{}{:03}", today.format("%Y%m%d"), seq);
        Ok(Citation::from_request(id, request, today, false))
    }

    async fn acknowledge_batch(&self, _records: &[OfflineCitationRecord]) -> AppResult<()> {
        self.round_trip(self.sync_latency).await
    }
}

/// Dónde quedó guardado un challan recién emitido
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Delivery {
    /// Aceptado por el sistema remoto
    Remote,
    /// En la cola offline durable
    Queued,
    /// Almacenamiento no disponible: solo en memoria
    MemoryOnly,
}

/// Resultado de `create_citation`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssuedCitation {
    pub citation: Citation,
    pub delivery: Delivery,
}

/// Resultado de una sincronización
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub synced: usize,
    pub failed: usize,
    pub synced_ids: Vec<String>,
    /// No se pudo leer la cola durable; solo se sincronizó la de memoria
    pub storage_degraded: bool,
}

/// Estadísticas para el dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_challans: usize,
    pub paid_challans: usize,
    pub pending_payments: usize,
    pub todays_challans: usize,
    pub total_amount_collected: u64,
    pub pending_amount: u64,
}

/// Servicio de challans
pub struct CitationService {
    api: Arc<dyn CitationApi>,
    connectivity: Arc<dyn ConnectivityProbe>,
    storage: StorageService,
    notifications: NotificationHub,
    ledger: RwLock<Vec<Citation>>,
    memory_queue: RwLock<Vec<OfflineCitationRecord>>,
    sync_lock: Mutex<()>,
}

impl CitationService {
    pub fn new(
        api: Arc<dyn CitationApi>,
        connectivity: Arc<dyn ConnectivityProbe>,
        storage: StorageService,
        notifications: NotificationHub,
    ) -> Self {
        Self {
            api,
            connectivity,
            storage,
            notifications,
            ledger: RwLock::new(Vec::new()),
            memory_queue: RwLock::new(Vec::new()),
            sync_lock: Mutex::new(()),
        }
    }

    pub fn notifications(&self) -> &NotificationHub {
        &self.notifications
    }

    /// Emitir un challan.
    ///
    /// Online: lo registra el sistema remoto. Offline: identificador local y
    /// cola durable con syncStatus=pending.
    pub async fn create_citation(&self, request: NewCitation) -> AppResult<IssuedCitation> {
        request.validate()?;

        if !self.connectivity.is_online() {
            return Ok(self.queue_offline(&request).await);
        }

        match self.api.submit(&request).await {
            Ok(citation) => {
                log::info!("✅ Challan {} emitido para {}", citation.id, citation.vehicle);
                self.ledger.write().await.push(citation.clone());
                self.notifications
                    .publish(
                        NotificationKind::Info,
                        "New Challan Generated",
                        format!("Challan {} created for vehicle {}", citation.id, citation.vehicle),
                    )
                    .await;
                Ok(IssuedCitation {
                    citation,
                    delivery: Delivery::Remote,
                })
            }
            Err(e) => {
                log::error!("❌ Error emitiendo challan para {}: {}", request.vehicle, e);
                self.notifications
                    .publish(NotificationKind::Error, "Challan Not Generated", e.user_message())
                    .await;
                Err(e)
            }
        }
    }

    /// Registros pendientes en la cola durable
    pub async fn get_queued_citations(&self) -> AppResult<Vec<OfflineCitationRecord>> {
        self.storage.pending_citations()
    }

    /// Registros que solo existen en memoria por fallo del almacenamiento
    pub async fn memory_only_citations(&self) -> Vec<OfflineCitationRecord> {
        self.memory_queue.read().await.clone()
    }

    /// Sincronizar la cola offline con el sistema remoto.
    ///
    /// Todos los pendientes (durables y en memoria) se confirman en un solo
    /// lote; si el lote falla, todos siguen pendientes.
    ///
    /// Emite una única notificación agregada cuando se sincronizó al menos
    /// un registro; con la cola vacía no notifica nada.
    pub async fn sync_queued_citations(&self) -> AppResult<SyncReport> {
        let _guard = self.sync_lock.lock().await;
        let mut report = SyncReport::default();

        let memory: Vec<OfflineCitationRecord> = self.memory_queue.read().await.clone();
        let durable = match self.storage.pending_citations() {
            Ok(records) => records,
            Err(e) if memory.is_empty() => {
                log::warn!("⚠️ No se pudo leer la cola offline: {}", e);
                return Err(e);
            }
            Err(e) => {
                log::warn!("⚠️ Cola durable ilegible, se sincroniza solo memoria: {}", e);
                report.storage_degraded = true;
                Vec::new()
            }
        };

        if durable.is_empty() && memory.is_empty() {
            log::debug!("🔄 Cola offline vacía, nada que sincronizar");
            return Ok(report);
        }

        // Un único round trip para todo el lote
        let batch: Vec<OfflineCitationRecord> = durable.iter().chain(memory.iter()).cloned().collect();
        if let Err(e) = self.api.acknowledge_batch(&batch).await {
            log::warn!("⚠️ El servidor no confirmó el lote de {} challans: {}", batch.len(), e);
            report.failed = batch.len();
            return Ok(report);
        }

        for record in &durable {
            let id = &record.citation.id;
            match self.storage.update_sync_status(id, SyncStatus::Synced) {
                Ok(true) => {
                    report.synced += 1;
                    report.synced_ids.push(id.clone());
                }
                Ok(false) => {}
                Err(e) => {
                    log::warn!("⚠️ No se pudo marcar {} como sincronizado: {}", id, e);
                    report.failed += 1;
                }
            }
        }

        if !memory.is_empty() {
            let mut queue = self.memory_queue.write().await;
            for record in &memory {
                let id = &record.citation.id;
                queue.retain(|r| &r.citation.id != id);
                report.synced += 1;
                report.synced_ids.push(id.clone());
            }
        }

        if report.synced > 0 {
            log::info!("🔄 {} challans offline sincronizados", report.synced);
            self.notifications
                .publish(
                    NotificationKind::Success,
                    "Offline Data Synced",
                    format!("{} offline challans synced with server", report.synced),
                )
                .await;
        }

        Ok(report)
    }

    /// Eliminar de la cola durable los registros ya sincronizados
    pub async fn prune_synced(&self) -> AppResult<usize> {
        let removed = self.storage.remove_synced()?;
        if removed > 0 {
            log::info!("🧹 {} registros sincronizados eliminados de la cola", removed);
        }
        Ok(removed)
    }

    /// Todos los challans conocidos, más recientes primero
    pub async fn list_citations(&self) -> Vec<Citation> {
        self.ledger.read().await.iter().rev().cloned().collect()
    }

    pub async fn get_citation(&self, id: &str) -> AppResult<Citation> {
        self.ledger
            .read()
            .await
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| not_found_error("Challan", id))
    }

    pub async fn citations_for_vehicle(&self, vehicle: &str) -> Vec<Citation> {
        let vehicle = normalize_vehicle_number(vehicle);
        self.ledger
            .read()
            .await
            .iter()
            .rev()
            .filter(|c| c.vehicle == vehicle)
            .cloned()
            .collect()
    }

    /// Registrar el pago de un challan (Pending → Paid)
    pub async fn pay_citation(&self, id: &str) -> AppResult<Citation> {
        let paid = {
            let mut ledger = self.ledger.write().await;
            let citation = ledger
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| not_found_error("Challan", id))?;
            citation.mark_paid()?;
            citation.clone()
        };
        log::info!("💰 Challan {} pagado ({})", paid.id, paid.amount);
        self.notifications
            .publish(
                NotificationKind::Success,
                "Challan Status Updated",
                format!("Challan {} status changed to {}", paid.id, CitationStatus::Paid.as_str()),
            )
            .await;
        Ok(paid)
    }

    pub async fn dashboard_stats(&self) -> DashboardStats {
        self.dashboard_stats_on(Utc::now().date_naive()).await
    }

    pub async fn dashboard_stats_on(&self, today: NaiveDate) -> DashboardStats {
        let ledger = self.ledger.read().await;
        let mut stats = DashboardStats {
            total_challans: ledger.len(),
            ..DashboardStats::default()
        };
        for citation in ledger.iter() {
            if citation.date == today {
                stats.todays_challans += 1;
            }
            match citation.status {
                CitationStatus::Paid => {
                    stats.paid_challans += 1;
                    stats.total_amount_collected += citation.amount as u64;
                }
                CitationStatus::Pending => {
                    stats.pending_payments += 1;
                    stats.pending_amount += citation.amount as u64;
                }
            }
        }
        stats
    }

    // Métodos privados

    async fn queue_offline(&self, request: &NewCitation) -> IssuedCitation {
        let now = Utc::now();
        let id = format!(
            "{}{}-{}",
            OFFLINE_ID_PREFIX,
            now.timestamp_millis(),
            &Uuid::new_v4().simple().to_string()[..8]
        );
        let citation = Citation::from_request(id, request, now.date_naive(), true);
        self.ledger.write().await.push(citation.clone());

        match self.storage.save_offline_citation_at(citation.clone(), now) {
            Ok(_) => {
                log::info!("💾 Challan {} guardado offline", citation.id);
                self.notifications
                    .publish(
                        NotificationKind::Warning,
                        "Challan Saved Offline",
                        format!("Challan for vehicle {} saved locally", citation.vehicle),
                    )
                    .await;
                IssuedCitation {
                    citation,
                    delivery: Delivery::Queued,
                }
            }
            Err(e) => {
                log::warn!("⚠️ Almacenamiento no disponible, {} queda en memoria: {}", citation.id, e);
                self.memory_queue
                    .write()
                    .await
                    .push(OfflineCitationRecord::queued(citation.clone(), now));
                self.notifications
                    .publish(
                        NotificationKind::Warning,
                        "Challan Kept In Memory",
                        format!(
                            "Challan for vehicle {} could not be saved locally and will be lost if the app closes before sync",
                            citation.vehicle
                        ),
                    )
                    .await;
                IssuedCitation {
                    citation,
                    delivery: Delivery::MemoryOnly,
                }
            }
        }
    }
}
