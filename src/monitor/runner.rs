//! Runner del monitor de velocidad
//!
//! Una tarea tokio por sesión: un `interval` produce las lecturas, un único
//! `Sleep` rearmable representa el temporizador de expiración del warning y
//! un canal oneshot detiene la sesión. Como el temporizador vive dentro de
//! la tarea, detenerla lo cancela junto con el tick.
//!
//! Los challans automáticos se emiten en tareas aparte para no frenar el
//! tick; sus resultados vuelven por un canal interno y, al detener la
//! sesión, se esperan los que sigan en vuelo.

use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior, Sleep};
use tracing::{debug, info, warn};

use super::signal::SpeedSignal;
use super::state::{CitationCause, CitationRequest, SpeedMonitor, WarningIssued, WarningToken};
use super::stats::SessionSummary;
use crate::config::MonitorConfig;
use crate::models::{SpeedClass, SpeedReading};
use crate::services::citation_service::{CitationService, IssuedCitation};
use crate::utils::errors::{AppError, AppResult};

/// Eventos para la capa de presentación
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    Started,
    Reading { reading: SpeedReading, class: SpeedClass },
    Warning(WarningIssued),
    WarningCleared,
    CitationIssued { cause: CitationCause, issued: IssuedCitation },
    CitationFailed { cause: CitationCause, speed: u32, message: String },
    Stopped(SessionSummary),
}

type CitationResult = (CitationRequest, AppResult<IssuedCitation>);

/// Temporizador de expiración armado
struct PendingExpiry {
    sleep: Pin<Box<Sleep>>,
    token: WarningToken,
}

/// Sesiones de monitoreo sobre un vehículo
pub struct MonitorRunner {
    monitor: SpeedMonitor,
    signal: Box<dyn SpeedSignal>,
    service: Arc<CitationService>,
    vehicle: String,
    location: String,
    events: mpsc::UnboundedSender<MonitorEvent>,
}

/// Sesión en curso
pub struct MonitorHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<MonitorRunner>,
}

impl MonitorHandle {
    /// Detener la sesión y recuperar el runner para reiniciarla
    pub async fn stop(self) -> AppResult<MonitorRunner> {
        // Si la tarea ya terminó el receptor no existe; no es un error
        let _ = self.stop.send(());
        self.task
            .await
            .map_err(|e| AppError::Internal(format!("monitor task failed: {}", e)))
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl MonitorRunner {
    pub fn new(
        config: MonitorConfig,
        signal: Box<dyn SpeedSignal>,
        service: Arc<CitationService>,
        vehicle: impl Into<String>,
        location: impl Into<String>,
    ) -> (Self, mpsc::UnboundedReceiver<MonitorEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let runner = Self {
            monitor: SpeedMonitor::new(config),
            signal,
            service,
            vehicle: vehicle.into(),
            location: location.into(),
            events,
        };
        (runner, rx)
    }

    pub fn monitor(&self) -> &SpeedMonitor {
        &self.monitor
    }

    /// Resumen de la última sesión
    pub fn summary(&self) -> SessionSummary {
        self.monitor.summary()
    }

    /// Iniciar una sesión nueva (Idle → Monitoring)
    pub fn spawn(self) -> MonitorHandle {
        let (stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(stop_rx));
        MonitorHandle { stop, task }
    }

    async fn run(mut self, mut stop: oneshot::Receiver<()>) -> Self {
        self.monitor.start();
        self.signal.reset();
        self.emit(MonitorEvent::Started);
        info!("🚦 Monitoreo iniciado para {}", self.vehicle);

        let tick = self.monitor.config().tick;
        let mut ticker = interval_at(Instant::now() + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let (results_tx, mut results_rx) = mpsc::unbounded_channel::<CitationResult>();
        let mut expiry: Option<PendingExpiry> = None;

        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = ticker.tick() => self.on_tick(&mut expiry, &results_tx),
                token = expiry_elapsed(&mut expiry) => {
                    if self.monitor.expire_warning(token) {
                        debug!("⏱️ Warning expirado");
                        self.emit(MonitorEvent::WarningCleared);
                    }
                }
                Some(result) = results_rx.recv() => self.on_citation_result(result),
            }
        }

        // El temporizador muere aquí; los challans en vuelo se esperan
        drop(expiry);
        self.monitor.stop();
        drop(results_tx);
        while let Some(result) = results_rx.recv().await {
            self.on_citation_result(result);
        }

        let summary = self.monitor.summary();
        info!(
            "🛑 Monitoreo detenido: {} lecturas, máx {} km/h, media {} km/h, {} challans",
            summary.readings, summary.max_speed, summary.avg_speed, summary.citations_issued
        );
        self.emit(MonitorEvent::Stopped(summary));
        self
    }

    fn on_tick(
        &mut self,
        expiry: &mut Option<PendingExpiry>,
        results: &mpsc::UnboundedSender<CitationResult>,
    ) {
        let reading = SpeedReading::new(self.signal.next_speed());
        let Some(outcome) = self.monitor.record(reading) else {
            return;
        };

        self.emit(MonitorEvent::Reading {
            reading: outcome.reading,
            class: outcome.class,
        });

        if let Some(warning) = outcome.warning {
            warn!("🚨 Exceso de velocidad: {} km/h (warning {})", warning.speed, warning.level);
            self.emit(MonitorEvent::Warning(warning));
        }

        if let Some(token) = outcome.expiry {
            let ttl = self.monitor.config().warning_ttl;
            *expiry = Some(PendingExpiry {
                sleep: Box::pin(tokio::time::sleep(ttl)),
                token,
            });
        } else if outcome.warning_cleared {
            *expiry = None;
            self.emit(MonitorEvent::WarningCleared);
        }

        for request in outcome.citations {
            self.issue(request, results.clone());
        }
    }

    fn issue(&self, request: CitationRequest, results: mpsc::UnboundedSender<CitationResult>) {
        let new_citation =
            request.to_new_citation(&self.vehicle, &self.location, self.monitor.config().legal_limit);
        let service = self.service.clone();
        info!(
            "📝 Challan automático ({:?}) a {} km/h, importe {}",
            request.cause, request.speed, request.amount
        );
        tokio::spawn(async move {
            let result = service.create_citation(new_citation).await;
            let _ = results.send((request, result));
        });
    }

    fn on_citation_result(&mut self, (request, result): CitationResult) {
        match result {
            Ok(issued) => {
                self.monitor.citation_issued();
                self.emit(MonitorEvent::CitationIssued {
                    cause: request.cause,
                    issued,
                });
            }
            Err(e) => {
                self.monitor.citation_failed();
                warn!("❌ No se pudo emitir el challan automático: {}", e);
                self.emit(MonitorEvent::CitationFailed {
                    cause: request.cause,
                    speed: request.speed,
                    message: e.user_message(),
                });
            }
        }
    }

    fn emit(&self, event: MonitorEvent) {
        // Sin receptor los eventos se descartan; el monitoreo sigue
        let _ = self.events.send(event);
    }
}

async fn expiry_elapsed(slot: &mut Option<PendingExpiry>) -> WarningToken {
    match slot {
        Some(pending_expiry) => {
            pending_expiry.sleep.as_mut().await;
            let token = pending_expiry.token;
            *slot = None;
            token
        }
        None => pending().await,
    }
}
