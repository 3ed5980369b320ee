//! Máquina de estados de detección de exceso de velocidad
//!
//! No tiene temporizadores propios: el runner le entrega lecturas y le avisa
//! cuando expira un warning. Cada warning armado lleva un `WarningToken`;
//! un token de una generación anterior (tras stop, reinicio o un nuevo
//! warning) se ignora, de modo que un temporizador tardío nunca revive una
//! sesión detenida.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::fines::fine_for_overspeed;
use super::stats::{SessionStats, SessionSummary};
use crate::config::MonitorConfig;
use crate::models::{NewCitation, OverspeedEvent, SpeedClass, SpeedReading, ViolationType};

/// Fase del monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MonitorPhase {
    Idle,
    Monitoring,
}

/// Identifica el temporizador de expiración de un warning concreto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WarningToken(u64);

/// Warning emitido en una lectura
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarningIssued {
    pub level: u8,
    pub speed: u32,
}

/// Motivo del challan automático
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CitationCause {
    /// Se acumularon los warnings consecutivos
    Escalation,
    /// Una sola lectura superó el umbral severo
    Severe,
}

/// Petición de challan automático producida por la máquina de estados
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationRequest {
    pub cause: CitationCause,
    pub speed: u32,
    pub amount: u32,
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
}

impl CitationRequest {
    /// Convertir en request de creación para el servicio de challans
    pub fn to_new_citation(&self, vehicle: &str, location: &str, legal_limit: u32) -> NewCitation {
        NewCitation::new(
            vehicle,
            ViolationType::Overspeeding.as_str(),
            location,
            self.amount,
            format!(
                "Vehicle detected overspeeding at {} km/h. Speed limit is {} km/h.",
                self.speed, legal_limit
            ),
        )
    }
}

/// Resultado de procesar una lectura
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub reading: SpeedReading,
    pub class: SpeedClass,
    pub warning: Option<WarningIssued>,
    /// Temporizador de expiración a armar (reemplaza al anterior)
    pub expiry: Option<WarningToken>,
    /// El warning visible se ocultó en esta lectura
    pub warning_cleared: bool,
    pub citations: Vec<CitationRequest>,
}

/// Máquina de estados del monitor de velocidad
#[derive(Debug, Clone)]
pub struct SpeedMonitor {
    config: MonitorConfig,
    phase: MonitorPhase,
    stats: SessionStats,
    events: Vec<OverspeedEvent>,
    warning_level: u8,
    warning_shown: bool,
    generation: u64,
    citations_issued: u32,
    citations_failed: u32,
}

impl SpeedMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        let stats = SessionStats::new(config.history_window);
        Self {
            config,
            phase: MonitorPhase::Idle,
            stats,
            events: Vec::new(),
            warning_level: 0,
            warning_shown: false,
            generation: 0,
            citations_issued: 0,
            citations_failed: 0,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Idle → Monitoring. Reinicia contadores e historial.
    ///
    /// Devuelve `false` si ya estaba monitoreando.
    pub fn start(&mut self) -> bool {
        if self.phase == MonitorPhase::Monitoring {
            return false;
        }
        self.phase = MonitorPhase::Monitoring;
        self.stats.reset();
        self.events.clear();
        self.warning_level = 0;
        self.warning_shown = false;
        self.citations_issued = 0;
        self.citations_failed = 0;
        self.generation += 1;
        true
    }

    /// Monitoring → Idle. Oculta el warning e invalida temporizadores pendientes.
    pub fn stop(&mut self) -> bool {
        if self.phase == MonitorPhase::Idle {
            return false;
        }
        self.phase = MonitorPhase::Idle;
        self.warning_shown = false;
        self.generation += 1;
        true
    }

    /// Procesar una lectura. `None` si el monitor está parado.
    pub fn record(&mut self, reading: SpeedReading) -> Option<TickOutcome> {
        if self.phase != MonitorPhase::Monitoring {
            return None;
        }

        let speed = reading.speed.min(self.config.max_speed);
        let reading = SpeedReading { speed, ..reading };
        let class = SpeedClass::classify(speed, &self.config);
        self.stats.record(reading, class == SpeedClass::Overspeeding);

        let mut outcome = TickOutcome {
            reading,
            class,
            warning: None,
            expiry: None,
            warning_cleared: false,
            citations: Vec::new(),
        };

        if class != SpeedClass::Overspeeding {
            if self.warning_shown {
                self.warning_shown = false;
                self.generation += 1;
                outcome.warning_cleared = true;
            }
            return Some(outcome);
        }

        self.handle_overspeed(reading, &mut outcome);
        Some(outcome)
    }

    /// Expiró el temporizador de un warning. Oculta el warning solo si el
    /// token es el vigente; el nivel acumulado no cambia.
    pub fn expire_warning(&mut self, token: WarningToken) -> bool {
        if self.phase != MonitorPhase::Monitoring
            || token.0 != self.generation
            || !self.warning_shown
        {
            return false;
        }
        self.warning_shown = false;
        true
    }

    pub fn citation_issued(&mut self) {
        self.citations_issued += 1;
    }

    pub fn citation_failed(&mut self) {
        self.citations_failed += 1;
    }

    pub fn phase(&self) -> MonitorPhase {
        self.phase
    }

    pub fn is_monitoring(&self) -> bool {
        self.phase == MonitorPhase::Monitoring
    }

    pub fn warning_level(&self) -> u8 {
        self.warning_level
    }

    pub fn is_warning_shown(&self) -> bool {
        self.warning_shown
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn history(&self) -> Vec<SpeedReading> {
        self.stats.history().copied().collect()
    }

    pub fn overspeed_events(&self) -> &[OverspeedEvent] {
        &self.events
    }

    pub fn citations_issued(&self) -> u32 {
        self.citations_issued
    }

    pub fn citations_failed(&self) -> u32 {
        self.citations_failed
    }

    pub fn summary(&self) -> SessionSummary {
        self.stats.summary(self.citations_issued)
    }

    // Métodos privados

    fn handle_overspeed(&mut self, reading: SpeedReading, outcome: &mut TickOutcome) {
        let mut event = OverspeedEvent::from_reading(&reading);
        let threshold = self.config.warnings_before_citation;

        if !self.warning_shown {
            self.warning_shown = true;
            self.warning_level = 1;
            outcome.warning = Some(WarningIssued { level: 1, speed: reading.speed });
            outcome.expiry = Some(self.next_token());
        } else if self.warning_level < threshold {
            self.warning_level += 1;
            outcome.warning = Some(WarningIssued {
                level: self.warning_level,
                speed: reading.speed,
            });
            if self.warning_level < threshold {
                outcome.expiry = Some(self.next_token());
            } else {
                outcome.citations.push(self.request(CitationCause::Escalation, &event));
            }
        }

        // Independiente de la escalada: puede coincidir con ella en la misma lectura
        if reading.speed > self.config.severe_threshold && !event.processed {
            event.processed = true;
            outcome.citations.push(self.request(CitationCause::Severe, &event));
        }

        if !outcome.citations.is_empty() {
            self.reset_streak();
            outcome.expiry = None;
            outcome.warning_cleared = true;
        }

        self.events.push(event);
    }

    fn request(&self, cause: CitationCause, event: &OverspeedEvent) -> CitationRequest {
        let overspeed = event.speed.saturating_sub(self.config.legal_limit);
        CitationRequest {
            cause,
            speed: event.speed,
            amount: fine_for_overspeed(overspeed).unwrap_or(0),
            event_id: event.event_id.clone(),
            timestamp: event.timestamp,
        }
    }

    fn reset_streak(&mut self) {
        self.warning_shown = false;
        self.warning_level = 0;
        self.generation += 1;
    }

    fn next_token(&mut self) -> WarningToken {
        self.generation += 1;
        WarningToken(self.generation)
    }
}
