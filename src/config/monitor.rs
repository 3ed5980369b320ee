//! Configuración del monitor de velocidad
//!
//! Umbrales de clasificación y tiempos de la máquina de estados de detección.

use std::time::Duration;

/// Constantes de detección de exceso de velocidad (km/h)
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Hasta este valor la velocidad es "Normal"
    pub moderate_threshold: u32,
    /// Límite legal; por encima hay exceso de velocidad
    pub legal_limit: u32,
    /// Por encima de este valor se emite un challan inmediato
    pub severe_threshold: u32,
    pub max_speed: u32,
    /// Lecturas conservadas en la ventana de historial
    pub history_window: usize,
    /// Warnings consecutivos antes del challan automático
    pub warnings_before_citation: u8,
    pub warning_ttl: Duration,
    pub tick: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            moderate_threshold: 60,
            legal_limit: 80,
            severe_threshold: 100,
            max_speed: 120,
            history_window: 20,
            warnings_before_citation: 3,
            warning_ttl: Duration::from_secs(5),
            tick: Duration::from_millis(500),
        }
    }
}
