//! Modelos de lecturas de velocidad
//!
//! Lecturas producidas por el monitor, su clasificación y los eventos
//! de exceso de velocidad de una sesión.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::MonitorConfig;

/// Lectura de velocidad (km/h, 0..=120)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SpeedReading {
    pub timestamp: DateTime<Utc>,
    pub speed: u32,
}

impl SpeedReading {
    pub fn new(speed: u32) -> Self {
        Self {
            timestamp: Utc::now(),
            speed,
        }
    }
}

/// Clasificación de una lectura
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SpeedClass {
    Normal,
    Moderate,
    Overspeeding,
}

impl SpeedClass {
    pub fn classify(speed: u32, config: &MonitorConfig) -> Self {
        if speed > config.legal_limit {
            SpeedClass::Overspeeding
        } else if speed > config.moderate_threshold {
            SpeedClass::Moderate
        } else {
            SpeedClass::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpeedClass::Normal => "Normal",
            SpeedClass::Moderate => "Moderate",
            SpeedClass::Overspeeding => "Overspeeding",
        }
    }
}

/// Evento de exceso de velocidad (transitorio, no se persiste)
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OverspeedEvent {
    pub timestamp: DateTime<Utc>,
    pub speed: u32,
    pub event_id: String,
    pub processed: bool,
}

impl OverspeedEvent {
    pub fn from_reading(reading: &SpeedReading) -> Self {
        Self {
            timestamp: reading.timestamp,
            speed: reading.speed,
            event_id: format!("OS-{}", Uuid::new_v4().simple()),
            processed: false,
        }
    }
}
