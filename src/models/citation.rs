//! Modelo de Challan
//!
//! Este módulo contiene el struct Citation, sus estados y el request de creación
//! usado tanto por el formulario manual como por la detección automática.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::errors::{AppError, AppResult};
use crate::utils::validation::{normalize_vehicle_number, validate_not_empty, validate_vehicle_number};

/// Prefijo de los identificadores asignados localmente (modo offline)
pub const OFFLINE_ID_PREFIX: &str = "OFFLINE_";

/// Estado de pago del challan
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CitationStatus {
    Pending,
    Paid,
}

impl CitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CitationStatus::Pending => "Pending",
            CitationStatus::Paid => "Paid",
        }
    }
}

/// Catálogo de infracciones conocidas
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ViolationType {
    Overspeeding,
    NoHelmet,
    WrongSideDriving,
    JumpingRedLight,
    NoLicense,
    NoInsurance,
}

impl ViolationType {
    pub const ALL: [ViolationType; 6] = [
        ViolationType::Overspeeding,
        ViolationType::NoHelmet,
        ViolationType::WrongSideDriving,
        ViolationType::JumpingRedLight,
        ViolationType::NoLicense,
        ViolationType::NoInsurance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationType::Overspeeding => "Overspeeding",
            ViolationType::NoHelmet => "No Helmet",
            ViolationType::WrongSideDriving => "Wrong Side Driving",
            ViolationType::JumpingRedLight => "Jumping Red Light",
            ViolationType::NoLicense => "No License",
            ViolationType::NoInsurance => "No Insurance",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

/// Challan principal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub id: String,
    pub vehicle: String,
    pub violation: String,
    pub location: String,
    pub amount: u32,
    pub description: String,
    pub date: NaiveDate,
    pub status: CitationStatus,
    #[serde(default)]
    pub offline: bool,
}

impl Citation {
    /// Construir un challan pendiente a partir de un request ya validado
    pub fn from_request(id: String, request: &NewCitation, date: NaiveDate, offline: bool) -> Self {
        Self {
            id,
            vehicle: normalize_vehicle_number(&request.vehicle),
            violation: request.violation.trim().to_string(),
            location: request.location.trim().to_string(),
            amount: request.amount,
            description: request.description.clone(),
            date,
            status: CitationStatus::Pending,
            offline,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.status == CitationStatus::Paid
    }

    /// Transición Pending → Paid. Nunca en sentido inverso.
    pub fn mark_paid(&mut self) -> AppResult<()> {
        match self.status {
            CitationStatus::Pending => {
                self.status = CitationStatus::Paid;
                Ok(())
            }
            CitationStatus::Paid => Err(AppError::InvalidTransition(format!(
                "Challan {} is already paid",
                self.id
            ))),
        }
    }

    pub fn has_local_id(&self) -> bool {
        self.id.starts_with(OFFLINE_ID_PREFIX)
    }
}

/// Request para crear un nuevo challan
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewCitation {
    #[validate(custom = "validate_vehicle_number")]
    pub vehicle: String,

    #[validate(custom = "validate_not_empty")]
    pub violation: String,

    #[validate(custom = "validate_not_empty")]
    pub location: String,

    #[validate(range(min = 1))]
    pub amount: u32,

    #[serde(default)]
    pub description: String,
}

impl NewCitation {
    pub fn new(
        vehicle: impl Into<String>,
        violation: impl Into<String>,
        location: impl Into<String>,
        amount: u32,
        description: impl Into<String>,
    ) -> Self {
        Self {
            vehicle: vehicle.into(),
            violation: violation.into(),
            location: location.into(),
            amount,
            description: description.into(),
        }
    }
}

/// Estado de sincronización de un challan offline
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Synced,
}

/// Challan guardado en el almacenamiento local a la espera de sincronización
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OfflineCitationRecord {
    #[serde(flatten)]
    pub citation: Citation,
    pub queued_at: DateTime<Utc>,
    pub sync_status: SyncStatus,
}

impl OfflineCitationRecord {
    pub fn queued(citation: Citation, queued_at: DateTime<Utc>) -> Self {
        Self {
            citation,
            queued_at,
            sync_status: SyncStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.sync_status == SyncStatus::Pending
    }

    /// Transición pending → synced. Repetirla no tiene efecto.
    pub fn mark_synced(&mut self) -> bool {
        if self.sync_status == SyncStatus::Pending {
            self.sync_status = SyncStatus::Synced;
            true
        } else {
            false
        }
    }
}
