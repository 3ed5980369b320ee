//! Configuración del almacenamiento local
//!
//! Este módulo contiene la configuración para el almacenamiento durable.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuración del almacenamiento
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Clave raíz bajo la que vive el objeto JSON con todos los datos
    pub root_key: String,
    /// Archivo de respaldo; sin archivo el almacenamiento vive en memoria
    pub path: Option<PathBuf>,
    /// Máximo de notificaciones conservadas
    pub notification_history: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_key: "ap_bike_challan_data".to_string(),
            path: None,
            notification_history: 50,
        }
    }
}

/// Claves lógicas dentro del objeto raíz
pub mod keys {
    pub const OFFLINE_CHALLANS: &str = "offlineChallans";
    pub const NOTIFICATIONS: &str = "notifications";
}
