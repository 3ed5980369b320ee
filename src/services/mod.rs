//! Services module
//!
//! Este módulo contiene la lógica de negocio y servicios de la aplicación:
//! emisión y sincronización de challans, conectividad y notificaciones.

pub mod citation_service;
pub mod connectivity;
pub mod notification_service;

pub use citation_service::*;
pub use connectivity::{spawn_reconnect_sync, Connectivity, ConnectivityProbe};
pub use notification_service::NotificationHub;
