//! Configuración del proyecto
//!
//! Este módulo contiene la configuración de variables de entorno
//! y los parámetros del monitor de velocidad.

pub mod environment;
pub mod monitor;

pub use environment::*;
pub use monitor::MonitorConfig;
