//! Modelos del sistema
//!
//! Este módulo contiene todos los modelos de datos: challans, registros
//! offline, lecturas de velocidad y notificaciones.

pub mod citation;
pub mod notification;
pub mod speed;

pub use citation::*;
pub use notification::*;
pub use speed::*;
