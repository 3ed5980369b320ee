//! challan_monitor
//!
//! Monitor de velocidad simulado con emisión automática de challans y cola
//! offline con sincronización.

pub mod config;
pub mod models;
pub mod monitor;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use state::AppState;
pub use utils::errors::{AppError, AppResult};
