//! Monitor de velocidad
//!
//! Señal simulada, estadísticas de sesión, máquina de estados de detección
//! y el runner asíncrono que la conduce.

pub mod fines;
pub mod runner;
pub mod signal;
pub mod state;
pub mod stats;

pub use fines::fine_for_speed;
pub use runner::{MonitorEvent, MonitorHandle, MonitorRunner};
pub use signal::{RandomWalkSignal, ScriptedSignal, SpeedSignal};
pub use state::{CitationCause, CitationRequest, MonitorPhase, SpeedMonitor, TickOutcome, WarningIssued, WarningToken};
pub use stats::{SessionStats, SessionSummary};
