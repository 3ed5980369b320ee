//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de configuración.
//! Todas las variables tienen un valor por defecto; un valor mal formado se
//! ignora con un warning en lugar de abortar el arranque.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::monitor::MonitorConfig;
use crate::storage::StorageConfig;

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub log_level: String,
    pub storage: StorageConfig,
    pub monitor: MonitorConfig,
    /// Latencia simulada de la API remota al emitir un challan
    pub network_latency: Duration,
    /// Latencia simulada de la API remota al sincronizar
    pub sync_latency: Duration,
    /// Duración de la sesión de monitoreo (None = hasta Ctrl-C)
    pub monitor_duration: Option<Duration>,
    pub start_offline: bool,
    pub monitor_seed: Option<u64>,
    pub default_vehicle: String,
    pub default_location: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "info".to_string(),
            storage: StorageConfig::default(),
            monitor: MonitorConfig::default(),
            network_latency: Duration::from_millis(500),
            sync_latency: Duration::from_millis(1000),
            monitor_duration: None,
            start_offline: false,
            monitor_seed: None,
            default_vehicle: "AP23AB1234".to_string(),
            default_location: "Highway Sector 5".to_string(),
        }
    }
}

impl EnvironmentConfig {
    /// Construir la configuración a partir de las variables de entorno
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut storage = defaults.storage.clone();
        if let Ok(root_key) = env::var("STORAGE_ROOT_KEY") {
            storage.root_key = root_key;
        }
        storage.path = env::var("STORAGE_PATH").ok().map(PathBuf::from);

        let mut monitor = defaults.monitor.clone();
        // tokio::time::interval no admite periodo cero
        monitor.tick = Duration::from_millis(parse_var::<u64>("TICK_MILLIS", 500).max(1));
        monitor.warning_ttl = Duration::from_secs(parse_var("WARNING_TTL_SECS", 5));

        let duration_secs: u64 = parse_var("MONITOR_DURATION_SECS", 0);

        Self {
            environment: env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            storage,
            monitor,
            network_latency: Duration::from_millis(parse_var("NETWORK_LATENCY_MILLIS", 500)),
            sync_latency: Duration::from_millis(parse_var("SYNC_LATENCY_MILLIS", 1000)),
            monitor_duration: (duration_secs > 0).then(|| Duration::from_secs(duration_secs)),
            start_offline: parse_var("START_OFFLINE", false),
            monitor_seed: env::var("MONITOR_SEED").ok().and_then(|s| s.parse().ok()),
            default_vehicle: env::var("DEFAULT_VEHICLE").unwrap_or(defaults.default_vehicle),
            default_location: env::var("DEFAULT_LOCATION").unwrap_or(defaults.default_location),
        }
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("⚠️ Valor inválido para {}: '{}', usando valor por defecto", name, raw);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_falls_back_on_garbage() {
        env::set_var("CHALLAN_TEST_BAD_NUMBER", "not-a-number");
        assert_eq!(parse_var("CHALLAN_TEST_BAD_NUMBER", 42u64), 42);
        env::remove_var("CHALLAN_TEST_BAD_NUMBER");
    }

    #[test]
    fn test_parse_var_reads_value() {
        env::set_var("CHALLAN_TEST_GOOD_NUMBER", " 250 ");
        assert_eq!(parse_var("CHALLAN_TEST_GOOD_NUMBER", 0u64), 250);
        env::remove_var("CHALLAN_TEST_GOOD_NUMBER");
    }

    #[test]
    fn test_defaults() {
        let config = EnvironmentConfig::default();
        assert!(config.is_development());
        assert!(!config.is_production());
        assert_eq!(config.monitor.legal_limit, 80);
        assert_eq!(config.storage.root_key, "ap_bike_challan_data");
    }
}
