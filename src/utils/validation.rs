//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validación de los datos
//! de formularios de challans.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    /// Matrícula india: estado (2 letras), distrito (1-2 dígitos), serie opcional, número
    static ref VEHICLE_NUMBER: Regex =
        Regex::new(r"^[A-Z]{2}[0-9]{1,2}[A-Z]{0,3}[0-9]{1,4}$").expect("vehicle number regex");
}

/// Normalizar una matrícula: mayúsculas y sin separadores
pub fn normalize_vehicle_number(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_uppercase)
        .collect()
}

/// Validar formato de matrícula de vehículo
pub fn validate_vehicle_number(value: &str) -> Result<(), ValidationError> {
    let clean = normalize_vehicle_number(value);
    if !VEHICLE_NUMBER.is_match(&clean) {
        let mut error = ValidationError::new("vehicle_number");
        error.add_param("value".into(), &value.to_string());
        error.add_param("format".into(), &"AP23AB1234".to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar que un string no esté vacío
pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_empty");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}
