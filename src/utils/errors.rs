//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del sistema
//! y su conversión a mensajes visibles para el operador.

use thiserror::Error;

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Indica si el operador puede reintentar la operación
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Network(_) | AppError::StorageUnavailable(_))
    }

    /// Código corto estable para logs y notificaciones
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Network(_) => "NETWORK_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidTransition(_) => "INVALID_TRANSITION",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Mensaje para la capa de presentación.
    ///
    /// Ningún error de este core es fatal: todo termina como un mensaje
    /// para el operador.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(e) => {
                let mut fields: Vec<&str> = e.field_errors().keys().copied().collect();
                fields.sort_unstable();
                format!("Please check the following fields: {}", fields.join(", "))
            }
            AppError::StorageUnavailable(_) => {
                "Local storage is unavailable. Data is kept in memory only until the next sync.".to_string()
            }
            AppError::Serialization(_) => "Stored data could not be read".to_string(),
            AppError::Network(_) => "Could not reach the challan server. Please try again.".to_string(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::InvalidTransition(msg) => msg.clone(),
            AppError::Internal(_) => "An unexpected error occurred".to_string(),
        }
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de validación
pub fn validation_error(field: &'static str, message: &'static str) -> AppError {
    use validator::ValidationError;

    let mut error = ValidationError::new("custom");
    error.add_param("field".into(), &field);
    error.add_param("message".into(), &message);

    let mut errors = validator::ValidationErrors::new();
    errors.add(field, error);

    AppError::Validation(errors)
}

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: &str) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Función helper para crear errores de almacenamiento
pub fn storage_error(operation: &str, reason: impl std::fmt::Display) -> AppError {
    AppError::StorageUnavailable(format!("{}: {}", operation, reason))
}

/// Función helper para crear errores internos
pub fn internal_error(message: &str) -> AppError {
    AppError::Internal(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(AppError::Network("timeout".into()).is_retryable());
        assert!(storage_error("write", "quota exceeded").is_retryable());
        assert!(!not_found_error("Challan", "AP1").is_retryable());
        assert!(!internal_error("boom").is_retryable());
    }

    #[test]
    fn test_validation_user_message_lists_fields() {
        let err = validation_error("vehicle", "required");
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(err.user_message().contains("vehicle"));
    }

    #[test]
    fn test_not_found_message() {
        let err = not_found_error("Challan", "AP20251030001");
        assert_eq!(err.user_message(), "Challan with id 'AP20251030001' not found");
    }
}
