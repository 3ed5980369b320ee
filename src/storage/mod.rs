//! Almacenamiento local
//!
//! Este módulo contiene el almacén clave-valor durable y el servicio
//! que guarda la cola offline de challans.

pub mod local_store;
pub mod storage_config;
pub mod storage_service;

pub use local_store::{FileStore, KeyValueStore, MemoryStore};
pub use storage_config::{keys, StorageConfig};
pub use storage_service::StorageService;
