//! Almacén clave-valor durable
//!
//! Equivalente al almacenamiento persistente del navegador: strings bajo
//! claves. `MemoryStore` permite simular la denegación de cuota;
//! `FileStore` persiste en un archivo JSON.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::debug;

use crate::utils::errors::{internal_error, storage_error, AppResult};

/// Operaciones del almacén clave-valor
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> AppResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> AppResult<()>;
    fn remove_item(&self, key: &str) -> AppResult<()>;

    /// Escribir y borrar una clave de prueba
    fn probe(&self) -> AppResult<()> {
        const TEST_KEY: &str = "__storage_test__";
        self.set_item(TEST_KEY, TEST_KEY)?;
        self.remove_item(TEST_KEY)
    }
}

/// Almacén en memoria
#[derive(Debug)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simular almacenamiento inaccesible (modo privado, cuota agotada)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self, operation: &str) -> AppResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(storage_error(operation, "quota exceeded"))
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> AppResult<Option<String>> {
        self.check_available("read")?;
        let items = self.items.lock().map_err(|_| internal_error("memory store poisoned"))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> AppResult<()> {
        self.check_available("write")?;
        let mut items = self.items.lock().map_err(|_| internal_error("memory store poisoned"))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> AppResult<()> {
        self.check_available("remove")?;
        let mut items = self.items.lock().map_err(|_| internal_error("memory store poisoned"))?;
        items.remove(key);
        Ok(())
    }
}

/// Almacén respaldado por un archivo JSON `{clave: valor}`
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> AppResult<HashMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(HashMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(storage_error("read", e)),
        }
    }

    /// Escritura atómica: archivo temporal + rename
    fn write_all(&self, items: &HashMap<String, String>) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| storage_error("create dir", e))?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        let serialized = serde_json::to_string(items)?;
        fs::write(&tmp, serialized).map_err(|e| storage_error("write", e))?;
        fs::rename(&tmp, &self.path).map_err(|e| storage_error("rename", e))?;
        debug!("💾 Almacén escrito en {}", self.path.display());
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> AppResult<Option<String>> {
        let _guard = self.lock.lock().map_err(|_| internal_error("file store poisoned"))?;
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> AppResult<()> {
        let _guard = self.lock.lock().map_err(|_| internal_error("file store poisoned"))?;
        let mut items = self.read_all()?;
        items.insert(key.to_string(), value.to_string());
        self.write_all(&items)
    }

    fn remove_item(&self, key: &str) -> AppResult<()> {
        let _guard = self.lock.lock().map_err(|_| internal_error("file store poisoned"))?;
        let mut items = self.read_all()?;
        if items.remove(key).is_some() {
            self.write_all(&items)?;
        }
        Ok(())
    }
}
