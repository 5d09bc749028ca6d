//! Almacenamiento de objetos (bucket) que consumen los jobs y el intake.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub mod fs;
pub mod memory;

pub use fs::FsObjectStore;
pub use memory::MemoryObjectStore;

/// Una entrada del listado. Las "carpetas" también aparecen, marcadas
/// como contenedores, y el consumidor decide qué hacer con ellas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub key: String,
    pub is_container: bool,
}

impl ObjectEntry {
    pub fn object(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            is_container: false,
        }
    }

    pub fn container(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            is_container: true,
        }
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Todo lo que hay bajo `prefix` en este momento, sin orden garantizado.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    async fn fetch(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    async fn put(&self, key: &str, content: &[u8]) -> Result<(), StoreError>;

    /// Mueve un objeto de forma atómica. Falla con `NotFound` si el origen
    /// ya no existe (p.ej. otra ejecución lo movió antes).
    async fn rename(&self, from: &str, to: &str) -> Result<(), StoreError>;
}

/// Rechaza claves vacías, absolutas o con segmentos `.`/`..`.
pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key
            .trim_end_matches('/')
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == "..");

    if bad {
        Err(StoreError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}
