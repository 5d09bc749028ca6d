use async_trait::async_trait;
use std::{
    collections::BTreeMap,
    io,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex, MutexGuard,
    },
};

use super::{validate_key, ObjectEntry, ObjectStore};
use crate::error::StoreError;

/// Bucket en memoria para tests y demos. Las claves que terminan en `/`
/// se comportan como marcadores de carpeta.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    renames: AtomicUsize,
    fail_listing: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_objects<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let store = Self::new();
        if let Ok(mut objects) = store.objects.lock() {
            for key in keys {
                let key = key.into();
                let body = key.as_bytes().to_vec();
                objects.insert(key, body);
            }
        }
        store
    }

    /// Hace que los próximos `list` fallen (simula caída del servicio).
    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn renames(&self) -> usize {
        self.renames.load(Ordering::SeqCst)
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Vec<u8>>>, StoreError> {
        self.objects
            .lock()
            .map_err(|_| StoreError::io("memory", io::Error::other("mutex envenenado")))
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectEntry>, StoreError> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(StoreError::io(
                prefix,
                io::Error::new(io::ErrorKind::ConnectionRefused, "listado no disponible"),
            ));
        }

        let objects = self.lock()?;
        Ok(objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .map(|k| ObjectEntry {
                key: k.clone(),
                is_container: k.ends_with('/'),
            })
            .collect())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.lock()?.contains_key(key))
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.lock()?
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, content: &[u8]) -> Result<(), StoreError> {
        validate_key(key)?;
        self.lock()?.insert(key.to_string(), content.to_vec());
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), StoreError> {
        validate_key(to)?;
        let mut objects = self.lock()?;
        let body = objects
            .remove(from)
            .ok_or_else(|| StoreError::NotFound(from.to_string()))?;
        objects.insert(to.to_string(), body);
        self.renames.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
