use std::{sync::Arc, vec};

use common::{LineItem, Location, ObjectEntry, ObjectStore, StoreError, WorkItem};
use tracing::debug;

/// Lista los items pendientes tal como están ahora en el bucket.
/// No guarda nada entre ejecuciones: lo que otra tarea ya movió no aparece.
pub struct WorkEnumerator {
    store: Arc<dyn ObjectStore>,
    prefix: String,
}

impl WorkEnumerator {
    pub fn new(store: Arc<dyn ObjectStore>, pending_prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: pending_prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub async fn enumerate(&self) -> Result<Enumeration, StoreError> {
        let entries = self.store.list(&self.prefix).await?;
        debug!("listado de {}: {} entradas", self.prefix, entries.len());
        Ok(Enumeration {
            entries: entries.into_iter(),
            prefix: self.prefix.clone(),
        })
    }
}

/// Secuencia de un solo uso; se consume al iterar.
pub struct Enumeration {
    entries: vec::IntoIter<ObjectEntry>,
    prefix: String,
}

impl Iterator for Enumeration {
    type Item = WorkItem;

    fn next(&mut self) -> Option<WorkItem> {
        for entry in self.entries.by_ref() {
            if entry.is_container {
                debug!("ignorando carpeta {}", entry.key);
                continue;
            }
            match WorkItem::under(entry.key, &self.prefix, Location::Pending) {
                Some(item) => return Some(item),
                None => continue,
            }
        }
        None
    }
}

/// Descarga un objeto de texto y lo parte en líneas por `\n`.
/// Un salto de línea final produce una última línea vacía.
pub async fn fetch_lines(store: &dyn ObjectStore, key: &str) -> Result<Vec<LineItem>, StoreError> {
    let raw = store.fetch(key).await?;
    let contents = String::from_utf8_lossy(&raw);

    Ok(contents
        .split('\n')
        .enumerate()
        .map(|(index, text)| LineItem {
            index,
            text: text.to_string(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::MemoryObjectStore;

    #[tokio::test]
    async fn enumerate_salta_carpetas_y_devuelve_items() {
        let store = Arc::new(MemoryObjectStore::with_objects([
            "incoming/",
            "incoming/0a",
            "incoming/sub/",
            "incoming/f1",
            "processed/77",
        ]));
        let enumerator = WorkEnumerator::new(store, "incoming/");

        let names: Vec<String> = enumerator
            .enumerate()
            .await
            .unwrap()
            .map(|i| i.bare_name().to_string())
            .collect();

        assert_eq!(names, vec!["0a", "f1"]);
    }

    #[tokio::test]
    async fn enumerate_refleja_el_estado_actual() {
        let store = Arc::new(MemoryObjectStore::with_objects(["incoming/0a", "incoming/1b"]));
        let enumerator = WorkEnumerator::new(store.clone(), "incoming/");

        assert_eq!(enumerator.enumerate().await.unwrap().count(), 2);
        store.rename("incoming/0a", "processed/0a").await.unwrap();
        assert_eq!(enumerator.enumerate().await.unwrap().count(), 1);
    }

    #[tokio::test]
    async fn enumerate_propaga_error_de_listado() {
        let store = Arc::new(MemoryObjectStore::new());
        store.fail_listing(true);
        let enumerator = WorkEnumerator::new(store, "incoming/");
        assert!(enumerator.enumerate().await.is_err());
    }

    #[tokio::test]
    async fn fetch_lines_parte_como_split() {
        let store = MemoryObjectStore::new();
        store.put("data.txt", b"uno\ndos\ntres\n").await.unwrap();

        let lines = fetch_lines(&store, "data.txt").await.unwrap();
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();

        assert_eq!(texts, vec!["uno", "dos", "tres", ""]);
        assert_eq!(lines[2].index, 2);
    }

    #[tokio::test]
    async fn fetch_lines_de_objeto_inexistente_falla() {
        let store = MemoryObjectStore::new();
        let err = fetch_lines(&store, "nada.txt").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
