use std::sync::Arc;

use common::{ObjectStore, StoreError, WorkItem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkOutcome {
    Moved { to: String },
    /// El origen ya no estaba pero el destino sí: alguien lo marcó antes.
    AlreadyMarked { to: String },
}

/// Mueve un item de pendientes a procesados. Ese movimiento es la única
/// señal durable de que el item terminó, y lo saca de futuros listados.
/// Solo se llama después de persistir el resultado.
pub struct CompletionMarker {
    store: Arc<dyn ObjectStore>,
    processed_prefix: String,
}

impl CompletionMarker {
    pub fn new(store: Arc<dyn ObjectStore>, processed_prefix: impl Into<String>) -> Self {
        Self {
            store,
            processed_prefix: processed_prefix.into(),
        }
    }

    pub async fn mark(&self, item: &WorkItem) -> Result<MarkOutcome, StoreError> {
        let to = item.key_under(&self.processed_prefix);

        match self.store.rename(item.key(), &to).await {
            Ok(()) => Ok(MarkOutcome::Moved { to }),
            Err(e) if e.is_not_found() => {
                if self.store.exists(&to).await? {
                    Ok(MarkOutcome::AlreadyMarked { to })
                } else {
                    Err(e)
                }
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Location, MemoryObjectStore};

    fn item(key: &str) -> WorkItem {
        WorkItem::under(key, "incoming/", Location::Pending).unwrap()
    }

    #[tokio::test]
    async fn mark_mueve_a_processed() {
        let store = Arc::new(MemoryObjectStore::with_objects(["incoming/a1"]));
        let marker = CompletionMarker::new(store.clone(), "processed/");

        let outcome = marker.mark(&item("incoming/a1")).await.unwrap();

        assert_eq!(
            outcome,
            MarkOutcome::Moved {
                to: "processed/a1".to_string()
            }
        );
        assert_eq!(store.keys(), vec!["processed/a1"]);
    }

    #[tokio::test]
    async fn mark_repetido_es_idempotente() {
        let store = Arc::new(MemoryObjectStore::with_objects(["incoming/a1"]));
        let marker = CompletionMarker::new(store.clone(), "processed/");
        let it = item("incoming/a1");

        marker.mark(&it).await.unwrap();
        let again = marker.mark(&it).await.unwrap();

        assert!(matches!(again, MarkOutcome::AlreadyMarked { .. }));
        // no se duplicó nada
        assert_eq!(store.keys(), vec!["processed/a1"]);
        assert_eq!(store.renames(), 1);
    }

    #[tokio::test]
    async fn mark_sin_origen_ni_destino_es_error() {
        let store = Arc::new(MemoryObjectStore::new());
        let marker = CompletionMarker::new(store, "processed/");

        let err = marker.mark(&item("incoming/zz")).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
