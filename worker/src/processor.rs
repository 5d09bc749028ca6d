use std::sync::Arc;

use common::{
    DocumentExtractor, InvoiceRecord, ObjectStore, ProcessError, ProcessorTarget, ResultStore,
    WorkItem,
};

/// Qué pasó con un item propio.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// Extraído y persistido; ya se puede marcar como procesado.
    Persisted(InvoiceRecord),
    /// Desapareció de pendientes entre el listado y la lectura
    /// (otra ejecución lo movió). No se extrae ni se persiste nada.
    Vanished,
}

/// Orquesta extracción + persistencia para un item. La extracción en sí
/// la hace el servicio externo.
pub struct ItemProcessor {
    objects: Arc<dyn ObjectStore>,
    extractor: Arc<dyn DocumentExtractor>,
    results: Arc<dyn ResultStore>,
    target: ProcessorTarget,
    attempt: u32,
}

impl ItemProcessor {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        extractor: Arc<dyn DocumentExtractor>,
        results: Arc<dyn ResultStore>,
        target: ProcessorTarget,
        attempt: u32,
    ) -> Self {
        Self {
            objects,
            extractor,
            results,
            target,
            attempt,
        }
    }

    pub async fn process(&self, item: &WorkItem) -> Result<ProcessOutcome, ProcessError> {
        let content = match self.objects.fetch(item.key()).await {
            Ok(content) => content,
            Err(e) if e.is_not_found() => return Ok(ProcessOutcome::Vanished),
            Err(e) => return Err(ProcessError::Fetch(e)),
        };

        let document = self
            .extractor
            .extract(&self.target, item.bare_name(), &content)
            .await?;

        let record = InvoiceRecord::pending_review(item.bare_name(), document.fields, self.attempt);
        self.results
            .upsert(&record)
            .await
            .map_err(ProcessError::Persist)?;

        Ok(ProcessOutcome::Persisted(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{target, StubExtractor};
    use common::{Location, MemoryObjectStore, MemoryResultStore, ReviewState};

    fn item(key: &str) -> WorkItem {
        WorkItem::under(key, "incoming/", Location::Pending).unwrap()
    }

    #[tokio::test]
    async fn process_extrae_y_persiste_con_estado_pendiente() {
        let objects = Arc::new(MemoryObjectStore::with_objects(["incoming/3fa9"]));
        let extractor = Arc::new(StubExtractor::new());
        let results = Arc::new(MemoryResultStore::new());
        let processor =
            ItemProcessor::new(objects, extractor.clone(), results.clone(), target(), 4);

        let outcome = processor.process(&item("incoming/3fa9")).await.unwrap();

        let ProcessOutcome::Persisted(record) = outcome else {
            panic!("debería haberse persistido");
        };
        assert_eq!(record.blob_name, "3fa9");
        assert_eq!(record.state, ReviewState::NotApproved);
        assert_eq!(record.attempt, 4);
        assert_eq!(record.fields["source"], "3fa9");
        assert_eq!(results.upserts(), 1);
        assert_eq!(extractor.calls(), vec!["3fa9"]);
    }

    #[tokio::test]
    async fn process_de_item_desaparecido_no_extrae_ni_persiste() {
        let objects = Arc::new(MemoryObjectStore::new());
        let extractor = Arc::new(StubExtractor::new());
        let results = Arc::new(MemoryResultStore::new());
        let processor =
            ItemProcessor::new(objects, extractor.clone(), results.clone(), target(), 0);

        let outcome = processor.process(&item("incoming/3fa9")).await.unwrap();

        assert_eq!(outcome, ProcessOutcome::Vanished);
        assert!(extractor.calls().is_empty());
        assert_eq!(results.upserts(), 0);
    }

    #[tokio::test]
    async fn process_propaga_fallo_de_extraccion_sin_persistir() {
        let objects = Arc::new(MemoryObjectStore::with_objects(["incoming/bad1"]));
        let extractor = Arc::new(StubExtractor::failing_on(["bad1"]));
        let results = Arc::new(MemoryResultStore::new());
        let processor = ItemProcessor::new(objects, extractor, results.clone(), target(), 0);

        let err = processor.process(&item("incoming/bad1")).await.unwrap_err();

        assert!(matches!(err, ProcessError::Extract(_)));
        assert_eq!(results.upserts(), 0);
    }
}
