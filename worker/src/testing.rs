//! Dobles de prueba para los colaboradores externos.

use async_trait::async_trait;
use std::{
    collections::{BTreeMap, HashSet},
    sync::Mutex,
};

use common::{
    DocumentExtractor, ExtractError, ExtractedDocument, InvoiceRecord, ProcessorTarget,
    ResultStore, ReviewState, StoreError,
};

pub fn target() -> ProcessorTarget {
    ProcessorTarget {
        project_id: "demo".to_string(),
        location: "us".to_string(),
        processor_id: "p1".to_string(),
    }
}

/// Devuelve `{"source": <nombre>}` y anota cada llamada.
/// Falla con 503 para los nombres indicados.
#[derive(Default)]
pub struct StubExtractor {
    calls: Mutex<Vec<String>>,
    failing: HashSet<String>,
}

impl StubExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentExtractor for StubExtractor {
    async fn extract(
        &self,
        _target: &ProcessorTarget,
        name: &str,
        _content: &[u8],
    ) -> Result<ExtractedDocument, ExtractError> {
        self.calls.lock().unwrap().push(name.to_string());

        if self.failing.contains(name) {
            return Err(ExtractError::BadStatus {
                status: 503,
                body: "no disponible".to_string(),
            });
        }

        let mut fields = BTreeMap::new();
        fields.insert("source".to_string(), name.to_string());
        Ok(ExtractedDocument { fields })
    }
}

/// Base de resultados que rechaza todas las escrituras.
pub struct BrokenResultStore;

#[async_trait]
impl ResultStore for BrokenResultStore {
    async fn upsert(&self, record: &InvoiceRecord) -> Result<(), StoreError> {
        Err(StoreError::io(
            &record.blob_name,
            std::io::Error::other("base de datos caída"),
        ))
    }

    async fn get(&self, _blob_name: &str) -> Result<Option<InvoiceRecord>, StoreError> {
        Ok(None)
    }

    async fn list(&self, _state: Option<ReviewState>) -> Result<Vec<InvoiceRecord>, StoreError> {
        Ok(Vec::new())
    }
}
