use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use crate::error::StoreError;

pub const INVOICES_COLLECTION: &str = "invoices";

/// Estado de revisión. Se serializa con los mismos textos que usan los
/// documentos ya existentes en la base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewState {
    #[serde(rename = "Not Approved")]
    NotApproved,
    #[serde(rename = "Approved")]
    Approved,
}

/// Resultado de procesar una factura: los campos extraídos más la
/// referencia al objeto de origen (nombre sin prefijo).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub blob_name: String,
    pub state: ReviewState,
    /// tipo de entidad -> texto (p.ej. "invoice_id" -> "INV-001")
    pub fields: BTreeMap<String, String>,
    /// Intento de la tarea que produjo este registro
    pub attempt: u32,
    pub processed_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl InvoiceRecord {
    pub fn pending_review(
        blob_name: impl Into<String>,
        fields: BTreeMap<String, String>,
        attempt: u32,
    ) -> Self {
        Self {
            blob_name: blob_name.into(),
            state: ReviewState::NotApproved,
            fields,
            attempt,
            processed_at: Utc::now(),
            reviewed_at: None,
        }
    }

    pub fn approve(&mut self) {
        self.state = ReviewState::Approved;
        self.reviewed_at = Some(Utc::now());
    }
}

/// Base de documentos donde se guardan los resultados.
/// `upsert` pisa el documento anterior con la misma clave: reintentar es seguro.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn upsert(&self, record: &InvoiceRecord) -> Result<(), StoreError>;

    async fn get(&self, blob_name: &str) -> Result<Option<InvoiceRecord>, StoreError>;

    /// Lista registros, opcionalmente filtrando por estado. Orden por nombre.
    async fn list(&self, state: Option<ReviewState>) -> Result<Vec<InvoiceRecord>, StoreError>;
}

/* =========================
   Backend en disco: un JSON por documento
   ========================= */

/// Colección de documentos JSON en un directorio. Cada escritura va a un
/// fichero temporal en el mismo directorio y luego se renombra encima.
#[derive(Debug, Clone)]
pub struct JsonResultStore {
    dir: PathBuf,
}

impl JsonResultStore {
    pub fn new(results_dir: impl AsRef<Path>, collection: &str) -> Self {
        Self {
            dir: results_dir.as_ref().join(collection),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn document_path(&self, blob_name: &str) -> Result<PathBuf, StoreError> {
        if blob_name.is_empty()
            || blob_name == "."
            || blob_name == ".."
            || blob_name.contains(['/', '\\'])
        {
            return Err(StoreError::InvalidKey(blob_name.to_string()));
        }
        Ok(self.dir.join(format!("{blob_name}.json")))
    }
}

fn write_document(dir: &Path, path: &Path, record: &InvoiceRecord) -> io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, record)?;
    tmp.write_all(b"\n")?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl ResultStore for JsonResultStore {
    async fn upsert(&self, record: &InvoiceRecord) -> Result<(), StoreError> {
        let path = self.document_path(&record.blob_name)?;
        let dir = self.dir.clone();
        let record = record.clone();
        let key = path.to_string_lossy().to_string();

        tokio::task::spawn_blocking(move || write_document(&dir, &path, &record))
            .await
            .map_err(|e| StoreError::io(&key, io::Error::other(e)))?
            .map_err(|e| StoreError::io(&key, e))
    }

    async fn get(&self, blob_name: &str) -> Result<Option<InvoiceRecord>, StoreError> {
        let path = self.document_path(blob_name)?;
        let key = path.to_string_lossy().to_string();

        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(key, e)),
        };

        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|source| StoreError::Corrupt { key, source })
    }

    async fn list(&self, state: Option<ReviewState>) -> Result<Vec<InvoiceRecord>, StoreError> {
        let dir_key = self.dir.to_string_lossy().to_string();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            // colección todavía sin documentos
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(dir_key, e)),
        };

        let mut out = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&dir_key, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let key = path.to_string_lossy().to_string();
            let raw = tokio::fs::read(&path)
                .await
                .map_err(|e| StoreError::io(&key, e))?;
            let record: InvoiceRecord = serde_json::from_slice(&raw)
                .map_err(|source| StoreError::Corrupt { key, source })?;

            if state.map_or(true, |s| record.state == s) {
                out.push(record);
            }
        }

        out.sort_by(|a, b| a.blob_name.cmp(&b.blob_name));
        Ok(out)
    }
}

/* =========================
   Backend en memoria
   ========================= */

/// Para tests y demos. Cuenta cuántos upserts recibió.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    docs: Mutex<BTreeMap<String, InvoiceRecord>>,
    upserts: AtomicUsize,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.docs.lock().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned(key: &str) -> StoreError {
    StoreError::io(key, io::Error::other("mutex envenenado"))
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn upsert(&self, record: &InvoiceRecord) -> Result<(), StoreError> {
        let mut docs = self.docs.lock().map_err(|_| poisoned(&record.blob_name))?;
        docs.insert(record.blob_name.clone(), record.clone());
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, blob_name: &str) -> Result<Option<InvoiceRecord>, StoreError> {
        let docs = self.docs.lock().map_err(|_| poisoned(blob_name))?;
        Ok(docs.get(blob_name).cloned())
    }

    async fn list(&self, state: Option<ReviewState>) -> Result<Vec<InvoiceRecord>, StoreError> {
        let docs = self.docs.lock().map_err(|_| poisoned(INVOICES_COLLECTION))?;
        Ok(docs
            .values()
            .filter(|r| state.map_or(true, |s| r.state == s))
            .cloned()
            .collect())
    }
}
