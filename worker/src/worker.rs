use anyhow::{Context, Result};
use common::{
    Assignment, DocumentAiClient, DocumentExtractor, ExtractionConfig, FsObjectStore,
    JsonResultStore, KeySpace, ObjectStore, Ownership, Prefixes, PrefixPartition,
    ProcessorTarget, ResultStore, StorageConfig, StoreError, TaskDescriptor,
    INVOICES_COLLECTION,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::enumerator::WorkEnumerator;
use crate::marker::{CompletionMarker, MarkOutcome};
use crate::processor::{ItemProcessor, ProcessOutcome};

/// Por encima de esto el plan completo no se loguea (un `String` por tarea).
const MAX_LOGGED_PLAN: u32 = 64;

/// Contadores de una ejecución de la tarea.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub examined: u64,
    pub owned: u64,
    pub processed: u64,
    pub failed: u64,
    pub vanished: u64,
    pub already_marked: u64,
    pub mark_failed: u64,
    /// Huérfanos vistos por una tarea que no es la catch-all
    pub orphans_ignored: u64,
}

/// Una tarea del job de facturas: enumerar -> filtrar -> procesar -> marcar.
///
/// No habla con las demás tareas. Cada una calcula su partición a partir
/// de `(index, count)` y recorre el mismo listado quedándose con lo suyo.
pub struct InvoiceWorker {
    task: TaskDescriptor,
    partition: PrefixPartition,
    enumerator: WorkEnumerator,
    processor: ItemProcessor,
    marker: CompletionMarker,
}

impl InvoiceWorker {
    pub fn new(
        task: TaskDescriptor,
        key_space: &KeySpace,
        prefixes: &Prefixes,
        objects: Arc<dyn ObjectStore>,
        extractor: Arc<dyn DocumentExtractor>,
        results: Arc<dyn ResultStore>,
        target: ProcessorTarget,
    ) -> Self {
        Self {
            task,
            partition: key_space.partition_for(&task),
            enumerator: WorkEnumerator::new(objects.clone(), prefixes.incoming.clone()),
            processor: ItemProcessor::new(
                objects.clone(),
                extractor,
                results,
                target,
                task.attempt(),
            ),
            marker: CompletionMarker::new(objects, prefixes.processed.clone()),
        }
    }

    pub fn partition(&self) -> &PrefixPartition {
        &self.partition
    }

    /// Recorre todos los items propios. Solo falla si no se puede listar;
    /// los errores por item se registran y se sigue con el siguiente.
    pub async fn run(&self) -> Result<RunSummary, StoreError> {
        let task = self.task.index();
        let attempt = self.task.attempt();
        let mut summary = RunSummary::default();

        if self.partition.is_empty() {
            info!(task, "partición vacía: esta tarea solo atiende huérfanos si es la 0");
        }

        let items = self.enumerator.enumerate().await?;

        for item in items {
            summary.examined += 1;

            match self.partition.ownership(item.bare_name()) {
                Ownership::Other => continue,
                Ownership::Orphan if !self.partition.is_catch_all() => {
                    summary.orphans_ignored += 1;
                    continue;
                }
                Ownership::Orphan => {
                    warn!(task, attempt, item = %item, "nombre fuera del alfabeto, lo procesa la tarea 0");
                }
                Ownership::Mine => {}
            }
            debug_assert!(self.partition.owns(item.bare_name()));
            summary.owned += 1;

            let record = match self.processor.process(&item).await {
                Ok(ProcessOutcome::Persisted(record)) => record,
                Ok(ProcessOutcome::Vanished) => {
                    info!(task, attempt, item = %item, "el item ya no está en pendientes, se omite");
                    summary.vanished += 1;
                    continue;
                }
                Err(e) => {
                    warn!(task, attempt, item = %item, error = %e, "falló el procesamiento, queda pendiente");
                    summary.failed += 1;
                    continue;
                }
            };
            debug!(task, item = %item, fields = record.fields.len(), "resultado persistido");

            match self.marker.mark(&item).await {
                Ok(MarkOutcome::Moved { to }) => {
                    info!(task, attempt, item = %item, "procesado y movido a {}", to);
                    summary.processed += 1;
                }
                Ok(MarkOutcome::AlreadyMarked { to }) => {
                    warn!(task, attempt, item = %item, "ya estaba marcado en {}", to);
                    summary.already_marked += 1;
                }
                Err(e) => {
                    warn!(task, attempt, item = %item, error = %e, "no se pudo marcar como procesado");
                    summary.mark_failed += 1;
                }
            }
        }

        Ok(summary)
    }
}

/// Punto de entrada del job: lee la configuración del entorno, arma los
/// clientes y procesa lo que le toca a esta tarea.
pub async fn run() -> Result<()> {
    let task = TaskDescriptor::from_env().context("identidad de tarea inválida")?;

    let hostname = hostname::get()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    info!(
        "iniciando intento {} de la tarea {} de {} en {}",
        task.attempt(),
        task.index(),
        task.count(),
        hostname
    );

    let storage = StorageConfig::from_env().context("configuración de almacenamiento")?;
    let extraction = ExtractionConfig::from_env().context("configuración de extracción")?;

    let key_space = KeySpace::hex();
    if task.count() <= MAX_LOGGED_PLAN {
        info!("reparto de prefijos: {:?}", key_space.plan(task.count()));
    }

    let objects: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(storage.bucket_dir()));
    let results: Arc<dyn ResultStore> =
        Arc::new(JsonResultStore::new(&storage.results_dir, INVOICES_COLLECTION));
    let extractor: Arc<dyn DocumentExtractor> = Arc::new(
        DocumentAiClient::from_config(&extraction).context("cliente de extracción")?,
    );

    let worker = InvoiceWorker::new(
        task,
        &key_space,
        &Prefixes::default(),
        objects,
        extractor,
        results,
        extraction.target.clone(),
    );
    info!(
        "mi parte es '{}' para la tarea {}",
        worker.partition().chars(),
        task.index()
    );

    let summary = worker
        .run()
        .await
        .with_context(|| format!("no se pudo listar el bucket {}", storage.bucket))?;

    info!(
        "tarea {} terminada: examinados={} propios={} procesados={} fallidos={} desaparecidos={} ya_marcados={} sin_marcar={} huerfanos_ignorados={}",
        task.index(),
        summary.examined,
        summary.owned,
        summary.processed,
        summary.failed,
        summary.vanished,
        summary.already_marked,
        summary.mark_failed,
        summary.orphans_ignored,
    );

    Ok(())
}
