use common::{Assignment, ConfigError, ObjectStore, RangePartition, StoreError, TaskDescriptor};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::enumerator::fetch_lines;

/// Resultado de una tarea del job de líneas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineSummary {
    pub range: RangePartition,
    pub total_lines: usize,
    pub processed: usize,
    /// Tiempo total de la tarea
    pub elapsed: Duration,
    /// Hasta tener las líneas en memoria (descarga + split)
    pub setup: Duration,
}

/// Bucket de entrada por defecto: `input-<GOOGLE_CLOUD_PROJECT>`.
pub fn default_input_bucket<F>(lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup("GOOGLE_CLOUD_PROJECT")
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .map(|p| format!("input-{p}"))
        .ok_or(ConfigError::Missing("GOOGLE_CLOUD_PROJECT"))
}

/// Transformación de relleno por línea.
pub fn line_digest(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Procesa el tramo contiguo de líneas que le toca a `task`.
/// `delay` simula el costo de cada línea.
pub async fn run_line_job(
    store: &dyn ObjectStore,
    object: &str,
    task: &TaskDescriptor,
    delay: Duration,
) -> Result<LineSummary, StoreError> {
    let started = Instant::now();

    info!(
        "Task {}: Processing part {} of {} for {}",
        task.index(),
        task.index(),
        task.count(),
        object
    );

    let lines = fetch_lines(store, object).await?;
    let range = RangePartition::for_task(lines.len(), task);
    let setup = started.elapsed();

    let mut processed = 0;
    for line in lines.iter().filter(|l| range.owns(&l.index)) {
        let digest = line_digest(&line.text);
        debug!(line = line.index, %digest, "línea procesada");
        processed += 1;

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    let summary = LineSummary {
        range,
        total_lines: lines.len(),
        processed,
        elapsed: started.elapsed(),
        setup,
    };

    info!(
        "Task {}: {} de {} líneas, rango {}, {:.3}s (setup {:.3}s)",
        task.index(),
        summary.processed,
        summary.total_lines,
        summary.range,
        summary.elapsed.as_secs_f64(),
        summary.setup.as_secs_f64(),
    );

    Ok(summary)
}
