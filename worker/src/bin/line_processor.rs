use anyhow::{Context, Result};
use clap::Parser;
use common::{FsObjectStore, TaskDescriptor};
use std::{path::PathBuf, time::Duration};
use worker::{default_input_bucket, run_line_job};

/// Procesa en paralelo las líneas de un objeto de texto: cada tarea del
/// job se queda con un tramo contiguo.
#[derive(Parser, Debug)]
#[command(name = "line-processor", version)]
struct Args {
    /// Objeto a procesar dentro del bucket de entrada
    input_object: String,

    /// Bucket de entrada (por defecto input-<GOOGLE_CLOUD_PROJECT>)
    #[arg(long, env = "INPUT_BUCKET")]
    input_bucket: Option<String>,

    #[arg(long, env = "STORAGE_ROOT", default_value = common::job::DEFAULT_STORAGE_ROOT)]
    storage_root: PathBuf,

    /// Pausa simulada por línea
    #[arg(long, default_value_t = 100)]
    line_delay_ms: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    common::logging::init("worker=info,line_processor=info");

    let args = Args::parse();
    let task = TaskDescriptor::from_env().context("identidad de tarea inválida")?;

    let bucket = match args.input_bucket {
        Some(b) => b,
        None => default_input_bucket(|v| std::env::var(v).ok())?,
    };

    let store = FsObjectStore::new(args.storage_root.join(&bucket));
    run_line_job(
        &store,
        &args.input_object,
        &task,
        Duration::from_millis(args.line_delay_ms),
    )
    .await
    .with_context(|| format!("no se pudo leer {}/{}", bucket, args.input_object))?;

    Ok(())
}
