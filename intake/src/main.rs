mod handlers;
mod state;

use anyhow::{Context, Result};
use common::{FsObjectStore, JsonResultStore, StorageConfig, INVOICES_COLLECTION};
use std::{env, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::state::AppState;

const DEFAULT_ADDR: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> Result<()> {
    common::logging::init("intake=debug,tower_http=info,axum=info");

    let storage = StorageConfig::from_env().context("configuración de almacenamiento")?;
    let addr = env::var("INTAKE_ADDR")
        .ok()
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());

    let state = AppState::new(
        Arc::new(FsObjectStore::new(storage.bucket_dir())),
        Arc::new(JsonResultStore::new(&storage.results_dir, INVOICES_COLLECTION)),
    );
    let app = handlers::build_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("no se pudo escuchar en {addr}"))?;
    info!(
        "intake escuchando en {} (bucket {})",
        listener.local_addr()?,
        storage.bucket
    );

    axum::serve(listener, app).await?;
    Ok(())
}
