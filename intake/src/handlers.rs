use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use common::{
    api::{document_path, INVOICES_PATH},
    ApproveRequest, ApproveResponse, ObjectStore, PendingInvoice, ResultStore, ReviewState,
    StoreError, UploadResponse,
};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::state::AppState;

/// Las facturas escaneadas superan con facilidad el límite por defecto de axum.
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(INVOICES_PATH, post(upload_invoice).get(list_pending))
        .route("/api/v1/invoices/approve", post(approve_invoices))
        .route("/api/v1/invoices/:name/document", get(get_document))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/* ---------------- handlers HTTP ---------------- */

async fn health() -> &'static str {
    "ok"
}

// Guarda el cuerpo tal cual en incoming/<uuid>; el job lo levanta en su próxima ejecución
async fn upload_invoice(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), StatusCode> {
    if body.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    // uuid en minúsculas: el primer carácter siempre cae en el alfabeto hex
    let name = uuid::Uuid::new_v4().to_string();
    let key = format!("{}{}", state.prefixes.incoming, name);

    state
        .objects
        .put(&key, &body)
        .await
        .map_err(|e| store_status("subir factura", &e))?;

    info!("factura recibida: {} ({} bytes)", key, body.len());
    Ok((StatusCode::CREATED, Json(UploadResponse { name, key })))
}

// Facturas procesadas que esperan revisión
async fn list_pending(
    State(state): State<AppState>,
) -> Result<Json<Vec<PendingInvoice>>, StatusCode> {
    let records = state
        .results
        .list(Some(ReviewState::NotApproved))
        .await
        .map_err(|e| store_status("listar pendientes", &e))?;

    let pending = records
        .into_iter()
        .map(|record| PendingInvoice {
            document: document_path(&record.blob_name),
            record,
        })
        .collect();

    Ok(Json(pending))
}

async fn get_document(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    if !is_valid_name(&name) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let key = format!("{}{}", state.prefixes.processed, name);
    let bytes = state
        .objects
        .fetch(&key)
        .await
        .map_err(|e| store_status("leer documento", &e))?;

    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes))
}

// Marca como aprobadas y mueve processed/ -> approved/.
// Un nombre desconocido no corta el resto del lote.
async fn approve_invoices(
    State(state): State<AppState>,
    Json(req): Json<ApproveRequest>,
) -> Result<Json<ApproveResponse>, StatusCode> {
    let mut resp = ApproveResponse::default();

    for name in req.names {
        if !is_valid_name(&name) {
            resp.missing.push(name);
            continue;
        }

        let Some(mut record) = state
            .results
            .get(&name)
            .await
            .map_err(|e| store_status("leer resultado", &e))?
        else {
            warn!("aprobación de {} sin resultado guardado", name);
            resp.missing.push(name);
            continue;
        };

        record.approve();
        state
            .results
            .upsert(&record)
            .await
            .map_err(|e| store_status("aprobar", &e))?;

        let from = format!("{}{}", state.prefixes.processed, name);
        let to = format!("{}{}", state.prefixes.approved, name);
        match state.objects.rename(&from, &to).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                // ya movido por una aprobación anterior, o documento borrado
                warn!("{} no está en {}", name, state.prefixes.processed);
            }
            Err(e) => return Err(store_status("mover a aprobados", &e)),
        }

        info!("factura {} aprobada", name);
        resp.approved.push(name);
    }

    Ok(Json(resp))
}

/* ---------------- helpers ---------------- */

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

fn store_status(op: &str, err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::InvalidKey(_) => StatusCode::BAD_REQUEST,
        _ => {
            warn!("error al {}: {}", op, err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
