//! Cuerpos JSON del servicio de intake (los comparten servidor y cliente).

use serde::{Deserialize, Serialize};

use crate::results::InvoiceRecord;

pub const INVOICES_PATH: &str = "/api/v1/invoices";

/// Ruta donde se puede descargar el documento de una factura procesada.
pub fn document_path(name: &str) -> String {
    format!("{INVOICES_PATH}/{name}/document")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Nombre sin carpeta; es el id del resultado
    pub name: String,
    pub key: String,
}

/// Factura pendiente de revisión, con su documento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingInvoice {
    #[serde(flatten)]
    pub record: InvoiceRecord,
    pub document: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveRequest {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveResponse {
    pub approved: Vec<String>,
    /// Nombres sin resultado guardado
    pub missing: Vec<String>,
}
