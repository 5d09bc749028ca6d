use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::extract::ProcessorTarget;

pub const DEFAULT_STORAGE_ROOT: &str = "/data/buckets";
pub const DEFAULT_RESULTS_DIR: &str = "/data/results";
pub const DEFAULT_LOCATION: &str = "us";
pub const DEFAULT_MIME_TYPE: &str = "application/pdf";
const DEFAULT_EXTRACT_TIMEOUT_SECS: u64 = 120;

/// Carpetas (prefijos) por las que pasa una factura dentro del bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prefixes {
    /// Subidas pendientes de procesar
    pub incoming: String,
    /// Ya extraídas y persistidas, pendientes de revisión
    pub processed: String,
    /// Aprobadas por un revisor
    pub approved: String,
}

impl Default for Prefixes {
    fn default() -> Self {
        Self {
            incoming: "incoming/".to_string(),
            processed: "processed/".to_string(),
            approved: "approved/".to_string(),
        }
    }
}

/// Dónde viven los objetos y los documentos de resultado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Directorio raíz; cada bucket es un subdirectorio
    pub root: PathBuf,
    pub bucket: String,
    /// Directorio de la base de documentos (una colección por subdirectorio)
    pub results_dir: PathBuf,
}

impl StorageConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            root: PathBuf::from(optional(&lookup, "STORAGE_ROOT", DEFAULT_STORAGE_ROOT)),
            bucket: required(&lookup, "BUCKET")?,
            results_dir: PathBuf::from(optional(&lookup, "RESULTS_DIR", DEFAULT_RESULTS_DIR)),
        })
    }

    pub fn bucket_dir(&self) -> PathBuf {
        self.root.join(&self.bucket)
    }
}

/// Configuración del servicio de extracción de documentos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionConfig {
    pub target: ProcessorTarget,
    /// Base URL del servicio; por defecto el endpoint regional
    pub endpoint: String,
    pub access_token: Option<String>,
    pub mime_type: String,
    pub timeout_secs: u64,
}

impl ExtractionConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let location = optional(&lookup, "DOCUMENT_AI_LOCATION", DEFAULT_LOCATION);
        let default_endpoint = format!("https://{location}-documentai.googleapis.com");

        let timeout_secs = match non_empty(&lookup, "DOCUMENT_AI_TIMEOUT_SECS") {
            None => DEFAULT_EXTRACT_TIMEOUT_SECS,
            Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
                var: "DOCUMENT_AI_TIMEOUT_SECS",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
        };

        Ok(Self {
            target: ProcessorTarget {
                project_id: required(&lookup, "GOOGLE_CLOUD_PROJECT")?,
                location,
                processor_id: required(&lookup, "PROCESSOR_ID")?,
            },
            endpoint: optional(&lookup, "DOCUMENT_AI_ENDPOINT", &default_endpoint),
            access_token: non_empty(&lookup, "DOCUMENT_AI_TOKEN"),
            mime_type: optional(&lookup, "DOCUMENT_MIME_TYPE", DEFAULT_MIME_TYPE),
            timeout_secs,
        })
    }
}

fn non_empty<F>(lookup: &F, var: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn optional<F>(lookup: &F, var: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, var).unwrap_or_else(|| default.to_string())
}

fn required<F>(lookup: &F, var: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, var).ok_or(ConfigError::Missing(var))
}
