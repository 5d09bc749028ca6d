use thiserror::Error;

/// Errores de configuración: siempre fatales, se detectan antes de procesar nada.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("falta la variable de entorno obligatoria {0}")]
    Missing(&'static str),

    #[error("valor inválido para {var}: '{value}' ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("alfabeto de particionado inválido '{0}': debe ser no vacío y sin caracteres repetidos")]
    InvalidAlphabet(String),

    #[error("índice de tarea {index} fuera de rango para {count} tareas")]
    TaskIndexOutOfRange { index: u32, count: u32 },
}

/// Errores del almacenamiento de objetos o de resultados.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no existe el objeto {0}")]
    NotFound(String),

    #[error("clave inválida: {0}")]
    InvalidKey(String),

    #[error("error de E/S sobre {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("documento corrupto {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn io(key: impl Into<String>, source: std::io::Error) -> Self {
        StoreError::Io {
            key: key.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Errores del servicio de extracción de documentos.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("fallo HTTP llamando a {endpoint}: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("el extractor devolvió status {status}: {body}")]
    BadStatus { status: u16, body: String },

    #[error("respuesta del extractor sin documento")]
    EmptyDocument,
}

/// Fallo al procesar un único work item. Nunca aborta la tarea completa.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("no se pudo leer el item: {0}")]
    Fetch(#[source] StoreError),

    #[error("falló la extracción: {0}")]
    Extract(#[from] ExtractError),

    #[error("no se pudo persistir el resultado: {0}")]
    Persist(#[source] StoreError),
}
