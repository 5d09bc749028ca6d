use serde::{Deserialize, Serialize};
use std::fmt;

/// Carpeta en la que está un item dentro del bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Location {
    Pending,
    Processed,
    Approved,
}

/// Un objeto del bucket descubierto en esta ejecución.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    key: String,
    bare_start: usize,
    location: Location,
}

impl WorkItem {
    /// Construye el item si `key` cuelga de `prefix` y no es una carpeta.
    pub fn under(key: impl Into<String>, prefix: &str, location: Location) -> Option<Self> {
        let key = key.into();
        let bare = key.strip_prefix(prefix)?;
        if bare.is_empty() || bare.ends_with('/') {
            return None;
        }
        Some(Self {
            bare_start: prefix.len(),
            key,
            location,
        })
    }

    /// Clave completa, con prefijo.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Nombre sin la carpeta (lo que se usa para particionar y como id).
    pub fn bare_name(&self) -> &str {
        &self.key[self.bare_start..]
    }

    pub fn location(&self) -> Location {
        self.location
    }

    /// Misma clave bajo otra carpeta.
    pub fn key_under(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.bare_name())
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Una línea de un objeto de texto, con su posición.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub index: usize,
    pub text: String,
}
