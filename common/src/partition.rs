use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt, ops::Range};

use crate::error::ConfigError;
use crate::task::TaskDescriptor;

/// Los nombres que genera el uploader son UUID v4 en minúscula,
/// así que empiezan siempre por uno de estos caracteres.
pub const HEX_ALPHABET: &str = "0123456789abcdef";

/// Predicado de pertenencia: ¿este item le toca a esta tarea?
/// Es puro; dos tareas con la misma enumeración nunca se pisan.
pub trait Assignment {
    type Item: ?Sized;

    fn owns(&self, item: &Self::Item) -> bool;
}

/// Clasificación de un item respecto a la partición de una tarea.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Mine,
    Other,
    /// El primer carácter no está en el alfabeto (o el nombre es vacío).
    Orphan,
}

/* =========================
   Partición por carácter inicial
   ========================= */

/// Espacio de claves indexado por el primer carácter del nombre.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    alphabet: Vec<char>,
}

impl KeySpace {
    pub fn new(alphabet: &str) -> Result<Self, ConfigError> {
        let chars: Vec<char> = alphabet.chars().collect();
        let unique: HashSet<char> = chars.iter().copied().collect();
        if chars.is_empty() || unique.len() != chars.len() {
            return Err(ConfigError::InvalidAlphabet(alphabet.to_string()));
        }
        Ok(Self { alphabet: chars })
    }

    pub fn hex() -> Self {
        Self {
            alphabet: HEX_ALPHABET.chars().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.alphabet.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alphabet.is_empty()
    }

    /// Reparte el alfabeto entre `count` tareas, en orden.
    ///
    /// Cada tarea toma `ceil(restantes / tareas_restantes)` caracteres, así
    /// que las primeras reciben como mucho uno más que las últimas. Si hay
    /// más tareas que caracteres, las últimas se quedan con un conjunto vacío.
    /// Reserva un `String` por tarea: pensado para mostrar, no para el worker.
    pub fn plan(&self, count: u32) -> Vec<String> {
        (0..count)
            .map(|index| self.alphabet[self.slice_for(index, count)].iter().collect())
            .collect()
    }

    /// Tramo del alfabeto de la tarea `index` de `count`, sin armar el plan.
    ///
    /// Con `q = L / count` y `r = L % count`, las `r` primeras tareas toman
    /// `q + 1` caracteres y el resto `q`.
    pub fn slice_for(&self, index: u32, count: u32) -> Range<usize> {
        let len = self.alphabet.len() as u64;
        let (index, count) = (u64::from(index), u64::from(count.max(1)));
        let q = len / count;
        let r = len % count;

        let start = (index * q + index.min(r)).min(len);
        let size = if index < r { q + 1 } else { q };
        let end = (start + size).min(len);
        start as usize..end as usize
    }

    /// Partición de una tarea concreta.
    pub fn partition_for(&self, task: &TaskDescriptor) -> PrefixPartition {
        let mine = self.alphabet[self.slice_for(task.index(), task.count())]
            .iter()
            .copied()
            .collect();

        PrefixPartition {
            mine,
            alphabet: self.alphabet.iter().copied().collect(),
            catch_all: task.is_catch_all(),
        }
    }
}

/// Caracteres iniciales que posee una tarea.
#[derive(Debug, Clone)]
pub struct PrefixPartition {
    mine: HashSet<char>,
    alphabet: HashSet<char>,
    catch_all: bool,
}

impl PrefixPartition {
    pub fn ownership(&self, bare_name: &str) -> Ownership {
        match bare_name.chars().next() {
            Some(c) if self.mine.contains(&c) => Ownership::Mine,
            Some(c) if self.alphabet.contains(&c) => Ownership::Other,
            _ => Ownership::Orphan,
        }
    }

    pub fn is_catch_all(&self) -> bool {
        self.catch_all
    }

    pub fn is_empty(&self) -> bool {
        self.mine.is_empty()
    }

    /// Caracteres propios, ordenados (para logs).
    pub fn chars(&self) -> String {
        let mut chars: Vec<char> = self.mine.iter().copied().collect();
        chars.sort_unstable();
        chars.into_iter().collect()
    }
}

impl Assignment for PrefixPartition {
    type Item = str;

    fn owns(&self, bare_name: &str) -> bool {
        match self.ownership(bare_name) {
            Ownership::Mine => true,
            Ownership::Other => false,
            Ownership::Orphan => self.catch_all,
        }
    }
}

/* =========================
   Partición por rango de índices
   ========================= */

/// Rango semiabierto `[start, end)` sobre una secuencia de `len` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangePartition {
    start: usize,
    end: usize,
}

impl RangePartition {
    /// `chunk = ceil(len / count)`; la última tarea queda recortada a `len`
    /// y las que empiezan en o después de `len` no tienen nada.
    pub fn for_task(len: usize, task: &TaskDescriptor) -> Self {
        let chunk_size = len.div_ceil(task.count() as usize);
        let start = chunk_size.saturating_mul(task.index() as usize).min(len);
        let end = start.saturating_add(chunk_size).min(len);
        Self { start, end }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl Assignment for RangePartition {
    type Item = usize;

    fn owns(&self, index: &usize) -> bool {
        self.as_range().contains(index)
    }
}

impl fmt::Display for RangePartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
