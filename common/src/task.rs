use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const TASK_INDEX_VAR: &str = "CLOUD_RUN_TASK_INDEX";
pub const TASK_COUNT_VAR: &str = "CLOUD_RUN_TASK_COUNT";
pub const TASK_ATTEMPT_VAR: &str = "CLOUD_RUN_TASK_ATTEMPT";

/// Identidad de esta tarea dentro de una ejecución del job.
///
/// La entrega el orquestador por variables de entorno y no cambia durante
/// la vida del proceso. Siempre cumple `index < count` y `count >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTaskDescriptor")]
pub struct TaskDescriptor {
    index: u32,
    count: u32,
    attempt: u32,
}

impl Default for TaskDescriptor {
    /// Tarea 0 de 1, intento 0: lo que ve una ejecución local de debug.
    fn default() -> Self {
        Self {
            index: 0,
            count: 1,
            attempt: 0,
        }
    }
}

impl TaskDescriptor {
    pub fn new(index: u32, count: u32, attempt: u32) -> Result<Self, ConfigError> {
        if count == 0 {
            return Err(ConfigError::Invalid {
                var: TASK_COUNT_VAR,
                value: "0".to_string(),
                reason: "debe haber al menos una tarea".to_string(),
            });
        }
        if index >= count {
            return Err(ConfigError::TaskIndexOutOfRange { index, count });
        }
        Ok(Self {
            index,
            count,
            attempt,
        })
    }

    /// Lee la identidad de la tarea desde el entorno del proceso.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Igual que `from_env`, pero con una función de búsqueda inyectable.
    /// Variables vacías cuentan como no definidas.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let index = read_u32(&lookup, TASK_INDEX_VAR, 0)?;
        let count = read_u32(&lookup, TASK_COUNT_VAR, 1)?;
        let attempt = read_u32(&lookup, TASK_ATTEMPT_VAR, 0)?;
        Self::new(index, count, attempt)
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// La tarea 0 recoge los items que no caen en el alfabeto de nadie.
    pub fn is_catch_all(&self) -> bool {
        self.index == 0
    }
}

/// Forma serializada; al leerla pasa por `TaskDescriptor::new`.
#[derive(Deserialize)]
struct RawTaskDescriptor {
    index: u32,
    count: u32,
    #[serde(default)]
    attempt: u32,
}

impl TryFrom<RawTaskDescriptor> for TaskDescriptor {
    type Error = ConfigError;

    fn try_from(raw: RawTaskDescriptor) -> Result<Self, Self::Error> {
        Self::new(raw.index, raw.count, raw.attempt)
    }
}

fn read_u32<F>(lookup: &F, var: &'static str, default: u32) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse::<u32>().map_err(|e| ConfigError::Invalid {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn deserializar_valida_indice_y_cantidad() {
        let ok: TaskDescriptor =
            serde_json::from_str(r#"{"index":1,"count":3,"attempt":2}"#).unwrap();
        assert_eq!(ok, TaskDescriptor::new(1, 3, 2).unwrap());

        assert!(serde_json::from_str::<TaskDescriptor>(r#"{"index":3,"count":2}"#).is_err());
        assert!(serde_json::from_str::<TaskDescriptor>(r#"{"index":0,"count":0}"#).is_err());
    }

    #[test]
    fn sin_variables_es_tarea_0_de_1() {
        let task = TaskDescriptor::from_lookup(|_| None).unwrap();
        assert_eq!(task, TaskDescriptor::default());
        assert!(task.is_catch_all());
    }

    #[test]
    fn lee_las_tres_variables() {
        let task = TaskDescriptor::from_lookup(lookup_from(&[
            (TASK_INDEX_VAR, "2"),
            (TASK_COUNT_VAR, "5"),
            (TASK_ATTEMPT_VAR, "3"),
        ]))
        .unwrap();

        assert_eq!(task.index(), 2);
        assert_eq!(task.count(), 5);
        assert_eq!(task.attempt(), 3);
        assert!(!task.is_catch_all());
    }

    #[test]
    fn variable_vacia_usa_el_default() {
        let task =
            TaskDescriptor::from_lookup(lookup_from(&[(TASK_COUNT_VAR, " ")])).unwrap();
        assert_eq!(task.count(), 1);
    }

    #[test]
    fn indice_mayor_o_igual_que_count_es_fatal() {
        let err = TaskDescriptor::from_lookup(lookup_from(&[
            (TASK_INDEX_VAR, "3"),
            (TASK_COUNT_VAR, "3"),
        ]))
        .unwrap_err();

        assert_eq!(err, ConfigError::TaskIndexOutOfRange { index: 3, count: 3 });
    }

    #[test]
    fn count_cero_es_invalido() {
        let err = TaskDescriptor::new(0, 0, 0).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: TASK_COUNT_VAR, .. }));
    }

    #[test]
    fn valores_no_numericos_son_invalidos() {
        let err = TaskDescriptor::from_lookup(lookup_from(&[(TASK_INDEX_VAR, "-1")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: TASK_INDEX_VAR, .. }));
    }
}
