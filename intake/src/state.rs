// intake/src/state.rs

use common::{ObjectStore, Prefixes, ResultStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub objects: Arc<dyn ObjectStore>,
    pub results: Arc<dyn ResultStore>,
    pub prefixes: Prefixes,
}

impl AppState {
    pub fn new(objects: Arc<dyn ObjectStore>, results: Arc<dyn ResultStore>) -> Self {
        Self {
            objects,
            results,
            prefixes: Prefixes::default(),
        }
    }
}
