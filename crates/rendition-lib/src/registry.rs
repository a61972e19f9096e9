//! Engine registry — identifier → engine instance.
//!
//! Populated once during startup (see [`crate::bootstrap`]) and read-only
//! afterwards. Registering an identifier twice replaces the earlier engine.

use std::collections::HashMap;
use std::sync::Arc;

use rendition_core::types::EngineId;
use tracing::debug;

use crate::engine::RenderingEngine;
use crate::error::RenderError;

#[derive(Default, Clone)]
pub struct EngineRegistry {
    engines: HashMap<EngineId, Arc<dyn RenderingEngine>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `engine` under `id`, overwriting any prior registration.
    pub fn register(&mut self, id: EngineId, engine: Arc<dyn RenderingEngine>) {
        if self.engines.insert(id, engine).is_some() {
            debug!("registry: replaced engine for '{id}'");
        }
    }

    pub fn resolve(&self, id: EngineId) -> Result<Arc<dyn RenderingEngine>, RenderError> {
        self.engines
            .get(&id)
            .cloned()
            .ok_or(RenderError::EngineNotFound(id))
    }

    /// Registered identifiers in canonical order.
    pub fn ids(&self) -> Vec<EngineId> {
        EngineId::ALL
            .into_iter()
            .filter(|id| self.engines.contains_key(id))
            .collect()
    }
}
