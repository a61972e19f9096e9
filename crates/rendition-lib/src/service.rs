//! Generation service — the single entry point for the transport layer.
//!
//! ```text
//! RenderRequest → registry.resolve(engine) → options.validate() → engine.render() → Rendered
//! ```
//!
//! No retries, no caching, no format negotiation. The first failure is
//! returned as-is.

use std::time::Instant;

use rendition_core::types::{EngineId, RenderRequest};
use tracing::{debug, warn};

use crate::engine::Rendered;
use crate::error::RenderError;
use crate::registry::EngineRegistry;

pub struct GenerationService {
    registry: EngineRegistry,
}

impl GenerationService {
    pub fn new(registry: EngineRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    /// Media type the given engine produces, if registered.
    pub fn media_type(&self, id: EngineId) -> Result<&'static str, RenderError> {
        Ok(self.registry.resolve(id)?.media_type())
    }

    pub async fn process_request(&self, request: &RenderRequest) -> Result<Rendered, RenderError> {
        let engine = self.registry.resolve(request.engine)?;
        request.options.validate()?;

        debug!(
            "generate: engine={} source={} bytes",
            request.engine,
            request.source_text.len()
        );
        let started = Instant::now();

        match engine.render(&request.source_text, &request.options).await {
            Ok(bytes) => {
                debug!(
                    "generate: engine={} produced {} bytes in {} ms",
                    request.engine,
                    bytes.len(),
                    started.elapsed().as_millis()
                );
                Ok(Rendered {
                    bytes,
                    media_type: engine.media_type(),
                })
            }
            Err(e) => {
                warn!("generate: engine={} failed: {e}", request.engine);
                Err(e)
            }
        }
    }
}
