//! The engine contract shared by every renderer.

use async_trait::async_trait;

use rendition_core::types::{EngineId, RenderOptions};

use crate::error::RenderError;

/// Maps `(source_text, options)` to encoded bytes of one media type.
///
/// Implementations are constructed once at startup and shared across
/// concurrent requests, so `render` takes `&self`.
#[async_trait]
pub trait RenderingEngine: Send + Sync {
    /// Identifier this engine reports in failures and logs.
    fn id(&self) -> EngineId;

    /// Media type of every payload this engine returns.
    fn media_type(&self) -> &'static str;

    async fn render(&self, source_text: &str, options: &RenderOptions)
    -> Result<Vec<u8>, RenderError>;
}

/// Encoded output handed back to the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub bytes: Vec<u8>,
    pub media_type: &'static str,
}
