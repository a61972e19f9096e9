//! Error taxonomy for the render pipeline.

use rendition_core::types::EngineId;
use rendition_core::validate::ValidationError;
use thiserror::Error;

/// Failures of the browser rendering surface.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("failed to load document: {0}")]
    Load(String),
    #[error("document did not settle within {0} ms")]
    SettleTimeout(u64),
    #[error("element '{0}' not found or has no layout box")]
    MissingElement(String),
    #[error("capture failed: {0}")]
    Capture(String),
    #[error("captured image could not be re-encoded: {0}")]
    Image(String),
}

/// Failures of the speech-synthesis backend.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("synthesis request failed: {0}")]
    Request(String),
    #[error("synthesis backend returned {status}: {body}")]
    Backend { status: u16, body: String },
    #[error("synthesis stream interrupted: {0}")]
    Stream(String),
}

/// Failures of the audio encoder.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("failed to spawn encoder '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("encoder i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoder exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },
}

/// Underlying cause of a [`RenderError::Failure`].
#[derive(Debug, Error)]
pub enum FailureCause {
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Errors surfaced by the orchestrator to the transport layer.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No engine registered for the requested identifier. Client error.
    #[error("no engine registered for '{0}'")]
    EngineNotFound(EngineId),
    /// Malformed options, rejected before the engine runs. Client error.
    #[error("invalid options: {0}")]
    Validation(#[from] ValidationError),
    /// A collaborator failed while rendering. Server error.
    #[error("{engine} engine failed: {source}")]
    Failure {
        engine: EngineId,
        #[source]
        source: FailureCause,
    },
}

impl RenderError {
    pub fn failure(engine: EngineId, cause: impl Into<FailureCause>) -> Self {
        RenderError::Failure {
            engine,
            source: cause.into(),
        }
    }

    /// Whether the caller, not the service, is at fault.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, RenderError::Failure { .. })
    }
}
