//! rendition-lib — render service engines.
//!
//! Engine registry and orchestrator, the visual compositor with its
//! headless-browser adapter, the speech assembler with its Kokoro adapter,
//! audio encoders, and the HTTP API. Depends on rendition-core for pure
//! types, validation, and PCM/WAV handling.

pub mod bootstrap;
pub mod chromium;
pub mod compositor;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod kokoro;
pub mod registry;
pub mod server;
pub mod service;
pub mod speech;
pub mod surface;
pub mod synth;
pub mod visual;

// Re-export rendition-core for convenience
pub use rendition_core;
