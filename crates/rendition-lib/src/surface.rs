//! Rendering surface port — an isolated, disposable page.
//!
//! One surface is acquired per visual render and closed when the render
//! finishes, successfully or not. Nothing is shared between surfaces.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::SurfaceError;

/// Page geometry requested for a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
}

/// Creates fresh surfaces. Shared across requests.
#[async_trait]
pub trait SurfaceLauncher: Send + Sync {
    async fn acquire(&self, viewport: Viewport) -> Result<Box<dyn RenderSurface>, SurfaceError>;
}

/// A single page: load one document, take one capture, close.
#[async_trait]
pub trait RenderSurface: Send {
    /// Replace the page content with `html`.
    async fn load(&mut self, html: &str) -> Result<(), SurfaceError>;

    /// Evaluate `condition` (a JS boolean expression) until it yields `true` and
    /// the page has no network requests left in flight.
    async fn wait_until(&mut self, condition: &str, timeout: Duration) -> Result<(), SurfaceError>;

    /// Evaluate `expr` and return its value if it is a string.
    async fn read_string(&mut self, expr: &str) -> Result<Option<String>, SurfaceError>;

    /// PNG of the full viewport. `transparent` drops the default white
    /// page background so uncovered pixels keep zero alpha.
    async fn capture_viewport(&mut self, transparent: bool) -> Result<Vec<u8>, SurfaceError>;

    /// PNG clipped to the bounding box of the first element matching
    /// `selector`. `None` when the element exists but its box is empty.
    async fn capture_element(
        &mut self,
        selector: &str,
        transparent: bool,
    ) -> Result<Option<Vec<u8>>, SurfaceError>;

    /// Release the surface. Called exactly once, on every exit path; the
    /// surface is dropped right after.
    async fn close(&mut self) -> Result<(), SurfaceError>;
}
