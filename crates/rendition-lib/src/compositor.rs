//! Visual compositor — source text → document → surface → PNG.
//!
//! Pipeline:
//!
//! ```text
//! options ──► CompositingMode::select
//!                 │
//! source ──► DocumentTemplate::build(source, mode) ──► html
//!                 │
//!   acquire(viewport) → load(html) → wait_until(ready) → capture → close
//!                 │
//!   normalize: RGB8 (Background-Full) / RGBA8 (transparent modes) → PNG
//! ```
//!
//! | omit_background | tight_crop | mode              | capture                |
//! |-----------------|------------|-------------------|------------------------|
//! | false           | any        | Background-Full   | viewport, opaque       |
//! | true            | true       | Transparent-Crop  | marker element, alpha  |
//! | true            | false      | Transparent-Full  | viewport, alpha        |
//!
//! The surface is closed on every exit path after it has been acquired.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use image::{DynamicImage, ImageFormat};
use tracing::{debug, warn};

use rendition_core::types::{EngineId, RenderOptions};

use crate::error::{RenderError, SurfaceError};
use crate::surface::{RenderSurface, SurfaceLauncher, Viewport};

/// DOM id of the shrink-to-fit wrapper captured in Transparent-Crop mode.
pub const CAPTURE_MARKER_ID: &str = "rendition-capture";

/// Set on `<html>` once the document has finished loading and laying out.
const READY_CHECK: &str = concat!(
    "document.documentElement.dataset.renditionReady === 'true'",
    " && document.fonts.status === 'loaded'"
);

const MARKUP_FULL_LAYOUT: &str = "body { width: 100vw; min-height: 100vh; }";

/// Centres the diagram in the viewport.
const DIAGRAM_FULL_LAYOUT: &str = "body { display: flex; justify-content: center; \
     align-items: center; width: 100vw; height: 100vh; }";

/// Message left on `<html>` by the diagram script when layout fails.
const DIAGRAM_ERROR_EXPR: &str = "document.documentElement.dataset.renditionError || null";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositingMode {
    BackgroundFull,
    TransparentCrop,
    TransparentFull,
}

impl CompositingMode {
    pub fn select(options: &RenderOptions) -> Self {
        match (options.omit_background, options.tight_crop) {
            (false, _) => CompositingMode::BackgroundFull,
            (true, true) => CompositingMode::TransparentCrop,
            (true, false) => CompositingMode::TransparentFull,
        }
    }

    pub fn is_transparent(&self) -> bool {
        !matches!(self, CompositingMode::BackgroundFull)
    }
}

/// How a source text becomes a full HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentTemplate {
    /// Author HTML on top of a reset + utility-class stylesheet layer.
    Markup { style_framework_url: String },
    /// Diagram DSL laid out by a diagram script module.
    Diagram { script_url: String },
}

impl DocumentTemplate {
    pub fn build(&self, source: &str, mode: CompositingMode) -> String {
        let head = match self {
            DocumentTemplate::Markup {
                style_framework_url,
            } => {
                let src = escape_attr(style_framework_url);
                format!(r#"<script src="{src}"></script>"#)
            }
            DocumentTemplate::Diagram { .. } => String::new(),
        };

        let background = if mode.is_transparent() {
            "transparent"
        } else {
            "#ffffff"
        };

        let layout = match (self, mode) {
            (_, CompositingMode::TransparentCrop) => String::new(),
            (DocumentTemplate::Markup { .. }, _) => MARKUP_FULL_LAYOUT.to_string(),
            (DocumentTemplate::Diagram { .. }, _) => DIAGRAM_FULL_LAYOUT.to_string(),
        };

        let content = match self {
            DocumentTemplate::Markup { .. } => source.to_string(),
            DocumentTemplate::Diagram { .. } => {
                format!(r#"<div class="mermaid">{}</div>"#, escape_html(source))
            }
        };

        let body = if mode == CompositingMode::TransparentCrop {
            format!(
                r#"<div id="{CAPTURE_MARKER_ID}" style="display: inline-block;">{content}</div>"#
            )
        } else {
            content
        };

        let script = match self {
            DocumentTemplate::Markup { .. } => MARKUP_READY_SCRIPT.to_string(),
            DocumentTemplate::Diagram { script_url } => {
                DIAGRAM_SCRIPT.replace("{script_url}", &escape_js(script_url))
            }
        };

        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n{head}\n<style>\n\
             html, body {{ margin: 0; padding: 0; background: {background}; }}\n{layout}\n\
             </style>\n</head>\n<body>\n{body}\n{script}\n</body>\n</html>\n"
        )
    }
}

// Two animation frames after `load` so utility styles generated on load are
// applied before the ready flag flips.
const MARKUP_READY_SCRIPT: &str = r#"<script>
const markReady = () => requestAnimationFrame(() => requestAnimationFrame(() => {
  document.documentElement.dataset.renditionReady = 'true';
}));
if (document.readyState === 'complete') markReady();
else window.addEventListener('load', markReady);
</script>"#;

const DIAGRAM_SCRIPT: &str = r#"<script type="module">
const root = document.documentElement;
try {
  const { default: mermaid } = await import('{script_url}');
  mermaid.initialize({ startOnLoad: false });
  await mermaid.run({ querySelector: '.mermaid' });
} catch (e) {
  root.dataset.renditionError = String((e && e.message) || e);
}
root.dataset.renditionReady = 'true';
</script>"#;

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_html(s).replace('"', "&quot;")
}

fn escape_js(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Drives one surface per render. Shared by the markup and diagram engines.
pub struct VisualCompositor {
    launcher: Arc<dyn SurfaceLauncher>,
    settle_timeout: Duration,
}

impl VisualCompositor {
    pub fn new(launcher: Arc<dyn SurfaceLauncher>, settle_timeout: Duration) -> Self {
        Self {
            launcher,
            settle_timeout,
        }
    }

    pub async fn composite(
        &self,
        engine: EngineId,
        template: &DocumentTemplate,
        source: &str,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, RenderError> {
        let mode = CompositingMode::select(options);
        let html = template.build(source, mode);
        let viewport = Viewport {
            width: options.width,
            height: options.height,
            device_scale_factor: options.scale_factor,
        };

        debug!(
            "compositor[{engine}]: {mode:?} {}x{}@{}",
            viewport.width, viewport.height, viewport.device_scale_factor
        );

        let mut surface = self
            .launcher
            .acquire(viewport)
            .await
            .map_err(|e| RenderError::failure(engine, e))?;

        let captured = self.capture(surface.as_mut(), template, &html, mode).await;
        let released = surface.close().await;
        drop(surface);

        let captured = captured.map_err(|e| RenderError::failure(engine, e))?;
        if let Err(e) = released {
            warn!("compositor[{engine}]: surface release failed after capture: {e}");
        }

        let (bytes, width, height) = match captured {
            Some(png) => normalize_png(&png, mode),
            None => {
                debug!("compositor[{engine}]: content box is empty");
                empty_png()
            }
        }
        .map_err(|e| RenderError::failure(engine, e))?;
        debug!(
            "compositor[{engine}]: captured {width}x{height} ({} bytes)",
            bytes.len()
        );
        Ok(bytes)
    }

    async fn capture(
        &self,
        surface: &mut dyn RenderSurface,
        template: &DocumentTemplate,
        html: &str,
        mode: CompositingMode,
    ) -> Result<Option<Vec<u8>>, SurfaceError> {
        surface.load(html).await?;
        surface.wait_until(READY_CHECK, self.settle_timeout).await?;

        if matches!(template, DocumentTemplate::Diagram { .. }) {
            if let Some(message) = surface.read_string(DIAGRAM_ERROR_EXPR).await? {
                return Err(SurfaceError::Load(format!("diagram layout failed: {message}")));
            }
        }

        match mode {
            CompositingMode::BackgroundFull => surface.capture_viewport(false).await.map(Some),
            CompositingMode::TransparentFull => surface.capture_viewport(true).await.map(Some),
            CompositingMode::TransparentCrop => {
                surface
                    .capture_element(&format!("#{CAPTURE_MARKER_ID}"), true)
                    .await
            }
        }
    }
}

/// A single fully transparent pixel, returned when tight-cropped content has
/// no layout box.
fn empty_png() -> Result<(Vec<u8>, u32, u32), SurfaceError> {
    let mut out = Vec::new();
    DynamicImage::ImageRgba8(image::RgbaImage::new(1, 1))
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .map_err(|e| SurfaceError::Image(e.to_string()))?;
    Ok((out, 1, 1))
}

/// Re-encode a captured PNG: RGB8 for opaque output, RGBA8 otherwise.
fn normalize_png(png: &[u8], mode: CompositingMode) -> Result<(Vec<u8>, u32, u32), SurfaceError> {
    let decoded = image::load_from_memory_with_format(png, ImageFormat::Png)
        .map_err(|e| SurfaceError::Image(e.to_string()))?;

    let normalized = if mode.is_transparent() {
        DynamicImage::ImageRgba8(decoded.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(decoded.to_rgb8())
    };

    let mut out = Vec::new();
    normalized
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .map_err(|e| SurfaceError::Image(e.to_string()))?;

    Ok((out, normalized.width(), normalized.height()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;
    use image::{ColorType, Rgba, RgbaImage};

    use crate::error::FailureCause;

    /// Where a [`FakeLauncher`] surface should fail.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) enum FailAt {
        Nowhere,
        Acquire,
        Load,
        Settle,
        Capture,
    }

    /// Surface double that records calls and returns synthetic PNGs.
    ///
    /// Viewport captures are `width*scale × height*scale`; element captures
    /// are a fixed 120×40 box. Transparent captures leave a zero-alpha border.
    pub(crate) struct FakeLauncher {
        pub fail_at: FailAt,
        pub diagram_error: Option<String>,
        /// Report the capture marker as present but zero-sized.
        pub empty_element: bool,
        pub events: Arc<Mutex<Vec<String>>>,
    }

    impl FakeLauncher {
        pub(crate) fn new(fail_at: FailAt) -> Arc<Self> {
            Arc::new(Self {
                fail_at,
                diagram_error: None,
                empty_element: false,
                events: Arc::new(Mutex::new(Vec::new())),
            })
        }

        pub(crate) fn with_empty_element() -> Arc<Self> {
            Arc::new(Self {
                fail_at: FailAt::Nowhere,
                diagram_error: None,
                empty_element: true,
                events: Arc::new(Mutex::new(Vec::new())),
            })
        }

        pub(crate) fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    struct FakeSurface {
        viewport: Viewport,
        fail_at: FailAt,
        diagram_error: Option<String>,
        empty_element: bool,
        events: Arc<Mutex<Vec<String>>>,
    }

    impl FakeSurface {
        fn log(&self, event: impl Into<String>) {
            self.events.lock().unwrap().push(event.into());
        }
    }

    pub(crate) const ELEMENT_W: u32 = 120;
    pub(crate) const ELEMENT_H: u32 = 40;

    fn synthetic_png(width: u32, height: u32, transparent: bool) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            let border = x == 0 || y == 0 || x == width - 1 || y == height - 1;
            if transparent && border {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([20, 40, 200, 255])
            }
        });
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[async_trait]
    impl SurfaceLauncher for FakeLauncher {
        async fn acquire(
            &self,
            viewport: Viewport,
        ) -> Result<Box<dyn RenderSurface>, SurfaceError> {
            if self.fail_at == FailAt::Acquire {
                return Err(SurfaceError::Launch("no browser".into()));
            }
            self.events.lock().unwrap().push(format!(
                "acquire {}x{}@{}",
                viewport.width, viewport.height, viewport.device_scale_factor
            ));
            Ok(Box::new(FakeSurface {
                viewport,
                fail_at: self.fail_at,
                diagram_error: self.diagram_error.clone(),
                empty_element: self.empty_element,
                events: self.events.clone(),
            }))
        }
    }

    #[async_trait]
    impl RenderSurface for FakeSurface {
        async fn load(&mut self, html: &str) -> Result<(), SurfaceError> {
            self.log(format!("load {html}"));
            if self.fail_at == FailAt::Load {
                return Err(SurfaceError::Load("net::ERR_FAILED".into()));
            }
            Ok(())
        }

        async fn wait_until(
            &mut self,
            condition: &str,
            timeout: Duration,
        ) -> Result<(), SurfaceError> {
            self.log(format!("wait {condition}"));
            if self.fail_at == FailAt::Settle {
                return Err(SurfaceError::SettleTimeout(timeout.as_millis() as u64));
            }
            Ok(())
        }

        async fn read_string(&mut self, expr: &str) -> Result<Option<String>, SurfaceError> {
            self.log(format!("read {expr}"));
            Ok(self.diagram_error.clone())
        }

        async fn capture_viewport(&mut self, transparent: bool) -> Result<Vec<u8>, SurfaceError> {
            self.log(format!("capture_viewport transparent={transparent}"));
            if self.fail_at == FailAt::Capture {
                return Err(SurfaceError::Capture("target closed".into()));
            }
            let scale = self.viewport.device_scale_factor;
            Ok(synthetic_png(
                (self.viewport.width as f64 * scale).round() as u32,
                (self.viewport.height as f64 * scale).round() as u32,
                transparent,
            ))
        }

        async fn capture_element(
            &mut self,
            selector: &str,
            transparent: bool,
        ) -> Result<Option<Vec<u8>>, SurfaceError> {
            self.log(format!("capture_element {selector} transparent={transparent}"));
            if self.fail_at == FailAt::Capture {
                return Err(SurfaceError::Capture("target closed".into()));
            }
            if self.empty_element {
                return Ok(None);
            }
            Ok(Some(synthetic_png(ELEMENT_W, ELEMENT_H, transparent)))
        }

        async fn close(&mut self) -> Result<(), SurfaceError> {
            self.log("close");
            Ok(())
        }
    }

    fn markup() -> DocumentTemplate {
        DocumentTemplate::Markup {
            style_framework_url: "https://cdn.example/tailwind.js".into(),
        }
    }

    fn diagram() -> DocumentTemplate {
        DocumentTemplate::Diagram {
            script_url: "https://cdn.example/mermaid.mjs".into(),
        }
    }

    fn opts(width: u32, height: u32, omit_background: bool, tight_crop: bool) -> RenderOptions {
        RenderOptions {
            width,
            height,
            omit_background,
            tight_crop,
            ..Default::default()
        }
    }

    fn compositor(launcher: Arc<FakeLauncher>) -> VisualCompositor {
        VisualCompositor::new(launcher, Duration::from_secs(5))
    }

    // ── mode selection ─────────────────────────────────────────────

    #[test]
    fn mode_table() {
        assert_eq!(
            CompositingMode::select(&opts(1, 1, false, true)),
            CompositingMode::BackgroundFull
        );
        assert_eq!(
            CompositingMode::select(&opts(1, 1, false, false)),
            CompositingMode::BackgroundFull
        );
        assert_eq!(
            CompositingMode::select(&opts(1, 1, true, true)),
            CompositingMode::TransparentCrop
        );
        assert_eq!(
            CompositingMode::select(&opts(1, 1, true, false)),
            CompositingMode::TransparentFull
        );
    }

    // ── document structure ─────────────────────────────────────────

    #[test]
    fn markup_full_places_source_in_body() {
        let html = markup().build("<h1>Hello</h1>", CompositingMode::BackgroundFull);
        assert!(html.contains("<body>\n<h1>Hello</h1>"));
        assert!(html.contains(r#"<script src="https://cdn.example/tailwind.js"></script>"#));
        assert!(html.contains("background: #ffffff"));
        assert!(!html.contains(CAPTURE_MARKER_ID));
    }

    #[test]
    fn markup_crop_wraps_source_in_marker() {
        let html = markup().build("<h1>Hello</h1>", CompositingMode::TransparentCrop);
        assert!(html.contains(&format!(
            r#"<div id="{CAPTURE_MARKER_ID}" style="display: inline-block;"><h1>Hello</h1></div>"#
        )));
        assert!(html.contains("background: transparent"));
    }

    #[test]
    fn markup_transparent_full_has_no_marker() {
        let html = markup().build("<p>x</p>", CompositingMode::TransparentFull);
        assert!(!html.contains(CAPTURE_MARKER_ID));
        assert!(html.contains("background: transparent"));
        assert!(html.contains("min-height: 100vh"));
    }

    #[test]
    fn diagram_escapes_source_and_loads_script() {
        let html = diagram().build("graph TD\n  A-->B & C", CompositingMode::BackgroundFull);
        assert!(html.contains(r#"<div class="mermaid">graph TD"#));
        assert!(html.contains("A--&gt;B &amp; C"));
        assert!(html.contains("import('https://cdn.example/mermaid.mjs')"));
        assert!(html.contains("mermaid.run"));
        assert!(!html.contains("tailwind"));
    }

    #[test]
    fn empty_source_still_builds_document() {
        let html = markup().build("", CompositingMode::BackgroundFull);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("</body>"));
    }

    // ── capture flow ───────────────────────────────────────────────

    #[tokio::test]
    async fn background_full_is_opaque_viewport() {
        let launcher = FakeLauncher::new(FailAt::Nowhere);
        let options = opts(500, 300, false, true);
        let png = compositor(launcher.clone())
            .composite(EngineId::Markup, &markup(), "<h1>Hello</h1>", &options)
            .await
            .unwrap();

        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (500, 300));
        assert_eq!(img.color(), ColorType::Rgb8);

        let events = launcher.events();
        assert_eq!(events[0], "acquire 500x300@1");
        assert!(events.iter().any(|e| e == "capture_viewport transparent=false"));
        assert_eq!(events.last().unwrap(), "close");
    }

    #[tokio::test]
    async fn scale_factor_multiplies_pixels() {
        let launcher = FakeLauncher::new(FailAt::Nowhere);
        let options = RenderOptions {
            scale_factor: 2.0,
            ..opts(500, 300, false, true)
        };
        let png = compositor(launcher)
            .composite(EngineId::Markup, &markup(), "<p>hi</p>", &options)
            .await
            .unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (1000, 600));
    }

    #[tokio::test]
    async fn transparent_crop_captures_marker_with_alpha() {
        let launcher = FakeLauncher::new(FailAt::Nowhere);
        let options = opts(500, 300, true, true);
        let png = compositor(launcher.clone())
            .composite(EngineId::Markup, &markup(), "<h1>Hello</h1>", &options)
            .await
            .unwrap();

        let img = image::load_from_memory(&png).unwrap();
        assert_eq!(img.color(), ColorType::Rgba8);
        assert_eq!((img.width(), img.height()), (ELEMENT_W, ELEMENT_H));
        assert!(img.width() <= 500 && img.height() <= 300);

        let events = launcher.events();
        assert!(
            events
                .iter()
                .any(|e| e == &format!("capture_element #{CAPTURE_MARKER_ID} transparent=true"))
        );
        assert!(!events.iter().any(|e| e.starts_with("capture_viewport")));
    }

    #[tokio::test]
    async fn transparent_full_keeps_viewport_and_alpha() {
        let launcher = FakeLauncher::new(FailAt::Nowhere);
        let options = opts(500, 300, true, false);
        let png = compositor(launcher.clone())
            .composite(EngineId::Markup, &markup(), "<p>x</p>", &options)
            .await
            .unwrap();

        let img = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (500, 300));
        assert_eq!(img.get_pixel(0, 0).0[3], 0);
        assert_eq!(img.get_pixel(250, 150).0[3], 255);
        assert!(
            launcher
                .events()
                .iter()
                .any(|e| e == "capture_viewport transparent=true")
        );
    }

    #[tokio::test]
    async fn waits_for_ready_before_capture() {
        let launcher = FakeLauncher::new(FailAt::Nowhere);
        let options = opts(100, 100, false, true);
        compositor(launcher.clone())
            .composite(EngineId::Markup, &markup(), "<p>x</p>", &options)
            .await
            .unwrap();

        let events = launcher.events();
        let load = events.iter().position(|e| e.starts_with("load ")).unwrap();
        let wait = events.iter().position(|e| e.starts_with("wait ")).unwrap();
        let capture = events
            .iter()
            .position(|e| e.starts_with("capture"))
            .unwrap();
        assert!(load < wait && wait < capture);
        assert_eq!(events[wait], format!("wait {READY_CHECK}"));
    }

    #[tokio::test]
    async fn diagram_checks_layout_error() {
        let launcher = Arc::new(FakeLauncher {
            fail_at: FailAt::Nowhere,
            diagram_error: Some("Parse error on line 1".into()),
            empty_element: false,
            events: Arc::new(Mutex::new(Vec::new())),
        });
        let options = opts(400, 300, false, true);
        let err = compositor(launcher.clone())
            .composite(EngineId::Diagram, &diagram(), "graph ???", &options)
            .await
            .unwrap_err();

        match err {
            RenderError::Failure {
                engine,
                source: FailureCause::Surface(SurfaceError::Load(msg)),
            } => {
                assert_eq!(engine, EngineId::Diagram);
                assert!(msg.contains("Parse error"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(launcher.events().last().unwrap(), "close");
    }

    // ── release on failure ─────────────────────────────────────────

    #[tokio::test]
    async fn surface_released_on_every_failure() {
        for fail_at in [FailAt::Load, FailAt::Settle, FailAt::Capture] {
            let launcher = FakeLauncher::new(fail_at);
            let options = opts(100, 100, true, true);
            let err = compositor(launcher.clone())
                .composite(EngineId::Markup, &markup(), "<p>x</p>", &options)
                .await
                .unwrap_err();

            assert!(
                matches!(err, RenderError::Failure { engine: EngineId::Markup, .. }),
                "{fail_at:?}: {err}"
            );
            let events = launcher.events();
            assert_eq!(events.last().unwrap(), "close", "{fail_at:?}");
            assert_eq!(events.iter().filter(|e| *e == "close").count(), 1);
        }
    }

    #[tokio::test]
    async fn acquire_failure_is_render_failure() {
        let launcher = FakeLauncher::new(FailAt::Acquire);
        let options = opts(100, 100, false, true);
        let err = compositor(launcher.clone())
            .composite(EngineId::Diagram, &diagram(), "graph TD", &options)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::Failure {
                engine: EngineId::Diagram,
                source: FailureCause::Surface(SurfaceError::Launch(_))
            }
        ));
        assert!(launcher.events().is_empty());
    }

    #[tokio::test]
    async fn empty_markup_crops_to_transparent_pixel() {
        for source in ["", "   \n  "] {
            let launcher = FakeLauncher::with_empty_element();
            let options = opts(500, 300, true, true);
            let png = compositor(launcher.clone())
                .composite(EngineId::Markup, &markup(), source, &options)
                .await
                .unwrap();

            let img = image::load_from_memory(&png).unwrap();
            assert_eq!(img.color(), ColorType::Rgba8);
            assert_eq!((img.width(), img.height()), (1, 1));
            assert_eq!(img.to_rgba8().get_pixel(0, 0).0[3], 0);
            assert_eq!(launcher.events().last().unwrap(), "close");
        }
    }

    #[tokio::test]
    async fn empty_markup_full_modes_keep_viewport() {
        let launcher = FakeLauncher::new(FailAt::Nowhere);
        let options = opts(200, 100, false, true);
        let png = compositor(launcher)
            .composite(EngineId::Markup, &markup(), "", &options)
            .await
            .unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (200, 100));
    }

    #[test]
    fn normalize_rejects_garbage() {
        assert!(matches!(
            normalize_png(b"not a png", CompositingMode::BackgroundFull),
            Err(SurfaceError::Image(_))
        ));
    }
}
