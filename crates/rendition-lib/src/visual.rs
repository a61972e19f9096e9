//! Markup and diagram engines. Both are thin wrappers over
//! [`VisualCompositor`] with a different document template.

use std::sync::Arc;

use async_trait::async_trait;

use rendition_core::types::{EngineId, RenderOptions};

use crate::compositor::{DocumentTemplate, VisualCompositor};
use crate::engine::RenderingEngine;
use crate::error::RenderError;

pub const PNG_MEDIA_TYPE: &str = "image/png";

/// HTML → PNG, with a utility-class stylesheet layer available to the author.
pub struct MarkupEngine {
    compositor: Arc<VisualCompositor>,
    template: DocumentTemplate,
}

impl MarkupEngine {
    pub fn new(compositor: Arc<VisualCompositor>, style_framework_url: impl Into<String>) -> Self {
        Self {
            compositor,
            template: DocumentTemplate::Markup {
                style_framework_url: style_framework_url.into(),
            },
        }
    }
}

#[async_trait]
impl RenderingEngine for MarkupEngine {
    fn id(&self) -> EngineId {
        EngineId::Markup
    }

    fn media_type(&self) -> &'static str {
        PNG_MEDIA_TYPE
    }

    async fn render(
        &self,
        source_text: &str,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, RenderError> {
        self.compositor
            .composite(EngineId::Markup, &self.template, source_text, options)
            .await
    }
}

/// Mermaid DSL → PNG.
pub struct DiagramEngine {
    compositor: Arc<VisualCompositor>,
    template: DocumentTemplate,
}

impl DiagramEngine {
    pub fn new(compositor: Arc<VisualCompositor>, script_url: impl Into<String>) -> Self {
        Self {
            compositor,
            template: DocumentTemplate::Diagram {
                script_url: script_url.into(),
            },
        }
    }
}

#[async_trait]
impl RenderingEngine for DiagramEngine {
    fn id(&self) -> EngineId {
        EngineId::Diagram
    }

    fn media_type(&self) -> &'static str {
        PNG_MEDIA_TYPE
    }

    async fn render(
        &self,
        source_text: &str,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, RenderError> {
        self.compositor
            .composite(EngineId::Diagram, &self.template, source_text, options)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::compositor::tests::{ELEMENT_H, ELEMENT_W, FailAt, FakeLauncher};

    fn compositor(launcher: Arc<FakeLauncher>) -> Arc<VisualCompositor> {
        Arc::new(VisualCompositor::new(launcher, Duration::from_secs(5)))
    }

    const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

    #[tokio::test]
    async fn markup_hello_default_viewport() {
        let launcher = FakeLauncher::new(FailAt::Nowhere);
        let engine = MarkupEngine::new(compositor(launcher.clone()), "https://cdn.example/tw.js");

        let png = engine
            .render("<h1>Hello</h1>", &RenderOptions::default())
            .await
            .unwrap();
        assert!(png.starts_with(PNG_SIGNATURE));
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (1024, 768));

        let events = launcher.events();
        let load = events.iter().find(|e| e.starts_with("load ")).unwrap();
        assert!(load.contains("<h1>Hello</h1>"));
        assert!(load.contains("https://cdn.example/tw.js"));
    }

    #[tokio::test]
    async fn markup_tight_transparent_is_cropped() {
        let launcher = FakeLauncher::new(FailAt::Nowhere);
        let engine = MarkupEngine::new(compositor(launcher), "https://cdn.example/tw.js");
        let options = RenderOptions {
            width: 500,
            height: 300,
            omit_background: true,
            tight_crop: true,
            ..Default::default()
        };

        let png = engine.render("<h1>Hello</h1>", &options).await.unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (ELEMENT_W, ELEMENT_H));
        assert!(img.color().has_alpha());
    }

    #[tokio::test]
    async fn diagram_uses_diagram_template() {
        let launcher = FakeLauncher::new(FailAt::Nowhere);
        let engine = DiagramEngine::new(compositor(launcher.clone()), "https://cdn.example/m.mjs");
        let options = RenderOptions {
            width: 400,
            height: 300,
            ..Default::default()
        };

        let png = engine.render("graph TD\n  A-->B", &options).await.unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (400, 300));
        assert!(!img.color().has_alpha());

        let events = launcher.events();
        let load = events.iter().find(|e| e.starts_with("load ")).unwrap();
        assert!(load.contains(r#"<div class="mermaid">"#));
        assert!(load.contains("A--&gt;B"));
    }

    #[tokio::test]
    async fn failures_carry_engine_id() {
        let launcher = FakeLauncher::new(FailAt::Settle);
        let engine = DiagramEngine::new(compositor(launcher), "https://cdn.example/m.mjs");
        let err = engine
            .render("graph TD", &RenderOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::Failure {
                engine: EngineId::Diagram,
                ..
            }
        ));
        assert!(!err.is_client_error());
    }

    #[test]
    fn engines_report_png() {
        let launcher = FakeLauncher::new(FailAt::Nowhere);
        let shared = compositor(launcher);
        let markup = MarkupEngine::new(shared.clone(), "a");
        let diagram = DiagramEngine::new(shared, "b");
        assert_eq!(markup.id(), EngineId::Markup);
        assert_eq!(diagram.id(), EngineId::Diagram);
        assert_eq!(markup.media_type(), "image/png");
        assert_eq!(diagram.media_type(), "image/png");
    }
}
