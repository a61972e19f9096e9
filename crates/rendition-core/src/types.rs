//! Shared types for the rendition render service.
//!
//! These types are used across rendition-lib, rendition-cli, and HTTP
//! clients. Keeping them in rendition-core means consumers can depend on the
//! request model without pulling in tokio, chromiumoxide, or other heavy deps.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ─── Engines ───────────────────────────────────────────────────────────────

/// Selects which engine handles a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineId {
    /// HTML/CSS fragment → PNG.
    #[serde(alias = "html")]
    Markup,
    /// Mermaid diagram source → PNG.
    #[serde(alias = "mermaid")]
    Diagram,
    /// Narration script → compressed audio.
    #[serde(alias = "kokoro")]
    Speech,
}

impl EngineId {
    pub const ALL: [EngineId; 3] = [EngineId::Markup, EngineId::Diagram, EngineId::Speech];

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineId::Markup => "markup",
            EngineId::Diagram => "diagram",
            EngineId::Speech => "speech",
        }
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markup" | "html" => Ok(EngineId::Markup),
            "diagram" | "mermaid" => Ok(EngineId::Diagram),
            "speech" | "kokoro" => Ok(EngineId::Speech),
            other => Err(format!(
                "unknown engine '{other}'; expected one of: markup, diagram, speech"
            )),
        }
    }
}

// ─── Request model ─────────────────────────────────────────────────────────

pub const DEFAULT_WIDTH: u32 = 1024;
pub const DEFAULT_HEIGHT: u32 = 768;
pub const DEFAULT_VOICE: &str = "af_heart";

/// Per-request rendering parameters. Every field is optional on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    /// Physical pixels per CSS pixel.
    pub scale_factor: f64,
    pub omit_background: bool,
    /// Only meaningful when `omit_background` is set.
    pub tight_crop: bool,
    /// Speech engine only.
    pub voice: String,
    /// Speech engine only.
    pub speed: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            scale_factor: 1.0,
            omit_background: false,
            tight_crop: true,
            voice: DEFAULT_VOICE.into(),
            speed: 1.0,
        }
    }
}

/// One unit of work for the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    #[serde(rename = "engine_type", alias = "engine")]
    pub engine: EngineId,
    /// Markup, diagram DSL, or narration script depending on the engine.
    #[serde(rename = "source_code", alias = "source_text")]
    pub source_text: String,
    #[serde(default)]
    pub options: RenderOptions,
}

impl RenderRequest {
    pub fn new(engine: EngineId, source_text: impl Into<String>) -> Self {
        Self {
            engine,
            source_text: source_text.into(),
            options: RenderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }
}

// ─── Service configuration ─────────────────────────────────────────────────

/// Output container for the speech engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Wav,
}

impl FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "wav" => Ok(AudioFormat::Wav),
            other => Err(format!("unknown audio format '{other}'; expected mp3 or wav")),
        }
    }
}

pub const TAILWIND_PLAY_CDN: &str = "https://cdn.tailwindcss.com";
pub const MERMAID_ESM_CDN: &str =
    "https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.esm.min.mjs";

/// Process-level configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub kokoro_url: String,
    /// Upper bound on in-flight synthesis calls against the shared backend.
    pub synthesis_concurrency: usize,
    pub audio_format: AudioFormat,
    pub mp3_bitrate_kbps: u32,
    pub ffmpeg_path: PathBuf,
    /// `None` lets chromiumoxide locate an installed Chrome/Chromium.
    pub chrome_executable: Option<PathBuf>,
    pub browser_timeout_ms: u64,
    pub settle_timeout_ms: u64,
    pub browser_no_sandbox: bool,
    pub style_framework_url: String,
    pub diagram_script_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            kokoro_url: "http://localhost:8880".into(),
            synthesis_concurrency: 2,
            audio_format: AudioFormat::Mp3,
            mp3_bitrate_kbps: 192,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            chrome_executable: None,
            browser_timeout_ms: 30_000,
            settle_timeout_ms: 15_000,
            browser_no_sandbox: false,
            style_framework_url: TAILWIND_PLAY_CDN.into(),
            diagram_script_url: MERMAID_ESM_CDN.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_default_from_empty_object() {
        let opts: RenderOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, RenderOptions::default());
        assert_eq!(opts.width, 1024);
        assert_eq!(opts.height, 768);
        assert!(opts.tight_crop);
        assert!(!opts.omit_background);
        assert_eq!(opts.voice, "af_heart");
    }

    #[test]
    fn options_partial_override() {
        let opts: RenderOptions =
            serde_json::from_str(r#"{"width": 500, "height": 300, "omit_background": true}"#)
                .unwrap();
        assert_eq!(opts.width, 500);
        assert_eq!(opts.height, 300);
        assert!(opts.omit_background);
        assert!(opts.tight_crop);
        assert_eq!(opts.scale_factor, 1.0);
    }

    #[test]
    fn request_accepts_legacy_engine_names() {
        let req: RenderRequest =
            serde_json::from_str(r#"{"engine_type": "html", "source_code": "<h1>Hi</h1>"}"#)
                .unwrap();
        assert_eq!(req.engine, EngineId::Markup);
        assert_eq!(req.options, RenderOptions::default());

        let req: RenderRequest =
            serde_json::from_str(r#"{"engine_type": "mermaid", "source_code": "graph TD"}"#)
                .unwrap();
        assert_eq!(req.engine, EngineId::Diagram);

        let req: RenderRequest =
            serde_json::from_str(r#"{"engine": "kokoro", "source_text": "Hi."}"#).unwrap();
        assert_eq!(req.engine, EngineId::Speech);
        assert_eq!(req.source_text, "Hi.");
    }

    #[test]
    fn request_rejects_unknown_engine() {
        let res: Result<RenderRequest, _> =
            serde_json::from_str(r#"{"engine_type": "ai", "source_code": "x"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn engine_id_round_trips_through_str() {
        for id in EngineId::ALL {
            assert_eq!(id.to_string().parse::<EngineId>().unwrap(), id);
        }
        assert_eq!("HTML".parse::<EngineId>().unwrap(), EngineId::Markup);
        assert!("video".parse::<EngineId>().is_err());
    }

    #[test]
    fn engine_id_serializes_canonical_name() {
        assert_eq!(
            serde_json::to_string(&EngineId::Diagram).unwrap(),
            "\"diagram\""
        );
    }

    #[test]
    fn audio_format_parse() {
        assert_eq!("MP3".parse::<AudioFormat>().unwrap(), AudioFormat::Mp3);
        assert_eq!("wav".parse::<AudioFormat>().unwrap(), AudioFormat::Wav);
        assert!("ogg".parse::<AudioFormat>().is_err());
    }

    #[test]
    fn service_config_defaults() {
        let cfg = ServiceConfig::default();
        assert_eq!(cfg.mp3_bitrate_kbps, 192);
        assert_eq!(cfg.browser_timeout_ms, 30_000);
        assert_eq!(cfg.audio_format, AudioFormat::Mp3);
        assert!(cfg.chrome_executable.is_none());
    }
}
