//! Startup wiring: config → adapters → engines → registry → service.
//!
//! Nothing here touches the network or spawns a process; browsers and
//! encoder processes are started per request.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use rendition_core::types::{AudioFormat, EngineId, ServiceConfig};

use crate::chromium::ChromiumLauncher;
use crate::compositor::VisualCompositor;
use crate::encoder::{AudioEncoder, Mp3Encoder, WavEncoder};
use crate::kokoro::KokoroClient;
use crate::registry::EngineRegistry;
use crate::service::GenerationService;
use crate::speech::SpeechEngine;
use crate::surface::SurfaceLauncher;
use crate::synth::SpeechSynthesizer;
use crate::visual::{DiagramEngine, MarkupEngine};

/// Registry with all three engines over caller-supplied adapters.
pub fn registry_with(
    config: &ServiceConfig,
    launcher: Arc<dyn SurfaceLauncher>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    encoder: Arc<dyn AudioEncoder>,
) -> EngineRegistry {
    let compositor = Arc::new(VisualCompositor::new(
        launcher,
        Duration::from_millis(config.settle_timeout_ms),
    ));

    let markup = MarkupEngine::new(compositor.clone(), config.style_framework_url.clone());
    let diagram = DiagramEngine::new(compositor, config.diagram_script_url.clone());
    let speech = SpeechEngine::new(synthesizer, encoder);

    let mut registry = EngineRegistry::new();
    registry.register(EngineId::Markup, Arc::new(markup));
    registry.register(EngineId::Diagram, Arc::new(diagram));
    registry.register(EngineId::Speech, Arc::new(speech));
    registry
}

/// Registry backed by headless Chromium, Kokoro and the configured encoder.
pub fn build_registry(config: &ServiceConfig) -> EngineRegistry {
    let encoder: Arc<dyn AudioEncoder> = match config.audio_format {
        AudioFormat::Mp3 => Arc::new(Mp3Encoder::new(
            config.ffmpeg_path.clone(),
            config.mp3_bitrate_kbps,
        )),
        AudioFormat::Wav => Arc::new(WavEncoder),
    };

    let kokoro = KokoroClient::new(&config.kokoro_url, config.synthesis_concurrency);

    info!(
        "bootstrap: kokoro={} concurrency={} audio={} settle={}ms",
        kokoro.endpoint(),
        config.synthesis_concurrency,
        encoder.media_type(),
        config.settle_timeout_ms
    );

    let launcher = Arc::new(ChromiumLauncher::new(config));
    registry_with(config, launcher, Arc::new(kokoro), encoder)
}

pub fn build_service(config: &ServiceConfig) -> Arc<GenerationService> {
    Arc::new(GenerationService::new(build_registry(config)))
}
