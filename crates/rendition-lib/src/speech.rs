//! Speech engine — narration text → encoded audio.
//!
//! ```text
//! source ──► narration_lines ──► synthesize each line (concurrently, ordered)
//!        ──► f32 chunks → i16 segment per line
//!        ──► segment ⊕ 500 ms silence ⊕ segment ⊕ … ──► encoder
//! ```
//!
//! Silence goes between spoken segments only. A line that yields no samples
//! contributes neither audio nor a gap. Any synthesis failure fails the
//! whole request.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use tracing::debug;

use rendition_core::pcm::{INTER_SEGMENT_SILENCE_MS, SPEECH_SAMPLE_RATE, Waveform};
use rendition_core::text_prep::narration_lines;
use rendition_core::types::{EngineId, RenderOptions};

use crate::encoder::AudioEncoder;
use crate::engine::RenderingEngine;
use crate::error::{RenderError, SynthesisError};
use crate::synth::SpeechSynthesizer;

/// Joins per-line synthesis output into one waveform.
pub struct SpeechAssembler {
    synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl SpeechAssembler {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self { synthesizer }
    }

    pub async fn assemble(
        &self,
        lines: &[String],
        voice: &str,
        speed: f32,
    ) -> Result<Waveform, SynthesisError> {
        let synthesized = try_join_all(
            lines
                .iter()
                .map(|line| self.synthesizer.synthesize(line, voice, speed)),
        )
        .await?;

        let gap = Waveform::silence(INTER_SEGMENT_SILENCE_MS, SPEECH_SAMPLE_RATE);
        let mut out = Waveform::empty(SPEECH_SAMPLE_RATE);

        for (i, chunks) in synthesized.into_iter().enumerate() {
            let flat: Vec<f32> = chunks.into_iter().flatten().collect();
            if flat.is_empty() {
                debug!("speech: line {i} produced no audio");
                continue;
            }
            if !out.is_empty() {
                out.append(&gap);
            }
            out.append(&Waveform::from_normalized(&flat, SPEECH_SAMPLE_RATE));
        }

        Ok(out)
    }
}

pub struct SpeechEngine {
    assembler: SpeechAssembler,
    encoder: Arc<dyn AudioEncoder>,
}

impl SpeechEngine {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, encoder: Arc<dyn AudioEncoder>) -> Self {
        Self {
            assembler: SpeechAssembler::new(synthesizer),
            encoder,
        }
    }
}

#[async_trait]
impl RenderingEngine for SpeechEngine {
    fn id(&self) -> EngineId {
        EngineId::Speech
    }

    fn media_type(&self) -> &'static str {
        self.encoder.media_type()
    }

    async fn render(
        &self,
        source_text: &str,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, RenderError> {
        let lines = narration_lines(source_text);
        debug!(
            "speech: {} lines voice={} speed={}",
            lines.len(),
            options.voice,
            options.speed
        );

        let waveform = self
            .assembler
            .assemble(&lines, &options.voice, options.speed)
            .await
            .map_err(|e| RenderError::failure(EngineId::Speech, e))?;

        debug!(
            "speech: assembled {} samples ({} ms)",
            waveform.len(),
            waveform.duration().as_millis()
        );

        self.encoder
            .encode(&waveform)
            .await
            .map_err(|e| RenderError::failure(EngineId::Speech, e))
    }
}
