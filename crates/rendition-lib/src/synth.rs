//! Speech synthesis port.

use async_trait::async_trait;

use crate::error::SynthesisError;

/// Turns one line of text into audio.
///
/// Output is a sequence of chunks of mono float samples in [-1.0, 1.0] at
/// [`rendition_core::pcm::SPEECH_SAMPLE_RATE`]. An empty sequence is valid
/// and means the line produced no audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        line: &str,
        voice: &str,
        speed: f32,
    ) -> Result<Vec<Vec<f32>>, SynthesisError>;
}
