//! Kokoro HTTP synthesizer.
//!
//! Talks to a Kokoro-FastAPI style server:
//!
//! ```text
//! POST {kokoro_url}/v1/audio/speech
//!   { input, voice, model: "kokoro", response_format: "pcm", stream: true, speed }
//! ← chunked body of 16-bit little-endian mono PCM @ 24 kHz
//! ```
//!
//! Each network chunk becomes one float chunk. An odd trailing byte is
//! carried into the next network chunk.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::Semaphore;
use tracing::debug;

use rendition_core::pcm::i16_to_f32;

use crate::error::SynthesisError;
use crate::synth::SpeechSynthesizer;

pub struct KokoroClient {
    client: reqwest::Client,
    url: String,
    permits: Arc<Semaphore>,
}

impl KokoroClient {
    /// `concurrency` bounds the number of in-flight synthesis requests.
    pub fn new(kokoro_url: &str, concurrency: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/v1/audio/speech", kokoro_url.trim_end_matches('/')),
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SpeechSynthesizer for KokoroClient {
    async fn synthesize(
        &self,
        line: &str,
        voice: &str,
        speed: f32,
    ) -> Result<Vec<Vec<f32>>, SynthesisError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| SynthesisError::Request(e.to_string()))?;

        let body = serde_json::json!({
            "input": line,
            "voice": voice,
            "model": "kokoro",
            "response_format": "pcm",
            "stream": true,
            "speed": speed,
        });

        debug!("kokoro: POST {} bytes voice={voice}", line.len());

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SynthesisError::Request(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(SynthesisError::Backend { status, body });
        }

        let mut stream = resp.bytes_stream();
        let mut leftover: Option<u8> = None;
        let mut chunks = Vec::new();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| SynthesisError::Stream(e.to_string()))?;
            let (samples, lo) = bytes_to_i16(&chunk, leftover.take());
            leftover = lo;
            if !samples.is_empty() {
                chunks.push(i16_to_f32(&samples));
            }
        }

        if leftover.is_some() {
            debug!("kokoro: dropped odd trailing byte");
        }
        debug!("kokoro: received {} chunks", chunks.len());

        Ok(chunks)
    }
}

/// Convert raw bytes to i16 PCM samples (little-endian).
fn bytes_to_i16(bytes: &[u8], leftover: Option<u8>) -> (Vec<i16>, Option<u8>) {
    let mut data: Vec<u8>;
    let slice = if let Some(lo) = leftover {
        data = Vec::with_capacity(1 + bytes.len());
        data.push(lo);
        data.extend_from_slice(bytes);
        &data[..]
    } else {
        bytes
    };

    let mut samples = Vec::with_capacity(slice.len() / 2);
    for pair in slice.chunks_exact(2) {
        samples.push(i16::from_le_bytes([pair[0], pair[1]]));
    }

    let remainder = if slice.len() % 2 == 1 {
        Some(slice[slice.len() - 1])
    } else {
        None
    };

    (samples, remainder)
}
