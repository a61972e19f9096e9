//! Waveform → container bytes.
//!
//! MP3 goes through a system `ffmpeg` process (WAV on stdin, MP3 on stdout),
//! which avoids linking a native LAME build. WAV is written in-process.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use rendition_core::pcm::Waveform;
use rendition_core::wav::waveform_to_wav;

use crate::error::EncodeError;

#[async_trait]
pub trait AudioEncoder: Send + Sync {
    fn media_type(&self) -> &'static str;

    /// Encode `waveform`. An empty waveform still yields a well-formed,
    /// zero-length file for the format.
    async fn encode(&self, waveform: &Waveform) -> Result<Vec<u8>, EncodeError>;
}

/// MP3 via `ffmpeg -f wav -i pipe:0 -f mp3 pipe:1`.
pub struct Mp3Encoder {
    program: PathBuf,
    bitrate_kbps: u32,
}

impl Mp3Encoder {
    pub fn new(program: impl Into<PathBuf>, bitrate_kbps: u32) -> Self {
        Self {
            program: program.into(),
            bitrate_kbps,
        }
    }

    fn args(&self) -> Vec<String> {
        [
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "wav",
            "-i",
            "pipe:0",
            "-f",
            "mp3",
            "-b:a",
        ]
        .into_iter()
        .map(String::from)
        .chain([format!("{}k", self.bitrate_kbps), "pipe:1".to_string()])
        .collect()
    }
}

#[async_trait]
impl AudioEncoder for Mp3Encoder {
    fn media_type(&self) -> &'static str {
        "audio/mpeg"
    }

    async fn encode(&self, waveform: &Waveform) -> Result<Vec<u8>, EncodeError> {
        // A header-only WAV comes back as a tagged stream with zero frames.
        let wav = waveform_to_wav(waveform);
        let program = self.program.display().to_string();

        let mut child = Command::new(&self.program)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EncodeError::Spawn {
                program: program.clone(),
                source,
            })?;

        // Feed stdin concurrently with draining stdout so neither pipe can
        // fill up and stall the child.
        let mut stdin = child.stdin.take().ok_or_else(|| {
            EncodeError::Io(std::io::Error::other("encoder stdin was not captured"))
        })?;
        let writer = tokio::spawn(async move {
            stdin.write_all(&wav).await?;
            stdin.shutdown().await
        });

        let output = child.wait_with_output().await?;
        let written = writer
            .await
            .map_err(|e| EncodeError::Io(std::io::Error::other(e)))?;

        if !output.status.success() {
            return Err(EncodeError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        written?;

        debug!(
            "encoder: {program} {} samples → {} bytes mp3",
            waveform.len(),
            output.stdout.len()
        );
        Ok(output.stdout)
    }
}

/// 16-bit PCM WAV, mono.
#[derive(Debug, Default, Clone, Copy)]
pub struct WavEncoder;

#[async_trait]
impl AudioEncoder for WavEncoder {
    fn media_type(&self) -> &'static str {
        "audio/wav"
    }

    async fn encode(&self, waveform: &Waveform) -> Result<Vec<u8>, EncodeError> {
        Ok(waveform_to_wav(waveform))
    }
}
