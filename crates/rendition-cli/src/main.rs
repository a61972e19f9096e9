//! rendition CLI — render service and thin client.
//!
//! ```text
//! rendition serve [--port 8000] [--host 127.0.0.1] [--kokoro-url ...] [--audio-format mp3]
//! rendition render <engine> <input|-> -o <output> [--width ..] [--server http://localhost:8000]
//! rendition engines [--server ...]
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rendition_lib::rendition_core::types::{
    AudioFormat, EngineId, MERMAID_ESM_CDN, RenderOptions, RenderRequest, ServiceConfig,
    TAILWIND_PLAY_CDN,
};

const DEFAULT_SERVER: &str = "http://localhost:8000";

/// rendition — HTML, diagram and narration rendering service
#[derive(Parser)]
#[command(name = "rendition", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP render service
    Serve(ServeArgs),
    /// Render a file through a running server
    Render(RenderArgs),
    /// List engines registered on a running server
    Engines {
        #[arg(long, env = "RENDITION_SERVER", default_value = DEFAULT_SERVER)]
        server: String,
    },
}

#[derive(Args)]
struct ServeArgs {
    /// Listen port
    #[arg(long, env = "RENDITION_PORT", default_value = "8000")]
    port: u16,
    /// Listen host
    #[arg(long, env = "RENDITION_HOST", default_value = "127.0.0.1")]
    host: String,
    /// Kokoro TTS server URL
    #[arg(
        long,
        env = "RENDITION_KOKORO_URL",
        default_value = "http://localhost:8880"
    )]
    kokoro_url: String,
    /// Max concurrent synthesis requests against Kokoro
    #[arg(long, env = "RENDITION_SYNTHESIS_CONCURRENCY", default_value = "2")]
    synthesis_concurrency: usize,
    /// Speech output container: mp3 or wav
    #[arg(long, env = "RENDITION_AUDIO_FORMAT", default_value = "mp3")]
    audio_format: AudioFormat,
    /// MP3 bitrate in kbit/s
    #[arg(long, env = "RENDITION_MP3_BITRATE", default_value = "192")]
    mp3_bitrate_kbps: u32,
    /// ffmpeg binary used for MP3 encoding
    #[arg(long, env = "RENDITION_FFMPEG", default_value = "ffmpeg")]
    ffmpeg_path: PathBuf,
    /// Chrome/Chromium executable (auto-detected when unset)
    #[arg(long, env = "RENDITION_CHROME")]
    chrome_executable: Option<PathBuf>,
    /// DevTools request timeout in ms
    #[arg(long, env = "RENDITION_BROWSER_TIMEOUT_MS", default_value = "30000")]
    browser_timeout_ms: u64,
    /// How long a document may take to become ready, in ms
    #[arg(long, env = "RENDITION_SETTLE_TIMEOUT_MS", default_value = "15000")]
    settle_timeout_ms: u64,
    /// Launch Chromium with --no-sandbox (containers running as root)
    #[arg(long, env = "RENDITION_NO_SANDBOX")]
    no_sandbox: bool,
    /// Utility-class stylesheet script injected into markup documents
    #[arg(
        long,
        env = "RENDITION_STYLE_FRAMEWORK_URL",
        default_value = TAILWIND_PLAY_CDN
    )]
    style_framework_url: String,
    /// Diagram script module URL
    #[arg(
        long,
        env = "RENDITION_DIAGRAM_SCRIPT_URL",
        default_value = MERMAID_ESM_CDN
    )]
    diagram_script_url: String,
}

impl ServeArgs {
    fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            kokoro_url: self.kokoro_url.clone(),
            synthesis_concurrency: self.synthesis_concurrency,
            audio_format: self.audio_format,
            mp3_bitrate_kbps: self.mp3_bitrate_kbps,
            ffmpeg_path: self.ffmpeg_path.clone(),
            chrome_executable: self.chrome_executable.clone(),
            browser_timeout_ms: self.browser_timeout_ms,
            settle_timeout_ms: self.settle_timeout_ms,
            browser_no_sandbox: self.no_sandbox,
            style_framework_url: self.style_framework_url.clone(),
            diagram_script_url: self.diagram_script_url.clone(),
        }
    }
}

#[derive(Args)]
struct RenderArgs {
    /// Engine: markup, diagram or speech
    engine: EngineId,
    /// Source file, or `-` for stdin
    input: String,
    /// Where to write the rendered bytes
    #[arg(short, long)]
    output: PathBuf,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    #[arg(long)]
    scale_factor: Option<f64>,
    /// Transparent background
    #[arg(long)]
    omit_background: bool,
    /// With --omit-background, capture the full viewport instead of cropping
    #[arg(long)]
    no_crop: bool,
    #[arg(long)]
    voice: Option<String>,
    #[arg(long)]
    speed: Option<f32>,
    #[arg(long, env = "RENDITION_SERVER", default_value = DEFAULT_SERVER)]
    server: String,
}

impl RenderArgs {
    fn options(&self) -> RenderOptions {
        let defaults = RenderOptions::default();
        RenderOptions {
            width: self.width.unwrap_or(defaults.width),
            height: self.height.unwrap_or(defaults.height),
            scale_factor: self.scale_factor.unwrap_or(defaults.scale_factor),
            omit_background: self.omit_background,
            tight_crop: !self.no_crop,
            voice: self.voice.clone().unwrap_or(defaults.voice),
            speed: self.speed.unwrap_or(defaults.speed),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rendition_lib=info,rendition_cli=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Render(args) => render(args).await,
        Command::Engines { server } => {
            let resp = reqwest::Client::new()
                .get(format!("{server}/api/v1/engines"))
                .send()
                .await
                .with_context(|| format!("request to {server} failed"))?;
            println!("{}", resp.text().await.unwrap_or_default());
            Ok(())
        }
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let config = args.service_config();
    let service = rendition_lib::bootstrap::build_service(&config);
    let app = rendition_lib::server::router(service);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("rendition listening on {addr}");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

async fn render(args: RenderArgs) -> Result<()> {
    let source = if args.input == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("failed to read stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(&args.input)
            .await
            .with_context(|| format!("failed to read {}", args.input))?
    };

    let request = RenderRequest::new(args.engine, source).with_options(args.options());
    let resp = reqwest::Client::new()
        .post(format!("{}/api/v1/generate", args.server))
        .json(&request)
        .send()
        .await
        .with_context(|| format!("request to {} failed", args.server))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("server returned {status}: {body}");
    }

    let media_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes = resp.bytes().await.context("failed to read response body")?;

    tokio::fs::write(&args.output, &bytes)
        .await
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    println!(
        "{} bytes ({media_type}) → {}",
        bytes.len(),
        args.output.display()
    );
    Ok(())
}
