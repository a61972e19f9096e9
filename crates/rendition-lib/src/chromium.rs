//! Headless Chromium surfaces via the DevTools protocol.
//!
//! Every [`ChromiumLauncher::acquire`] launches a dedicated browser process
//! with its own throwaway profile directory, so no document, script, or
//! cookie state survives from one render to the next.
//!
//! Settling: a surface counts as ready once the readiness check is true *and*
//! no network request has been in flight for [`NETWORK_QUIET`]. Requests are
//! tracked from CDP `Network` events, so anything fetched after `load`
//! (author `fetch()` calls, lazy images, injected stylesheets) is waited for.
//!
//! Release:
//!
//! - `close()` closes the page and browser, waits for the process, aborts the
//!   CDP tasks and removes the profile directory.
//! - If a surface is dropped without `close()` (panic, cancelled future), the
//!   tasks are aborted in `Drop`, chromiumoxide kills the child process when
//!   the `Browser` is dropped, and the profile directory is removed in the
//!   background once the process lets go of it.

use std::collections::HashSet;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, Viewport as ClipRect};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures_util::{StreamExt, stream};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use rendition_core::types::ServiceConfig;

use crate::error::SurfaceError;
use crate::surface::{RenderSurface, SurfaceLauncher, Viewport};

/// Interval between readiness check evaluations.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long the page must go without in-flight requests to count as settled.
pub const NETWORK_QUIET: Duration = Duration::from_millis(500);

const PROFILE_CLEANUP_ATTEMPTS: u32 = 10;
const PROFILE_CLEANUP_INTERVAL: Duration = Duration::from_millis(100);

pub struct ChromiumLauncher {
    executable: Option<PathBuf>,
    request_timeout: Duration,
    no_sandbox: bool,
    profile_root: PathBuf,
    next_profile: AtomicU64,
}

impl ChromiumLauncher {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            executable: config.chrome_executable.clone(),
            request_timeout: Duration::from_millis(config.browser_timeout_ms),
            no_sandbox: config.browser_no_sandbox,
            profile_root: std::env::temp_dir(),
            next_profile: AtomicU64::new(0),
        }
    }

    fn profile_dir(&self) -> PathBuf {
        let n = self.next_profile.fetch_add(1, Ordering::Relaxed);
        self.profile_root
            .join(format!("rendition-surface-{}-{n}", std::process::id()))
    }
}

#[async_trait]
impl SurfaceLauncher for ChromiumLauncher {
    async fn acquire(&self, viewport: Viewport) -> Result<Box<dyn RenderSurface>, SurfaceError> {
        let profile = self.profile_dir();

        let mut builder = BrowserConfig::builder()
            .request_timeout(self.request_timeout)
            .window_size(viewport.width, viewport.height)
            .user_data_dir(&profile)
            .arg("--hide-scrollbars");
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        if self.no_sandbox {
            builder = builder.no_sandbox();
        }
        let config = builder.build().map_err(SurfaceError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SurfaceError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        debug!(
            "chromium: launched surface {}x{}@{} ({})",
            viewport.width,
            viewport.height,
            viewport.device_scale_factor,
            profile.display()
        );

        let mut surface = ChromiumSurface {
            browser,
            page: None,
            handler_task: Some(handler_task),
            network: Arc::new(Mutex::new(NetworkActivity::new(Instant::now()))),
            network_task: None,
            profile,
            closed: false,
        };

        if let Err(e) = surface.open_page(viewport).await {
            if let Err(close_err) = surface.close().await {
                warn!("chromium: close after failed page setup: {close_err}");
            }
            return Err(e);
        }

        Ok(Box::new(surface))
    }
}

struct ChromiumSurface {
    browser: Browser,
    page: Option<Page>,
    handler_task: Option<JoinHandle<()>>,
    network: Arc<Mutex<NetworkActivity>>,
    network_task: Option<JoinHandle<()>>,
    profile: PathBuf,
    closed: bool,
}

/// Requests in flight on a page, fed by CDP network events.
#[derive(Debug)]
struct NetworkActivity {
    in_flight: HashSet<String>,
    last_change: Instant,
}

impl NetworkActivity {
    fn new(now: Instant) -> Self {
        Self {
            in_flight: HashSet::new(),
            last_change: now,
        }
    }

    fn started(&mut self, request_id: String, now: Instant) {
        self.in_flight.insert(request_id);
        self.last_change = now;
    }

    fn finished(&mut self, request_id: &str, now: Instant) {
        if self.in_flight.remove(request_id) {
            self.last_change = now;
        }
    }

    fn is_idle(&self, now: Instant, quiet: Duration) -> bool {
        self.in_flight.is_empty() && now.saturating_duration_since(self.last_change) >= quiet
    }
}

enum NetworkEvent {
    Started(String),
    Done(String),
}

#[derive(Debug, Deserialize)]
struct ElementRect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl ChromiumSurface {
    async fn open_page(&mut self, viewport: Viewport) -> Result<(), SurfaceError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| SurfaceError::Launch(e.to_string()))?;

        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(viewport.width),
            i64::from(viewport.height),
            viewport.device_scale_factor,
            false,
        ))
        .await
        .map_err(|e| SurfaceError::Launch(e.to_string()))?;

        self.track_network(&page).await?;
        self.page = Some(page);
        Ok(())
    }

    async fn track_network(&mut self, page: &Page) -> Result<(), SurfaceError> {
        let launch_err = |e: chromiumoxide::error::CdpError| SurfaceError::Launch(e.to_string());

        let started = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(launch_err)?
            .map(|e| NetworkEvent::Started(e.request_id.inner().clone()));
        let finished = page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(launch_err)?
            .map(|e| NetworkEvent::Done(e.request_id.inner().clone()));
        let failed = page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(launch_err)?
            .map(|e| NetworkEvent::Done(e.request_id.inner().clone()));
        page.execute(EnableParams::default())
            .await
            .map_err(launch_err)?;

        let activity = self.network.clone();
        let mut events = Box::pin(stream::select(started, stream::select(finished, failed)));
        self.network_task = Some(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let mut activity = activity.lock().unwrap_or_else(|p| p.into_inner());
                match event {
                    NetworkEvent::Started(id) => activity.started(id, Instant::now()),
                    NetworkEvent::Done(id) => activity.finished(&id, Instant::now()),
                }
            }
        }));
        Ok(())
    }

    fn network_idle(&self) -> bool {
        self.network
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .is_idle(Instant::now(), NETWORK_QUIET)
    }

    fn abort_tasks(&mut self) {
        for task in [self.handler_task.take(), self.network_task.take()]
            .into_iter()
            .flatten()
        {
            task.abort();
        }
    }

    fn page(&self) -> Result<&Page, SurfaceError> {
        self.page
            .as_ref()
            .ok_or_else(|| SurfaceError::Load("surface has no open page".into()))
    }
}

#[async_trait]
impl RenderSurface for ChromiumSurface {
    async fn load(&mut self, html: &str) -> Result<(), SurfaceError> {
        self.page()?
            .set_content(html)
            .await
            .map_err(|e| SurfaceError::Load(e.to_string()))?;
        Ok(())
    }

    async fn wait_until(
        &mut self,
        condition: &str,
        timeout: Duration,
    ) -> Result<(), SurfaceError> {
        let page = self.page()?;
        let deadline = Instant::now() + timeout;

        loop {
            // Evaluation can fail transiently while the document is being
            // replaced; keep polling until the deadline.
            match page.evaluate(condition).await {
                Ok(result) => {
                    if result.into_value::<bool>().unwrap_or(false) && self.network_idle() {
                        return Ok(());
                    }
                }
                Err(e) => debug!("chromium: readiness check failed: {e}"),
            }

            if Instant::now() >= deadline {
                return Err(SurfaceError::SettleTimeout(timeout.as_millis() as u64));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn read_string(&mut self, expr: &str) -> Result<Option<String>, SurfaceError> {
        let value: Option<String> = self
            .page()?
            .evaluate(expr)
            .await
            .map_err(|e| SurfaceError::Load(e.to_string()))?
            .into_value()
            .unwrap_or(None);
        Ok(value)
    }

    async fn capture_viewport(&mut self, transparent: bool) -> Result<Vec<u8>, SurfaceError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .omit_background(transparent)
            .build();

        self.page()?
            .screenshot(params)
            .await
            .map_err(|e| SurfaceError::Capture(e.to_string()))
    }

    async fn capture_element(
        &mut self,
        selector: &str,
        transparent: bool,
    ) -> Result<Option<Vec<u8>>, SurfaceError> {
        let page = self.page()?;

        let quoted = serde_json::to_string(selector)
            .map_err(|e| SurfaceError::Capture(e.to_string()))?;
        let expr = format!(
            "(() => {{ \
                const el = document.querySelector({quoted}); \
                if (!el) return null; \
                const r = el.getBoundingClientRect(); \
                return {{ x: r.left + window.scrollX, y: r.top + window.scrollY, \
                          width: r.width, height: r.height }}; \
            }})()"
        );

        let rect: Option<ElementRect> = page
            .evaluate(expr)
            .await
            .map_err(|e| SurfaceError::Capture(e.to_string()))?
            .into_value()
            .map_err(|e| SurfaceError::Capture(e.to_string()))?;

        let rect = rect.ok_or_else(|| SurfaceError::MissingElement(selector.to_string()))?;
        if rect.width <= 0.0 || rect.height <= 0.0 {
            debug!("chromium: element '{selector}' has an empty box");
            return Ok(None);
        }

        debug!(
            "chromium: element '{selector}' box {}x{} at ({}, {})",
            rect.width, rect.height, rect.x, rect.y
        );

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .omit_background(transparent)
            .clip(ClipRect {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
                scale: 1.0,
            })
            .build();

        page.screenshot(params)
            .await
            .map(Some)
            .map_err(|e| SurfaceError::Capture(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), SurfaceError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                debug!("chromium: page close failed: {e}");
            }
        }

        let result = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| SurfaceError::Launch(format!("browser close failed: {e}")));

        if let Err(e) = self.browser.wait().await {
            debug!("chromium: wait for browser exit failed: {e}");
        }
        self.abort_tasks();
        remove_profile(self.profile.clone()).await;

        result
    }
}

impl Drop for ChromiumSurface {
    fn drop(&mut self) {
        self.abort_tasks();
        if self.closed {
            return;
        }

        warn!("chromium: surface dropped without close; browser will be killed");
        // The browser is killed when the `browser` field drops, after this
        // body runs; the cleanup task retries until the profile is released.
        let profile = self.profile.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(remove_profile(profile));
            }
            Err(_) => {
                if let Err(e) = std::fs::remove_dir_all(&profile) {
                    debug!("chromium: profile cleanup {}: {e}", profile.display());
                }
            }
        }
    }
}

/// Remove a surface profile directory, retrying while the browser process
/// still holds files in it.
async fn remove_profile(path: PathBuf) {
    for attempt in 1..=PROFILE_CLEANUP_ATTEMPTS {
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => return,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return,
            Err(e) if attempt == PROFILE_CLEANUP_ATTEMPTS => {
                debug!("chromium: profile cleanup {}: {e}", path.display());
            }
            Err(_) => tokio::time::sleep(PROFILE_CLEANUP_INTERVAL).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_requires_no_requests_and_quiet_window() {
        let t0 = Instant::now();
        let mut activity = NetworkActivity::new(t0);
        assert!(!activity.is_idle(t0, NETWORK_QUIET));
        assert!(activity.is_idle(t0 + NETWORK_QUIET, NETWORK_QUIET));

        activity.started("1".into(), t0 + Duration::from_millis(600));
        assert!(!activity.is_idle(t0 + Duration::from_secs(5), NETWORK_QUIET));

        activity.finished("1", t0 + Duration::from_millis(900));
        assert!(!activity.is_idle(t0 + Duration::from_millis(1200), NETWORK_QUIET));
        assert!(activity.is_idle(t0 + Duration::from_millis(1400), NETWORK_QUIET));
    }

    #[test]
    fn late_request_resets_the_window() {
        let t0 = Instant::now();
        let mut activity = NetworkActivity::new(t0);
        activity.started("doc".into(), t0);
        activity.finished("doc", t0 + Duration::from_millis(100));
        // A fetch() issued after load keeps the page busy.
        activity.started("fetch".into(), t0 + Duration::from_millis(550));
        assert!(!activity.is_idle(t0 + Duration::from_millis(700), NETWORK_QUIET));
        activity.finished("fetch", t0 + Duration::from_millis(800));
        assert!(!activity.is_idle(t0 + Duration::from_millis(1000), NETWORK_QUIET));
        assert!(activity.is_idle(t0 + Duration::from_millis(1300), NETWORK_QUIET));
    }

    #[test]
    fn redirects_and_unknown_ids_are_tolerated() {
        let t0 = Instant::now();
        let mut activity = NetworkActivity::new(t0);
        activity.started("r".into(), t0);
        activity.started("r".into(), t0 + Duration::from_millis(10));
        activity.finished("r", t0 + Duration::from_millis(20));
        activity.finished("never-started", t0 + Duration::from_millis(400));
        assert!(activity.is_idle(t0 + Duration::from_millis(520), NETWORK_QUIET));
    }

    #[tokio::test]
    async fn remove_profile_deletes_tree() {
        let dir = std::env::temp_dir().join(format!(
            "rendition-surface-test-{}-{}",
            std::process::id(),
            line!()
        ));
        std::fs::create_dir_all(dir.join("Default")).unwrap();
        std::fs::write(dir.join("Default").join("Preferences"), b"{}").unwrap();

        remove_profile(dir.clone()).await;
        assert!(!dir.exists());

        // Already gone is fine.
        remove_profile(dir.clone()).await;
    }
}
