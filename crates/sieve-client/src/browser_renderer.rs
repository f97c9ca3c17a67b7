use std::path::PathBuf;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use sieve_core::error::AppError;
use sieve_core::models::{PageMetadata, RenderedPage};
use sieve_core::strategy::RenderRequest;
use sieve_core::traits::{Renderer, RendererFactory};
use tokio::task::JoinHandle;

/// Reads the meta tags the extractor falls back on, straight from the live DOM.
const METADATA_SCRIPT: &str = r#"(() => {
  const meta = sel => {
    const el = document.querySelector(sel);
    return el ? el.getAttribute('content') : null;
  };
  return {
    title: document.title || null,
    og_title: meta('meta[property="og:title"]'),
    description: meta('meta[name="description"]'),
    og_description: meta('meta[property="og:description"]'),
  };
})()"#;

/// Headless-Chromium renderer session over the Chrome DevTools Protocol.
///
/// Each session owns its own browser process; [`Renderer::shutdown`] closes
/// it. Every render opens a fresh tab, so strategies never share page state.
pub struct ChromiumRenderer {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromiumRenderer {
    /// Launch a headless Chromium.
    ///
    /// Requires a Chromium / Chrome binary reachable via `$CHROME_BIN`, a
    /// well-known install path, or `chromiumoxide`'s own lookup.
    pub async fn launch() -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder().no_sandbox().disable_default_args();

        if let Some(bin) = find_chrome_binary() {
            tracing::debug!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        let config = builder
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--no-first-run")
            .build()
            .map_err(|e| AppError::ConfigError(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::RenderError(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        Ok(Self { browser, handler })
    }

    async fn render_in(&self, page: &Page, request: &RenderRequest) -> Result<RenderedPage, AppError> {
        let url = &request.load_url;

        page.goto(url.as_str())
            .await
            .map_err(|e| AppError::RenderError(format!("Failed to navigate to {url}: {e}")))?;
        let _ = page.wait_for_navigation().await;

        if let Some(script) = &request.script {
            let clicked: bool = page
                .evaluate(script.as_str())
                .await
                .map_err(|e| AppError::RenderError(format!("Page script failed: {e}")))?
                .into_value()
                .unwrap_or(false);

            if clicked {
                tracing::debug!(target_url = %request.target_url, "Followed in-page link");
            } else {
                tracing::warn!(
                    target_url = %request.target_url,
                    "No link to target found on home page"
                );
            }
        }

        tokio::time::sleep(request.render_delay).await;

        let html = page
            .content()
            .await
            .map_err(|e| AppError::RenderError(format!("Failed to read page content: {e}")))?;

        let metadata = match page.evaluate(METADATA_SCRIPT).await {
            Ok(result) => result.into_value::<PageMetadata>().unwrap_or_default(),
            Err(e) => {
                tracing::debug!(error = %e, "Could not read page metadata");
                PageMetadata::default()
            }
        };

        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.clone());

        Ok(RenderedPage::new(final_url, html).with_metadata(metadata))
    }
}

impl Renderer for ChromiumRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<RenderedPage, AppError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| AppError::RenderError(format!("Failed to open tab: {e}")))?;

        let result =
            match tokio::time::timeout(request.page_timeout, self.render_in(&page, request)).await
            {
                Ok(inner) => inner,
                Err(_) => Err(AppError::Timeout(request.page_timeout.as_secs())),
            };

        // Close the tab to free browser resources.
        let _ = page.close().await;
        result
    }

    async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!(error = %e, "Failed to close browser");
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
    }
}

/// Launches one browser per job.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromiumRendererFactory;

impl RendererFactory for ChromiumRendererFactory {
    type Renderer = ChromiumRenderer;

    async fn create(&self) -> Result<ChromiumRenderer, AppError> {
        ChromiumRenderer::launch().await
    }
}

/// Tries to locate the real Chrome/Chromium binary.
///
/// The snap wrapper at `/snap/bin/chromium` strips unknown CLI flags, so the
/// real binary inside the snap is preferred. `None` lets `chromiumoxide` do
/// its own lookup.
fn find_chrome_binary() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("CHROME_BIN") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    [
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
    ]
    .iter()
    .map(PathBuf::from)
    .find(|p| p.exists())
}
