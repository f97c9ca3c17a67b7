use reqwest::Client;
use sieve_core::error::AppError;
use sieve_core::models::RenderedPage;
use sieve_core::strategy::RenderRequest;
use sieve_core::traits::{Renderer, RendererFactory};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; sieve/0.1; content extractor)";

/// Plain-HTTP renderer using reqwest.
///
/// Returns the server's markup as-is: no JavaScript runs, so render delays
/// are ignored and in-page navigation scripts are refused. Good enough for
/// static pages and for environments without a Chromium binary.
#[derive(Clone)]
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new() -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self { client })
    }
}

impl Renderer for HttpRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<RenderedPage, AppError> {
        if request.script.is_some() {
            return Err(AppError::RenderError(format!(
                "{} needs a browser renderer",
                request.strategy
            )));
        }

        let url = &request.load_url;
        let timeout_secs = request.page_timeout.as_secs();

        let response = self
            .client
            .get(url)
            .timeout(request.page_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(timeout_secs)
                } else if e.is_connect() {
                    AppError::NetworkError(format!("Connection failed: {e}"))
                } else {
                    AppError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))?;

        tracing::debug!(%url, bytes = html.len(), "Fetched page over HTTP");
        Ok(RenderedPage::new(final_url, html))
    }

    async fn shutdown(self) {}
}

/// Hands out clones of one shared HTTP client.
#[derive(Clone)]
pub struct HttpRendererFactory {
    renderer: HttpRenderer,
}

impl HttpRendererFactory {
    pub fn new() -> Result<Self, AppError> {
        Ok(Self {
            renderer: HttpRenderer::new()?,
        })
    }
}

impl RendererFactory for HttpRendererFactory {
    type Renderer = HttpRenderer;

    async fn create(&self) -> Result<HttpRenderer, AppError> {
        Ok(self.renderer.clone())
    }
}
