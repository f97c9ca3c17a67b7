pub mod extractor;
pub mod http_renderer;

#[cfg(feature = "browser")]
pub mod browser_renderer;

pub use extractor::ScraperExtractor;
pub use http_renderer::{HttpRenderer, HttpRendererFactory};

#[cfg(feature = "browser")]
pub use browser_renderer::{ChromiumRenderer, ChromiumRendererFactory};
