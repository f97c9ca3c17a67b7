//! Rendering strategies and the per-attempt render plan.
//!
//! Strategies are tried in a fixed order by the engine. Each one maps to a
//! [`RenderRequest`] telling the renderer which URL to load, how long to
//! wait, and (for navigation) which in-page script to run.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::{Position, Url};

/// A named rendering policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Load the target, short render delay. Static / server-rendered pages.
    Direct,
    /// Load the target, longer delay so client-side JS can render.
    SpaWithDelay,
    /// Load the site root and click through to the target path.
    NavigateFromHome,
}

impl Strategy {
    /// Default fallback order.
    pub const ALL: [Strategy; 3] = [
        Strategy::Direct,
        Strategy::SpaWithDelay,
        Strategy::NavigateFromHome,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Direct => "direct",
            Strategy::SpaWithDelay => "spa_with_delay",
            Strategy::NavigateFromHome => "navigate_from_home",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "direct" => Ok(Strategy::Direct),
            "spa_with_delay" | "spa" => Ok(Strategy::SpaWithDelay),
            "navigate_from_home" | "navigate" => Ok(Strategy::NavigateFromHome),
            _ => Err(format!("Unknown strategy: {}", s)),
        }
    }
}

/// Timing policy for one strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyPolicy {
    /// Wait after load (and after any script) before reading the DOM.
    pub render_delay: Duration,
    /// Upper bound on page navigation.
    pub page_timeout: Duration,
}

impl StrategyPolicy {
    pub const fn new(render_delay: Duration, page_timeout: Duration) -> Self {
        Self {
            render_delay,
            page_timeout,
        }
    }
}

/// Everything a renderer needs for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub strategy: Strategy,
    /// URL actually loaded (the site root for navigation).
    pub load_url: String,
    /// URL whose content we want.
    pub target_url: String,
    pub render_delay: Duration,
    pub page_timeout: Duration,
    /// In-page script evaluated after load, before the final delay.
    pub script: Option<String>,
}

impl RenderRequest {
    pub fn load(strategy: Strategy, url: &Url, policy: StrategyPolicy) -> Self {
        Self {
            strategy,
            load_url: url.to_string(),
            target_url: url.to_string(),
            render_delay: policy.render_delay,
            page_timeout: policy.page_timeout,
            script: None,
        }
    }
}

/// `scheme://host[:port]` of a URL.
pub fn site_root(url: &Url) -> String {
    url[..Position::BeforePath].to_string()
}

/// Target path relative to the root, without its leading slash, query included.
///
/// Empty when the target is the root itself.
pub fn relative_path(url: &Url) -> String {
    url[Position::BeforePath..]
        .trim_start_matches('/')
        .to_string()
}

/// In-page script for [`Strategy::NavigateFromHome`].
///
/// Waits `settle`, looks for an anchor whose href is `/{path}`, the full
/// target URL, or contains `/{path}`, clicks it, then waits `after_click`.
/// Evaluates to `true` if a link was clicked.
pub fn navigation_script(
    path: &str,
    target_url: &str,
    settle: Duration,
    after_click: Duration,
) -> String {
    // JSON string literals are valid JS string literals.
    let href = js_string(&format!("/{path}"));
    let target = js_string(target_url);

    format!(
        r#"(async () => {{
  const href = {href};
  const target = {target};
  await new Promise(resolve => setTimeout(resolve, {settle_ms}));
  const anchors = Array.from(document.querySelectorAll('a[href]'));
  const hrefOf = a => a.getAttribute('href') || '';
  const link = anchors.find(a => hrefOf(a) === href)
    || anchors.find(a => hrefOf(a) === target)
    || anchors.find(a => hrefOf(a).includes(href));
  if (!link) {{
    return false;
  }}
  link.click();
  await new Promise(resolve => setTimeout(resolve, {click_ms}));
  return true;
}})()"#,
        settle_ms = settle.as_millis(),
        click_ms = after_click.as_millis(),
    )
}

fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
